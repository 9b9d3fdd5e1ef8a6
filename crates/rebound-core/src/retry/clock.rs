//! Time source for the retry loop.
//!
//! The loop only needs "what time is it" and "wait this long unless
//! cancelled". [`SystemClock`] does that for real; [`ManualClock`] advances
//! virtual time instantly so backoff schedules can be asserted exactly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::cancel::{CancelToken, WaitOutcome};

pub trait Clock {
    fn now(&self) -> Instant;

    /// Suspend for `timeout` or until `token` fires, whichever comes first.
    fn wait(&self, timeout: Duration, token: &CancelToken) -> WaitOutcome;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn wait(&self, timeout: Duration, token: &CancelToken) -> WaitOutcome {
        (**self).wait(timeout, token)
    }
}

/// Wall-clock time; waits block the calling thread on the token's condvar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wait(&self, timeout: Duration, token: &CancelToken) -> WaitOutcome {
        token.wait_timeout(timeout)
    }
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    start: Instant,
    waits: Vec<Duration>,
}

/// Virtual clock. `wait` never blocks: it records the requested duration and
/// jumps time forward, unless the token is already cancelled.
///
/// Clones share the same timeline, so a work function can call
/// [`advance`](ManualClock::advance) to simulate slow attempts.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now,
                start: now,
                waits: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move virtual time forward without recording a wait.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.now = state.now.checked_add(by).unwrap_or(state.now);
    }

    /// Virtual time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        let state = self.lock();
        state.now - state.start
    }

    /// Every completed wait, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.lock().waits.clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.lock().now
    }

    fn wait(&self, timeout: Duration, token: &CancelToken) -> WaitOutcome {
        if token.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        let mut state = self.lock();
        state.waits.push(timeout);
        state.now = state.now.checked_add(timeout).unwrap_or(state.now);
        WaitOutcome::TimedOut
    }
}
