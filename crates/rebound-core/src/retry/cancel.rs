//! One-shot cancellation tokens and the per-run gate built on them.
//!
//! A token can be cancelled from any thread. Waiters blocked in
//! [`CancelToken::wait_timeout`] are woken immediately instead of polling.
//! Cancelling a token cancels every child derived from it; a deadline makes
//! the token report cancelled once it passes.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use super::clock::Clock;

/// How a cancellable wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration elapsed.
    TimedOut,
    /// The token was (or already had been) cancelled.
    Cancelled,
}

#[derive(Debug, Default)]
struct State {
    cancelled: bool,
    children: Vec<Weak<Inner>>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    cond: Condvar,
    deadline: Option<Instant>,
}

impl Inner {
    fn new(deadline: Option<Instant>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            cond: Condvar::new(),
            deadline,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deadline_passed(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    fn cancel(&self) {
        let children = {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.children)
        };
        self.cond.notify_all();
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// Shared, cloneable cancellation signal. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// A token that only fires when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(None)),
        }
    }

    /// A token for runs with no external cancellation. Nothing else holds a
    /// handle to it, so only the retry loop's own child can ever be stopped.
    pub fn never() -> Self {
        Self::new()
    }

    /// A token that fires once `timeout` has elapsed (or on `cancel`).
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now().checked_add(timeout))
    }

    /// A token that fires at `deadline` (or on `cancel`). `None` means no deadline.
    pub fn with_deadline(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner::new(deadline)),
        }
    }

    /// Derive a token that is cancelled whenever this one is.
    /// Cancelling the child leaves the parent untouched.
    pub fn child(&self) -> CancelToken {
        self.child_with_deadline(self.inner.deadline)
    }

    /// Like [`child`](Self::child), additionally firing after `timeout`.
    pub fn child_with_timeout(&self, timeout: Duration) -> CancelToken {
        let own = Instant::now().checked_add(timeout);
        let deadline = match (self.inner.deadline, own) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.child_with_deadline(deadline)
    }

    fn child_with_deadline(&self, deadline: Option<Instant>) -> CancelToken {
        let child = CancelToken {
            inner: Arc::new(Inner::new(deadline)),
        };
        let mut state = self.inner.lock();
        if state.cancelled {
            child.inner.lock().cancelled = true;
        } else {
            state.children.retain(|w| w.strong_count() > 0);
            state.children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Fire the token. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Non-blocking poll.
    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled || self.inner.deadline_passed(Instant::now())
    }

    /// The instant at which this token fires on its own, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Block the current thread for `timeout`, returning early if the token
    /// is cancelled (or its deadline passes) in the meantime.
    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        let end = Instant::now().checked_add(timeout);
        let mut state = self.inner.lock();
        loop {
            if state.cancelled {
                return WaitOutcome::Cancelled;
            }
            let now = Instant::now();
            if self.inner.deadline_passed(now) {
                return WaitOutcome::Cancelled;
            }
            let mut slice = match end {
                Some(end) if now >= end => return WaitOutcome::TimedOut,
                Some(end) => Some(end - now),
                None => None,
            };
            if let Some(deadline) = self.inner.deadline {
                let until_deadline = deadline - now;
                slice = Some(slice.map_or(until_deadline, |s| s.min(until_deadline)));
            }
            state = match slice {
                Some(slice) => {
                    self.inner
                        .cond
                        .wait_timeout(state, slice)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .inner
                    .cond
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

/// Per-run cancellation gate: the caller's token plus the loop's own stop
/// signal, folded into one child token that the work function receives.
pub(crate) struct Gate<'a, C: Clock> {
    token: CancelToken,
    clock: &'a C,
}

impl<'a, C: Clock> Gate<'a, C> {
    pub(crate) fn new(external: &CancelToken, clock: &'a C) -> Self {
        Self {
            token: external.child(),
            clock,
        }
    }

    pub(crate) fn token(&self) -> &CancelToken {
        &self.token
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Called once the loop has decided to finish; the external token is not touched.
    pub(crate) fn stop(&self) {
        self.token.cancel();
    }

    /// Suspend until `wait` elapses or cancellation fires, whichever comes first.
    pub(crate) fn await_either(&self, wait: Duration) -> WaitOutcome {
        if wait.is_zero() {
            return if self.is_cancelled() {
                WaitOutcome::Cancelled
            } else {
                WaitOutcome::TimedOut
            };
        }
        self.clock.wait(wait, &self.token)
    }
}
