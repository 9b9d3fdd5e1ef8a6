//! Retry loop: run a closure until success, exhaustion or cancellation.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use super::cancel::{CancelToken, Gate, WaitOutcome};
use super::clock::{Clock, SystemClock};
use super::options::RetryOptions;
use super::outcome::{Aggregator, AttemptOutcome, AttemptRecord, RetryResult, Termination};
use super::policy::BackoffPolicy;

/// Runs `work` until it returns `Ok(())` or `options.max_attempts()` attempts
/// have failed. Never cancelled from outside.
///
/// A panic in `work` is caught and recorded as [`AttemptError::Panicked`], but
/// the process panic hook still runs first, so the default hook prints the
/// usual "thread panicked at" message to stderr for each one. Install a quiet
/// hook with [`std::panic::set_hook`] if that output is unwanted. Containment
/// requires `panic = "unwind"`.
///
/// [`AttemptError::Panicked`]: super::AttemptError::Panicked
pub fn retry<E, F>(mut work: F, options: &RetryOptions) -> RetryResult<E>
where
    E: fmt::Display,
    F: FnMut() -> Result<(), E>,
{
    Retrier::new(*options).run_with_cancel(&CancelToken::never(), |_| work())
}

/// Like [`retry`], but stops early once `token` fires. The work function
/// receives a child of `token` that is also cancelled when the run ends.
pub fn retry_with_cancel<E, F>(token: &CancelToken, work: F, options: &RetryOptions) -> RetryResult<E>
where
    E: fmt::Display,
    F: FnMut(&CancelToken) -> Result<(), E>,
{
    Retrier::new(*options).run_with_cancel(token, work)
}

/// Retry runner with an injectable clock and jitter seed.
#[derive(Debug, Clone)]
pub struct Retrier<C = SystemClock> {
    options: RetryOptions,
    clock: C,
    seed: Option<u64>,
}

impl Retrier<SystemClock> {
    pub fn new(options: RetryOptions) -> Self {
        Self {
            options,
            clock: SystemClock,
            seed: None,
        }
    }
}

impl<C: Clock> Retrier<C> {
    pub fn with_clock<D: Clock>(self, clock: D) -> Retrier<D> {
        Retrier {
            options: self.options,
            clock,
            seed: self.seed,
        }
    }

    /// Fix the jitter RNG seed so runs are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn run<E, F>(&self, mut work: F) -> RetryResult<E>
    where
        E: fmt::Display,
        F: FnMut() -> Result<(), E>,
    {
        self.run_with_cancel(&CancelToken::never(), |_| work())
    }

    pub fn run_with_cancel<E, F>(&self, token: &CancelToken, mut work: F) -> RetryResult<E>
    where
        E: fmt::Display,
        F: FnMut(&CancelToken) -> Result<(), E>,
    {
        let opts = &self.options;
        let mut policy = match self.seed {
            Some(seed) => BackoffPolicy::with_seed(opts, seed),
            None => BackoffPolicy::new(opts),
        };
        let mut aggregator = Aggregator::new(opts.return_latest_only());
        let gate = Gate::new(token, &self.clock);
        let started = self.clock.now();
        let mut attempt = 0u32;

        let termination = loop {
            if gate.is_cancelled() {
                break Termination::Cancelled;
            }
            if attempt >= opts.max_attempts() {
                gate.stop();
                break Termination::Exhausted;
            }

            let (record, attempt_end) =
                run_attempt(&mut work, gate.token(), &self.clock, started, attempt);
            record.log();
            let attempt_start = started + record.started_after;
            let succeeded = record.outcome.is_success();
            aggregator.record(record);

            if succeeded {
                gate.stop();
                break Termination::Succeeded;
            }

            attempt += 1;
            if attempt >= opts.max_attempts() {
                continue;
            }

            // Non-sliding waits are anchored at the attempt start, so the
            // attempt's own latency counts against the wait.
            let anchor = if opts.sliding() {
                attempt_end
            } else {
                attempt_start
            };
            let wait = policy.next_wait(anchor);
            let sleep = if opts.sliding() {
                wait
            } else {
                wait.saturating_sub(attempt_end.saturating_duration_since(attempt_start))
            };
            tracing::debug!(
                next_attempt = attempt,
                wait_ms = sleep.as_millis() as u64,
                "backing off"
            );
            if gate.await_either(sleep) == WaitOutcome::Cancelled {
                break Termination::Cancelled;
            }
        };

        let result = aggregator.finish(termination);
        tracing::info!(
            termination = %termination,
            attempts = result.attempts(),
            errors = result.errors().len(),
            elapsed_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64,
            "retry finished"
        );
        result
    }
}

/// Invoke the work function once and timestamp it against `clock`.
/// Returns the record and the instant the attempt ended.
fn run_attempt<E, F, C>(
    work: &mut F,
    token: &CancelToken,
    clock: &C,
    started: Instant,
    index: u32,
) -> (AttemptRecord<E>, Instant)
where
    F: FnMut(&CancelToken) -> Result<(), E>,
    C: Clock,
{
    let attempt_start = clock.now();
    let outcome = invoke(work, token);
    let record = AttemptRecord {
        index,
        outcome,
        started_after: attempt_start.saturating_duration_since(started),
    };
    (record, clock.now())
}

/// The one place the work function is called. A panic is caught here and
/// turned into an ordinary attempt outcome.
fn invoke<E, F>(work: &mut F, token: &CancelToken) -> AttemptOutcome<E>
where
    F: FnMut(&CancelToken) -> Result<(), E>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| work(token))) {
        Ok(Ok(())) => AttemptOutcome::Success,
        Ok(Err(e)) => AttemptOutcome::Failed(e),
        Err(payload) => AttemptOutcome::Panicked(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
