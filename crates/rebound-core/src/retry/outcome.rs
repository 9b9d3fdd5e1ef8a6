//! Per-attempt records and the aggregated result of a retry run.

use std::fmt;
use std::time::Duration;

use super::error::{AttemptError, RetryError};

/// What a single invocation of the work function produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<E> {
    Success,
    Failed(E),
    /// The work function panicked; holds the rendered panic message.
    Panicked(String),
}

impl<E> AttemptOutcome<E> {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

/// One attempt, as seen by the aggregator.
#[derive(Debug, Clone)]
pub struct AttemptRecord<E> {
    /// 0-based attempt index.
    pub index: u32,
    pub outcome: AttemptOutcome<E>,
    /// When the attempt started, relative to the start of the run.
    pub started_after: Duration,
}

impl<E: fmt::Display> AttemptRecord<E> {
    /// Emit one tracing event for this attempt.
    pub(crate) fn log(&self) {
        let started_after_ms = self.started_after.as_millis() as u64;
        match &self.outcome {
            AttemptOutcome::Success => {
                tracing::debug!(attempt = self.index, started_after_ms, "attempt succeeded");
            }
            AttemptOutcome::Failed(e) => {
                tracing::debug!(
                    attempt = self.index,
                    started_after_ms,
                    error = %e,
                    "attempt failed"
                );
            }
            AttemptOutcome::Panicked(msg) => {
                tracing::warn!(
                    attempt = self.index,
                    started_after_ms,
                    panic = %msg,
                    "attempt panicked"
                );
            }
        }
    }
}

/// Why a retry run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Succeeded,
    /// The attempt budget ran out.
    Exhausted,
    /// The caller's token fired (manually or by deadline).
    Cancelled,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Succeeded => "succeeded",
            Termination::Exhausted => "exhausted",
            Termination::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict of a retry run. Owned by the caller; never changes.
#[derive(Debug, Clone)]
pub struct RetryResult<E> {
    succeeded: bool,
    errors: Vec<AttemptError<E>>,
    attempts: u32,
    termination: Termination,
}

impl<E> RetryResult<E> {
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Errors of failed attempts in attempt order. A success does not clear
    /// them. With `return_latest_only` this holds at most the last error.
    pub fn errors(&self) -> &[AttemptError<E>] {
        &self.errors
    }

    pub fn latest(&self) -> Option<&AttemptError<E>> {
        self.errors.last()
    }

    /// Number of times the work function was invoked.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn into_errors(self) -> Vec<AttemptError<E>> {
        self.errors
    }

    /// `Ok(())` on success, otherwise the collected errors tagged with the
    /// reason the run stopped.
    pub fn into_result(self) -> Result<(), RetryError<E>> {
        let attempts = self.attempts;
        let errors = self.errors;
        match self.termination {
            Termination::Succeeded => Ok(()),
            Termination::Exhausted => Err(RetryError::Exhausted { attempts, errors }),
            Termination::Cancelled => Err(RetryError::Cancelled { attempts, errors }),
        }
    }
}

/// Renders as `0: first error; 1: second error; ...`.
impl<E: fmt::Display> fmt::Display for RetryResult<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", i, e)?;
        }
        Ok(())
    }
}

/// Accumulates attempt outcomes for one run. `finish` consumes it, so a run
/// yields exactly one [`RetryResult`].
#[derive(Debug)]
pub(crate) struct Aggregator<E> {
    latest_only: bool,
    errors: Vec<AttemptError<E>>,
    succeeded: bool,
    attempts: u32,
}

impl<E> Aggregator<E> {
    pub(crate) fn new(latest_only: bool) -> Self {
        Self {
            latest_only,
            errors: Vec::new(),
            succeeded: false,
            attempts: 0,
        }
    }

    pub(crate) fn record(&mut self, record: AttemptRecord<E>) {
        self.attempts = self.attempts.saturating_add(1);
        match record.outcome {
            AttemptOutcome::Success => self.record_success(),
            AttemptOutcome::Failed(e) => self.record_error(AttemptError::Failed(e)),
            AttemptOutcome::Panicked(msg) => self.record_error(AttemptError::Panicked(msg)),
        }
    }

    pub(crate) fn record_error(&mut self, error: AttemptError<E>) {
        if self.latest_only {
            self.errors.clear();
        }
        self.errors.push(error);
    }

    pub(crate) fn record_success(&mut self) {
        self.succeeded = true;
    }

    pub(crate) fn finish(self, termination: Termination) -> RetryResult<E> {
        debug_assert_eq!(self.succeeded, termination == Termination::Succeeded);
        RetryResult {
            succeeded: self.succeeded,
            errors: self.errors,
            attempts: self.attempts,
            termination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u32, outcome: AttemptOutcome<&'static str>) -> AttemptRecord<&'static str> {
        AttemptRecord {
            index,
            outcome,
            started_after: Duration::ZERO,
        }
    }

    #[test]
    fn keeps_history_after_success() {
        let mut agg = Aggregator::new(false);
        agg.record(record(0, AttemptOutcome::Failed("a")));
        agg.record(record(1, AttemptOutcome::Panicked("boom".into())));
        agg.record(record(2, AttemptOutcome::Success));
        let res = agg.finish(Termination::Succeeded);
        assert!(res.succeeded());
        assert_eq!(res.attempts(), 3);
        assert_eq!(
            res.errors(),
            &[
                AttemptError::Failed("a"),
                AttemptError::Panicked("boom".to_string())
            ]
        );
        assert_eq!(res.latest(), Some(&AttemptError::Panicked("boom".into())));
        assert!(res.into_result().is_ok());
    }

    #[test]
    fn latest_only_replaces() {
        let mut agg = Aggregator::new(true);
        for (i, e) in ["a", "b", "c"].into_iter().enumerate() {
            agg.record(record(i as u32, AttemptOutcome::Failed(e)));
        }
        let res = agg.finish(Termination::Exhausted);
        assert_eq!(res.errors(), &[AttemptError::Failed("c")]);
        assert_eq!(res.attempts(), 3);
    }

    #[test]
    fn display_lists_errors_by_index() {
        let mut agg = Aggregator::new(false);
        agg.record(record(0, AttemptOutcome::Failed("timeout")));
        agg.record(record(1, AttemptOutcome::Panicked("oops".into())));
        let res = agg.finish(Termination::Exhausted);
        assert_eq!(res.to_string(), "0: timeout; 1: panicked: oops");
    }

    #[test]
    fn into_result_carries_termination() {
        let mut agg = Aggregator::new(false);
        agg.record(record(0, AttemptOutcome::Failed("x")));
        let err = agg.finish(Termination::Cancelled).into_result().unwrap_err();
        assert!(matches!(err, RetryError::Cancelled { attempts: 1, .. }));
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.to_string(), "cancelled after 1 attempt(s)");

        let empty: Aggregator<&str> = Aggregator::new(false);
        let err = empty.finish(Termination::Cancelled).into_result().unwrap_err();
        assert_eq!(err.attempts(), 0);
        assert!(err.errors().is_empty());
    }
}
