//! Error types surfaced by the retry engine.

use thiserror::Error;

/// Error recorded for a single failed attempt.
///
/// A panic inside the work function is caught at the attempt boundary and
/// stored as `Panicked` with its rendered message, so it is retried exactly
/// like a returned error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError<E> {
    /// The work function returned `Err`.
    #[error("{0}")]
    Failed(E),
    /// The work function panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl<E> AttemptError<E> {
    /// The returned error, if this attempt did not panic.
    pub fn as_failed(&self) -> Option<&E> {
        match self {
            AttemptError::Failed(e) => Some(e),
            AttemptError::Panicked(_) => None,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, AttemptError::Panicked(_))
    }
}

/// Returned by [`RetryResult::into_result`](super::RetryResult::into_result)
/// when the run did not succeed.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt in the budget failed.
    #[error("gave up after {attempts} attempt(s)")]
    Exhausted {
        attempts: u32,
        errors: Vec<AttemptError<E>>,
    },
    /// The cancellation token fired before success.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled {
        attempts: u32,
        errors: Vec<AttemptError<E>>,
    },
}

impl<E> RetryError<E> {
    pub fn errors(&self) -> &[AttemptError<E>] {
        match self {
            RetryError::Exhausted { errors, .. } | RetryError::Cancelled { errors, .. } => errors,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// A [`RetryOptions`](super::RetryOptions) field outside its domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("period must be greater than zero")]
    ZeroPeriod,
    #[error("backoff factor must be a finite number >= 1.0, got {0}")]
    BackoffFactor(f64),
    #[error("jitter must be a finite number >= 0.0, got {0}")]
    Jitter(f64),
}
