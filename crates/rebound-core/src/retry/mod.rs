//! Retry with exponential backoff.
//!
//! [`retry`] and [`retry_with_cancel`] re-invoke a fallible closure until it
//! succeeds, the attempt budget in [`RetryOptions`] runs out, or a
//! [`CancelToken`] fires. Panics inside the closure are contained and
//! reported as [`AttemptError::Panicked`]; nothing escapes except the
//! returned [`RetryResult`].

mod cancel;
mod clock;
mod error;
mod options;
mod outcome;
mod policy;
mod run;

pub use cancel::{CancelToken, WaitOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AttemptError, OptionsError, RetryError};
pub use options::{
    RetryOptions, RetryOptionsBuilder, DEFAULT_BACKOFF_FACTOR, DEFAULT_JITTER,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_PERIOD, DEFAULT_RESET_DURATION,
};
pub use outcome::{AttemptOutcome, AttemptRecord, RetryResult, Termination};
pub use policy::{apply_jitter, backoff_duration, BackoffPolicy};
pub use run::{retry, retry_with_cancel, Retrier};
