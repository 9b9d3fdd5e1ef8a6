pub mod config;
pub mod logging;
pub mod retry;

pub use retry::{
    retry, retry_with_cancel, AttemptError, CancelToken, RetryError, RetryOptions, RetryResult,
    Retrier, Termination,
};
