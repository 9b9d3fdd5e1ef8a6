//! Retry configuration and its builder.

use std::time::Duration;

use super::error::OptionsError;

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);
pub const DEFAULT_JITTER: f64 = 0.0;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RESET_DURATION: Duration = Duration::from_secs(3);

/// Immutable settings for one retry run.
///
/// Build with [`RetryOptions::builder`]; every setter is optional and
/// overrides exactly one default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryOptions {
    max_attempts: u32,
    period: Duration,
    backoff_factor: f64,
    jitter: f64,
    reset_duration: Duration,
    sliding: bool,
    return_latest_only: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            period: DEFAULT_PERIOD,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            jitter: DEFAULT_JITTER,
            reset_duration: DEFAULT_RESET_DURATION,
            sliding: false,
            return_latest_only: false,
        }
    }
}

impl RetryOptions {
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::default()
    }

    /// Maximum number of attempts (including the first).
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait between the first and second attempt.
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Idle gap after which the backoff multiplier starts over.
    pub fn reset_duration(&self) -> Duration {
        self.reset_duration
    }

    /// Whether waits are measured from the end of the previous attempt
    /// instead of its start.
    pub fn sliding(&self) -> bool {
        self.sliding
    }

    pub fn return_latest_only(&self) -> bool {
        self.return_latest_only
    }
}

/// Builder for [`RetryOptions`]. Unset fields take the defaults.
#[derive(Debug, Clone, Default)]
pub struct RetryOptionsBuilder {
    max_attempts: Option<u32>,
    period: Option<Duration>,
    backoff_factor: Option<f64>,
    jitter: Option<f64>,
    reset_duration: Option<Duration>,
    sliding: Option<bool>,
    return_latest_only: Option<bool>,
}

impl RetryOptionsBuilder {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = Some(factor);
        self
    }

    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    pub fn reset_duration(mut self, reset: Duration) -> Self {
        self.reset_duration = Some(reset);
        self
    }

    pub fn sliding(mut self, sliding: bool) -> Self {
        self.sliding = Some(sliding);
        self
    }

    pub fn return_latest_only(mut self, latest_only: bool) -> Self {
        self.return_latest_only = Some(latest_only);
        self
    }

    /// Validate each field against its own domain and build the options.
    pub fn build(self) -> Result<RetryOptions, OptionsError> {
        let defaults = RetryOptions::default();

        let max_attempts = self.max_attempts.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(OptionsError::ZeroAttempts);
        }

        let period = self.period.unwrap_or(defaults.period);
        if period.is_zero() {
            return Err(OptionsError::ZeroPeriod);
        }

        let backoff_factor = self.backoff_factor.unwrap_or(defaults.backoff_factor);
        if !backoff_factor.is_finite() || backoff_factor < 1.0 {
            return Err(OptionsError::BackoffFactor(backoff_factor));
        }

        let jitter = self.jitter.unwrap_or(defaults.jitter);
        if !jitter.is_finite() || jitter < 0.0 {
            return Err(OptionsError::Jitter(jitter));
        }

        Ok(RetryOptions {
            max_attempts,
            period,
            backoff_factor,
            jitter,
            reset_duration: self.reset_duration.unwrap_or(defaults.reset_duration),
            sliding: self.sliding.unwrap_or(defaults.sliding),
            return_latest_only: self.return_latest_only.unwrap_or(defaults.return_latest_only),
        })
    }
}
