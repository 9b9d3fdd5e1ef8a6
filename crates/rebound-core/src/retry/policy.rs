use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::options::RetryOptions;

/// Exponential backoff schedule with jitter and an idle reset.
///
/// The n-th wait of a sequence is `period * factor^n` (n starts at 0, so the
/// first wait is exactly `period`). If more than `reset_duration` passes
/// between two consecutive waits being computed, the sequence starts over.
/// There is no upper cap; the attempt budget bounds the total.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    period: Duration,
    factor: f64,
    jitter: f64,
    reset_duration: Duration,
    step: u32,
    last_anchor: Option<Instant>,
    rng: StdRng,
}

impl BackoffPolicy {
    pub fn new(options: &RetryOptions) -> Self {
        Self::with_rng(options, StdRng::from_entropy())
    }

    /// Same as [`new`](Self::new) with a reproducible jitter sequence.
    pub fn with_seed(options: &RetryOptions, seed: u64) -> Self {
        Self::with_rng(options, StdRng::seed_from_u64(seed))
    }

    fn with_rng(options: &RetryOptions, rng: StdRng) -> Self {
        Self {
            period: options.period(),
            factor: options.backoff_factor(),
            jitter: options.jitter(),
            reset_duration: options.reset_duration(),
            step: 0,
            last_anchor: None,
            rng,
        }
    }

    /// Exponent that the next call to [`next_wait`](Self::next_wait) will use,
    /// before any reset.
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Compute the next wait. `anchor` is the instant the wait is measured
    /// from; the gap between successive anchors drives the reset rule.
    pub fn next_wait(&mut self, anchor: Instant) -> Duration {
        if let Some(prev) = self.last_anchor {
            if anchor.saturating_duration_since(prev) > self.reset_duration {
                tracing::debug!(
                    idle_ms = anchor.saturating_duration_since(prev).as_millis() as u64,
                    "backoff reset after idle gap"
                );
                self.step = 0;
            }
        }
        self.last_anchor = Some(anchor);

        let wait = backoff_duration(self.period, self.factor, self.step);
        self.step = self.step.saturating_add(1);
        apply_jitter(wait, self.jitter, &mut self.rng)
    }
}

/// `period * factor^step`, saturating at `Duration::MAX`.
pub fn backoff_duration(period: Duration, factor: f64, step: u32) -> Duration {
    let exp = i32::try_from(step).unwrap_or(i32::MAX);
    nanos_to_duration(period.as_nanos() as f64 * factor.powi(exp))
}

/// Perturb `wait` by a uniform draw in `[-jitter * wait, +jitter * wait]`,
/// clamping at zero. A zero jitter returns `wait` unchanged.
pub fn apply_jitter<R: Rng + ?Sized>(wait: Duration, jitter: f64, rng: &mut R) -> Duration {
    if jitter <= 0.0 || wait.is_zero() {
        return wait;
    }
    let nanos = wait.as_nanos() as f64;
    let spread = nanos * jitter;
    if !spread.is_finite() {
        return wait;
    }
    nanos_to_duration(nanos + rng.gen_range(-spread..=spread))
}

fn nanos_to_duration(nanos: f64) -> Duration {
    if nanos.is_nan() || nanos <= 0.0 {
        Duration::ZERO
    } else if nanos >= u64::MAX as f64 {
        Duration::MAX
    } else {
        Duration::from_nanos(nanos.round() as u64)
    }
}
