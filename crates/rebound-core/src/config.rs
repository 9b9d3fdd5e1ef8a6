use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{
    RetryOptions, DEFAULT_BACKOFF_FACTOR, DEFAULT_JITTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_PERIOD,
    DEFAULT_RESET_DURATION,
};

/// Retry parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Wait before the second attempt, in seconds (e.g. 0.1 = 100ms).
    pub period_secs: f64,
    /// Multiplier applied to each successive wait.
    pub backoff_factor: f64,
    /// Fractional randomization of each wait (0.0 = none).
    pub jitter: f64,
    /// Idle gap in seconds after which the backoff starts over.
    pub reset_secs: f64,
    /// Measure waits from the end of the previous attempt instead of its start.
    #[serde(default)]
    pub sliding: bool,
    /// Keep only the most recent error.
    #[serde(default)]
    pub latest_only: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            period_secs: DEFAULT_PERIOD.as_secs_f64(),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            jitter: DEFAULT_JITTER,
            reset_secs: DEFAULT_RESET_DURATION.as_secs_f64(),
            sliding: false,
            latest_only: false,
        }
    }
}

impl RetryConfig {
    /// Validate and convert into engine options.
    pub fn to_options(&self) -> Result<RetryOptions> {
        let options = RetryOptions::builder()
            .max_attempts(self.max_attempts)
            .period(secs_to_duration(self.period_secs).context("period_secs")?)
            .backoff_factor(self.backoff_factor)
            .jitter(self.jitter)
            .reset_duration(secs_to_duration(self.reset_secs).context("reset_secs")?)
            .sliding(self.sliding)
            .return_latest_only(self.latest_only)
            .build()?;
        Ok(options)
    }
}

/// Global configuration loaded from `~/.config/rebound/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReboundConfig {
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Optional overall timeout in seconds for `rebound run` (None = no timeout).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
}

impl Default for ReboundConfig {
    fn default() -> Self {
        Self {
            retry: Some(RetryConfig::default()),
            timeout_secs: None,
        }
    }
}

impl ReboundConfig {
    /// The `[retry]` section, or defaults when absent.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.timeout_secs
            .map(|s| secs_to_duration(s).context("timeout_secs"))
            .transpose()
    }
}

/// Convert a non-negative, finite number of seconds into a `Duration`.
pub fn secs_to_duration(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        bail!("expected a non-negative number of seconds, got {}", secs);
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("{} seconds is out of range", secs))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rebound")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReboundConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<ReboundConfig> {
    if !path.exists() {
        let default_cfg = ReboundConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(path)
}

pub fn load_from_path(path: &Path) -> Result<ReboundConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: ReboundConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}
