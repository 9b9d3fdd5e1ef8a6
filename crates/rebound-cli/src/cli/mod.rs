//! CLI for the rebound retry runner.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use rebound_core::config::{self, RetryConfig};

use commands::{run_command, run_completions, run_config, run_man};

/// Top-level CLI for rebound.
#[derive(Debug, Parser)]
#[command(name = "rebound")]
#[command(about = "rebound: retry a command with exponential backoff", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Retry settings that override the `[retry]` section of config.toml.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct RetryArgs {
    /// Maximum number of attempts (including the first).
    #[arg(long, value_name = "N")]
    pub attempts: Option<u32>,
    /// Wait before the second attempt, in seconds.
    #[arg(long, value_name = "SECS")]
    pub period: Option<f64>,
    /// Multiplier applied to each successive wait.
    #[arg(long, value_name = "F")]
    pub factor: Option<f64>,
    /// Fractional randomization of each wait (e.g. 0.2 = ±20%).
    #[arg(long, value_name = "J")]
    pub jitter: Option<f64>,
    /// Idle gap in seconds after which the backoff starts over.
    #[arg(long, value_name = "SECS")]
    pub reset: Option<f64>,
    /// Measure waits from the end of the previous attempt instead of its start.
    /// `--sliding false` turns off a config-file setting.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub sliding: Option<bool>,
    /// Only report the most recent error (`--latest-only false` to turn off).
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub latest_only: Option<bool>,
}

impl RetryArgs {
    /// Layer the flags that were given on top of `base`.
    pub fn apply(&self, base: RetryConfig) -> RetryConfig {
        RetryConfig {
            max_attempts: self.attempts.unwrap_or(base.max_attempts),
            period_secs: self.period.unwrap_or(base.period_secs),
            backoff_factor: self.factor.unwrap_or(base.backoff_factor),
            jitter: self.jitter.unwrap_or(base.jitter),
            reset_secs: self.reset.unwrap_or(base.reset_secs),
            sliding: self.sliding.unwrap_or(base.sliding),
            latest_only: self.latest_only.unwrap_or(base.latest_only),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub retry: RetryArgs,
    /// Give up after this many seconds overall (Ctrl-C also cancels).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,
    /// Print the result as JSON on stdout.
    #[arg(long)]
    pub json: bool,
    /// Command to run, after `--`.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a command, retrying with backoff until it exits successfully.
    Run(RunArgs),

    /// Show the config file location and effective retry settings.
    Config,

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the man page.
    Man,
}

impl CliCommand {
    /// Parse arguments, dispatch, and return the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_command(&cfg, args).await
            }
            CliCommand::Config => {
                let cfg = config::load_or_init()?;
                run_config(&cfg)?;
                Ok(0)
            }
            CliCommand::Completions { shell } => {
                run_completions(shell)?;
                Ok(0)
            }
            CliCommand::Man => {
                run_man()?;
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests;
