//! `rebound run` – retry an external command until it exits successfully.

use anyhow::{anyhow, Context, Result};
use rebound_core::config::{secs_to_duration, ReboundConfig};
use rebound_core::retry::WaitOutcome;
use rebound_core::{retry_with_cancel, AttemptError, CancelToken, RetryResult, Termination};
use serde::Serialize;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::cli::RunArgs;

/// How often a running child is checked for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Summary printed after a run (human-readable or `--json`).
#[derive(Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub command: String,
    pub succeeded: bool,
    pub termination: String,
    pub attempts: u32,
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn from_result(command: &[String], result: &RetryResult<anyhow::Error>) -> Self {
        Self {
            command: command.join(" "),
            succeeded: result.succeeded(),
            termination: result.termination().to_string(),
            attempts: result.attempts(),
            errors: result
                .errors()
                .iter()
                .map(|e| match e {
                    AttemptError::Failed(err) => format!("{:#}", err),
                    AttemptError::Panicked(msg) => format!("panicked: {}", msg),
                })
                .collect(),
        }
    }
}

/// 0 on success, 1 when attempts ran out, 124 when cancelled (timeout or Ctrl-C).
pub fn exit_code(termination: Termination) -> i32 {
    match termination {
        Termination::Succeeded => 0,
        Termination::Exhausted => 1,
        Termination::Cancelled => 124,
    }
}

pub async fn run_command(cfg: &ReboundConfig, args: RunArgs) -> Result<i32> {
    let options = args.retry.apply(cfg.retry_config()).to_options()?;
    let timeout = match args.timeout {
        Some(secs) => Some(secs_to_duration(secs).context("--timeout")?),
        None => cfg.timeout()?,
    };

    let root = CancelToken::new();
    let token = match timeout {
        Some(t) => root.child_with_timeout(t),
        None => root.clone(),
    };

    let interrupt = root.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling retries");
            interrupt.cancel();
        }
    });

    let command = args.command.clone();
    tracing::info!(
        command = %command.join(" "),
        max_attempts = options.max_attempts(),
        "starting"
    );
    let result = tokio::task::spawn_blocking(move || {
        retry_with_cancel(&token, |t| run_once(&command, t), &options)
    })
    .await
    .context("retry worker failed")?;
    signal.abort();

    let report = RunReport::from_result(&args.command, &result);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(exit_code(result.termination()))
}

/// Spawn the command once and wait for it. A non-zero exit is an error; if
/// the token fires while it runs, the child is killed.
pub(crate) fn run_once(command: &[String], token: &CancelToken) -> Result<()> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| anyhow!("no command given"))?;
    let mut child = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to start {}", program))?;

    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                return Ok(());
            }
            return Err(anyhow!("{} exited with {}", program, status));
        }
        if token.wait_timeout(POLL_INTERVAL) == WaitOutcome::Cancelled {
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!("{} interrupted", program));
        }
    }
}

fn print_summary(report: &RunReport) {
    for (i, e) in report.errors.iter().enumerate() {
        eprintln!("error {}: {}", i, e);
    }
    eprintln!(
        "{}: {} after {} attempt(s)",
        report.command, report.termination, report.attempts
    );
}
