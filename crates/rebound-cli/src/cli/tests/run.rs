//! Tests for the run subcommand and its retry overrides.

use super::parse;
use crate::cli::{Cli, CliCommand, RetryArgs};
use clap::Parser;
use rebound_core::config::RetryConfig;

#[test]
fn cli_parse_run_minimal() {
    match parse(&["rebound", "run", "--", "curl", "-fsS", "https://example.com"]) {
        CliCommand::Run(args) => {
            assert_eq!(args.retry, RetryArgs::default());
            assert!(args.timeout.is_none());
            assert!(!args.json);
            assert_eq!(args.command, vec!["curl", "-fsS", "https://example.com"]);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_overrides() {
    match parse(&[
        "rebound",
        "run",
        "--attempts",
        "7",
        "--period",
        "0.5",
        "--factor",
        "2",
        "--jitter",
        "0.1",
        "--reset",
        "10",
        "--sliding",
        "--latest-only",
        "--timeout",
        "30",
        "--json",
        "--",
        "make",
        "test",
    ]) {
        CliCommand::Run(args) => {
            assert_eq!(args.retry.attempts, Some(7));
            assert_eq!(args.retry.period, Some(0.5));
            assert_eq!(args.retry.factor, Some(2.0));
            assert_eq!(args.retry.jitter, Some(0.1));
            assert_eq!(args.retry.reset, Some(10.0));
            assert_eq!(args.retry.sliding, Some(true));
            assert_eq!(args.retry.latest_only, Some(true));
            assert_eq!(args.timeout, Some(30.0));
            assert!(args.json);
            assert_eq!(args.command, vec!["make", "test"]);
        }
        _ => panic!("expected Run with overrides"),
    }
}

#[test]
fn cli_parse_run_requires_command() {
    assert!(Cli::try_parse_from(["rebound", "run"]).is_err());
    assert!(Cli::try_parse_from(["rebound", "run", "--attempts", "3"]).is_err());
}

#[test]
fn overrides_layer_on_config() {
    let base = RetryConfig {
        max_attempts: 9,
        period_secs: 1.0,
        backoff_factor: 3.0,
        jitter: 0.0,
        reset_secs: 5.0,
        sliding: true,
        latest_only: false,
    };
    let args = RetryArgs {
        attempts: Some(2),
        jitter: Some(0.25),
        latest_only: Some(true),
        ..RetryArgs::default()
    };
    let merged = args.apply(base.clone());
    assert_eq!(merged.max_attempts, 2);
    assert_eq!(merged.period_secs, 1.0);
    assert_eq!(merged.backoff_factor, 3.0);
    assert_eq!(merged.jitter, 0.25);
    assert!(merged.sliding);
    assert!(merged.latest_only);

    assert_eq!(RetryArgs::default().apply(base.clone()), base);
}

#[test]
fn cli_parse_explicit_false_turns_off_config_flags() {
    let args = match parse(&[
        "rebound",
        "run",
        "--sliding",
        "false",
        "--latest-only=false",
        "--",
        "true",
    ]) {
        CliCommand::Run(args) => args,
        _ => panic!("expected Run"),
    };
    assert_eq!(args.retry.sliding, Some(false));
    assert_eq!(args.retry.latest_only, Some(false));
    assert_eq!(args.command, vec!["true"]);

    let base = RetryConfig {
        sliding: true,
        latest_only: true,
        ..RetryConfig::default()
    };
    let merged = args.retry.apply(base);
    assert!(!merged.sliding);
    assert!(!merged.latest_only);
}
