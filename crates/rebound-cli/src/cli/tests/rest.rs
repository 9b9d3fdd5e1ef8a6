//! Tests for config, completions and man subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

#[test]
fn cli_parse_config() {
    assert!(matches!(parse(&["rebound", "config"]), CliCommand::Config));
}

#[test]
fn cli_parse_completions() {
    match parse(&["rebound", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("expected Completions"),
    }
    assert!(Cli::try_parse_from(["rebound", "completions", "cmd.exe"]).is_err());
}

#[test]
fn cli_parse_man() {
    assert!(matches!(parse(&["rebound", "man"]), CliCommand::Man));
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn completions_mention_subcommands() {
    let mut cmd = Cli::command();
    let mut out = Vec::new();
    clap_complete::generate(Shell::Bash, &mut cmd, "rebound", &mut out);
    let script = String::from_utf8(out).unwrap();
    assert!(script.contains("completions"));
    assert!(script.contains("run"));
}
