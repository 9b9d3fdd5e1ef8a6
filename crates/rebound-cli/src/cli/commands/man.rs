//! `rebound man` – render the man page (roff) to stdout.

use anyhow::Result;
use clap::CommandFactory;
use std::io;

use crate::cli::Cli;

pub fn run_man() -> Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    man.render(&mut io::stdout())?;
    Ok(())
}
