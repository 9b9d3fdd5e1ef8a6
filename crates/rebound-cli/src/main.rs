use rebound_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    // Parse CLI and dispatch.
    match CliCommand::run_from_args().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("rebound error: {:#}", err);
            std::process::exit(1);
        }
    }
}
