mod cli;
mod config;
mod error;
mod tail;
mod watch;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries only the tail.
    let default_filter = if cli.verbose {
        "tailwatch=debug"
    } else {
        "tailwatch=warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli::run(cli) {
        Ok(never) => match never {},
        Err(e) => {
            eprintln!("tailwatch: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
