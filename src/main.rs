mod cli;
mod commands;
mod model;
mod util;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Index(args) => commands::index::run(args),
        Commands::Sheets(args) => commands::sheets::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn report_failure(err: &anyhow::Error) {
    error!(error = %err, "psgc-index failed");
    for (depth, cause) in err.chain().skip(1).enumerate() {
        error!(depth = depth + 1, cause = %cause, "caused by");
    }
}

/// `RUST_LOG` overrides the level picked by `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
