mod cli;
mod diagnostics;
mod frontend;
mod interpreter;
mod repl;
mod run;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Cli;

/// Enable with `RUST_LOG=treewalk=debug` or `RUST_LOG=treewalk=trace`.
/// Logs go to stderr so program output stays clean.
fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match &cli.file {
        Some(path) => match run::run_file(path, &cli) {
            Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
            Ok(_) => ExitCode::FAILURE,
            Err(err) => {
                error!(path = %path.display(), %err, "could not run file");
                eprintln!("Error: {}: {}", path.display(), err);
                ExitCode::FAILURE
            }
        },
        None => {
            repl::repl_driver(&cli);
            ExitCode::SUCCESS
        }
    }
}
