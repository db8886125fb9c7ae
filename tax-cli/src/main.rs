use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tax_cli::cli::Cli;
use tax_cli::commands::{self, CommandError};
use tax_data::{BracketTableLoader, Schedule, ScheduleLoaderError};

// ─── tracing ─────────────────────────────────────────────────────────────────

/// Initialise the tracing subscriber.
///
/// * Honours `RUST_LOG` when set.
/// * Falls back to `warn` so stdout carries only command output.
/// * Writes to stderr and strips timestamps and target names.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::from("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

// ─── entry point ─────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> anyhow::Result<String> {
    let schedule = match &cli.schedule {
        Some(path) => BracketTableLoader::load_from_file(path)
            .with_context(|| format!("failed to load schedule {}", path.display()))?,
        None => Schedule::reference(),
    };
    debug!(schedule = %schedule.name, brackets = schedule.table.len(), "using schedule");

    Ok(commands::execute(&cli.command, &schedule)?)
}

/// Prints `err` as `error: <Kind>: <reason>` and picks the exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    if let Some(command_err) = err.downcast_ref::<CommandError>() {
        debug!(kind = command_err.kind(), "command failed");
        eprintln!("error: {}: {command_err}", command_err.kind());
        return ExitCode::from(command_err.exit_code());
    }

    let kind = err
        .downcast_ref::<ScheduleLoaderError>()
        .map_or("ScheduleError", ScheduleLoaderError::kind);
    debug!(kind, "failed to load schedule");
    eprintln!("error: {kind}: {err:#}");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => report(&err),
    }
}
