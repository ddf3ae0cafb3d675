//! kogura - one sentence in, one scheduled task out
//!
//! A CLI that turns free-text activity notes into structured tasks and keeps
//! them in a date-grouped, reorderable list.

use clap::Parser;
use kogura::cli::Cli;
use kogura::events::EventDestination;
use kogura::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Longest `RUST_LOG` value we try to parse.
const MAX_FILTER_LEN: usize = 4096;

fn main() {
    init_tracing(std::env::var("RUST_LOG").ok().as_deref());

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    // JSONL events on stdout would interleave with a JSON error envelope.
    let json_errors = cli.json
        && EventDestination::parse(cli.events.as_deref()) != Some(EventDestination::Stdout);

    if let Err(err) = cli.run() {
        tracing::debug!(command = %command, error = %err, "command failed");
        let _ = emit_error(&command, &err, json_errors);
        std::process::exit(err.exit_code());
    }
}

/// Diagnostics go to stderr and stay off unless a usable filter is given.
fn init_tracing(raw_filter: Option<&str>) {
    let filter = raw_filter
        .map(str::trim)
        .filter(|raw| !raw.is_empty() && raw.len() <= MAX_FILTER_LEN)
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
