//! followwatch - track an account's follower count from the terminal.
//!
//! Counts come from a cached, deduplicated fetcher and are recorded into a
//! per-day ledger, with one authoritative count taken near midnight.

mod args;
mod commands;
mod render;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use followwatch_core::Config;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Command};
use render::ReportOptions;

/// Log file name prefix inside the log directory (rotated daily)
const LOG_FILE_PREFIX: &str = "followwatch.log";

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr; when `log_dir` is given they are also written to a
/// daily rolling file there. The returned guard must be held until exit so
/// buffered file output is flushed.
fn init_tracing(default_level: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let Cli { command } = Cli::parse();

    let config = Config::load()?;

    // Long-running watch sessions also keep a log file
    let _log_guard = match command {
        Command::Watch { .. } => {
            let log_dir = config.log_dir()?;
            std::fs::create_dir_all(&log_dir)?;
            init_tracing("info", Some(&log_dir))
        }
        _ => init_tracing("warn", None),
    };
    info!(version = env!("CARGO_PKG_VERSION"), "followwatch starting");

    match command {
        Command::Fetch { handle, json } => commands::fetch(&config, handle, json).await,
        Command::Watch { handle, interval } => commands::watch(&config, handle, interval).await,
        Command::History { handle, month } => commands::history(&config, handle, month),
        Command::Report {
            handle,
            target,
            cost_per_follower,
            rate,
        } => commands::report(
            &config,
            handle,
            ReportOptions {
                target,
                cost_per_follower,
                rate,
            },
        ),
        Command::SetToken => commands::set_token(),
        Command::ClearToken => commands::clear_token(),
    }
}
