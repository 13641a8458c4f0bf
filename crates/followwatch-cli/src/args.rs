//! Command-line arguments.

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};

/// Growth target used by `report` when none is given.
pub const DEFAULT_TARGET: u64 = 10_000;

/// Cost per follower, in dollars, used by `report` when none is given.
pub const DEFAULT_COST_PER_FOLLOWER: f64 = 0.12;

#[derive(Debug, Parser)]
#[command(name = "followwatch")]
#[command(about = "Track an account's follower count over time")]
#[command(version)]
#[command(after_help = "Set RUST_LOG (e.g. RUST_LOG=debug) to control logging.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Fetch (or serve the cached) count and record it
    Fetch {
        /// Account handle; defaults to `default_handle` from the config
        handle: Option<String>,

        /// Print the dashboard as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll the count until Ctrl+C
    Watch {
        /// Account handle; defaults to `default_handle` from the config
        handle: Option<String>,

        /// Seconds between polls; defaults to `poll_interval_secs`
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },

    /// Show the daily ledger
    History {
        /// Account handle; defaults to `default_handle` from the config
        handle: Option<String>,

        /// Only show one calendar month
        #[arg(long, value_name = "YYYY-MM", value_parser = Month::parse)]
        month: Option<Month>,
    },

    /// Period totals, growth projection and milestone costs
    Report {
        /// Account handle; defaults to `default_handle` from the config
        handle: Option<String>,

        /// Follower count to project towards
        #[arg(long, default_value_t = DEFAULT_TARGET, value_parser = clap::value_parser!(u64).range(1..))]
        target: u64,

        /// Cost per follower in dollars
        #[arg(long = "cpf", value_name = "DOLLARS", default_value_t = DEFAULT_COST_PER_FOLLOWER, value_parser = parse_amount)]
        cost_per_follower: f64,

        /// Daily growth to project with instead of the 7-day average
        #[arg(long, value_parser = parse_amount)]
        rate: Option<f64>,
    },

    /// Store the Apify API token in the OS keychain
    SetToken,

    /// Remove the stored Apify API token
    ClearToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn parse(s: &str) -> Result<Self, String> {
        let first = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map_err(|_| format!("invalid month '{}', expected YYYY-MM", s))?;
        Ok(Self {
            year: first.year(),
            month: first.month(),
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

fn parse_amount(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(format!("expected a non-negative number, got '{}'", s)),
    }
}
