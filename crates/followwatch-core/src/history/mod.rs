//! Per-day follower history and the aggregates derived from it.
//!
//! `HistoryLedger` keeps one entry per handle per reference-zone day.
//! `insights` and `projection` are pure functions over the ledger's output.

pub mod insights;
pub mod ledger;
pub mod projection;

pub use insights::{available_months, average_daily_growth, month_change, period_change, Period};
pub use ledger::{HistoryDocument, HistoryLedger};
pub use projection::{milestone_costs, project, MilestoneCost, Projection, ProjectionPoint, MILESTONES};
