//! Data models shared across the crate.
//!
//! - `Handle`: a validated account identifier
//! - `Profile`, `ProfileOutcome`, `ProfileSource`: what a profile lookup returns
//! - `HistoryEntry`: one day of the follower ledger

pub mod handle;
pub mod history;
pub mod profile;

pub use handle::{Handle, HandleError};
pub use history::HistoryEntry;
pub use profile::{Profile, ProfileOutcome, ProfileSource};
