//! followwatch-core: follower-count tracking shared by the CLI and any other
//! front end.
//!
//! This crate provides:
//! - A snapshot cache with a normal and a backoff TTL (`cache`)
//! - External follower-count fetchers: a local script or the Apify API (`fetcher`)
//! - The fetch orchestrator with per-handle deduplication and the forced
//!   end-of-day refresh (`service`)
//! - The per-day history ledger and the insights derived from it (`history`)
//! - Configuration, credentials and persistence plumbing

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod fetcher;
pub mod history;
pub mod models;
pub mod service;
pub mod store;
pub mod utils;

// Re-export commonly used types at crate root
pub use auth::CredentialStore;
pub use cache::{Snapshot, SnapshotCache};
pub use clock::{Clock, EndOfDayWindow, ReferenceZone, SystemClock};
pub use config::{Config, FetcherConfig};
pub use fetcher::{FetchError, FollowerFetcher};
pub use history::HistoryLedger;
pub use models::{Handle, HandleError, HistoryEntry, Profile, ProfileOutcome, ProfileSource};
pub use service::{
    Dashboard, DashboardService, DashboardStatus, ProfileError, ProfileService, ServiceSettings,
};
