//! Orchestration: cached profile lookups and the dashboard built on them.
//!
//! - `ProfileService`: cache-or-fetch decisions, per-handle deduplication,
//!   the forced end-of-day refresh and stale fallback with backoff
//! - `DashboardService`: a lookup plus the history ledger update, shaped for
//!   the presentation layer

pub mod dashboard;
pub mod profile;

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::cache::{BACKOFF_TTL, DEFAULT_TTL};
use crate::clock::{EndOfDayWindow, ReferenceZone};

pub use dashboard::{Dashboard, DashboardService, DashboardStatus};
pub use profile::{ProfileError, ProfileService};

/// Default bound on one external fetch.
pub const DEFAULT_FETCH_TIMEOUT: StdDuration = StdDuration::from_secs(120);

/// Knobs for `ProfileService`, usually built by `Config::service_settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub zone: ReferenceZone,
    pub window: EndOfDayWindow,
    pub cache_ttl: Duration,
    pub backoff_ttl: Duration,
    pub fetch_timeout: StdDuration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            zone: ReferenceZone::default(),
            window: EndOfDayWindow::default(),
            cache_ttl: DEFAULT_TTL,
            backoff_ttl: BACKOFF_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}
