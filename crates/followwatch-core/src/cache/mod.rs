//! Snapshot cache for fetched follower counts.
//!
//! One `Snapshot` per handle records the last known count and how long it may
//! be served without asking the fetcher again: 2 hours normally, 15 minutes
//! after a failed fetch. The cache also remembers the last day on which the
//! end-of-day refresh succeeded.

pub mod snapshot;

pub use snapshot::{CacheDocument, Snapshot, SnapshotCache, BACKOFF_TTL, DEFAULT_TTL};
