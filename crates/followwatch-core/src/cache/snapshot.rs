use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, ReferenceZone};
use crate::models::Handle;
use crate::store::{Document, DocumentStore};

/// How long a successful fetch is served from cache.
pub const DEFAULT_TTL: Duration = Duration::hours(2);

/// How long a fallback is served after a failed fetch before retrying.
pub const BACKOFF_TTL: Duration = Duration::minutes(15);

/// Stored document: handle -> snapshot.
pub type CacheDocument = BTreeMap<String, Snapshot>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub followers: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_end_of_day_sync: Option<NaiveDate>,
}

impl Snapshot {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn ttl(&self) -> Duration {
        self.expires_at - self.last_updated
    }

    pub fn synced_end_of_day_on(&self, date: NaiveDate) -> bool {
        self.last_end_of_day_sync == Some(date)
    }
}

pub struct SnapshotCache {
    doc: Document<CacheDocument>,
    clock: Arc<dyn Clock>,
    zone: ReferenceZone,
}

impl SnapshotCache {
    pub fn new(
        backend: impl DocumentStore<CacheDocument> + 'static,
        clock: Arc<dyn Clock>,
        zone: ReferenceZone,
    ) -> Self {
        Self {
            doc: Document::new(backend),
            clock,
            zone,
        }
    }

    pub fn get(&self, handle: &Handle) -> Option<Snapshot> {
        self.doc.read().remove(handle.as_str())
    }

    /// Record `followers` for `handle`, fresh for `ttl` from now.
    ///
    /// The end-of-day date is carried over from the previous snapshot unless
    /// this write is itself the end-of-day sync, in which case it becomes today.
    pub fn put(
        &self,
        handle: &Handle,
        followers: u64,
        end_of_day_sync: bool,
        ttl: Duration,
    ) -> Result<Snapshot> {
        let now = self.clock.now();
        let today = self.zone.local_date(now);

        let snapshot = self.doc.update(|doc| {
            let previous_sync = doc
                .get(handle.as_str())
                .and_then(|s| s.last_end_of_day_sync);

            let snapshot = Snapshot {
                followers,
                last_updated: now,
                expires_at: now + ttl,
                last_end_of_day_sync: if end_of_day_sync {
                    Some(today)
                } else {
                    previous_sync
                },
            };
            doc.insert(handle.to_string(), snapshot.clone());
            snapshot
        })?;

        debug!(
            handle = %handle,
            followers,
            ttl_minutes = ttl.num_minutes(),
            end_of_day_sync,
            "Cached snapshot"
        );
        Ok(snapshot)
    }
}
