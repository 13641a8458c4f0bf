//! Cached, deduplicated follower-count lookups.
//!
//! For each handle a lookup either serves the cached snapshot or calls the
//! fetcher, never both, and never more than one fetch at a time: callers that
//! arrive while a fetch is running await that same fetch. Between 23:50 and
//! midnight in the reference zone the first lookup of the day bypasses the
//! cache so each day ends on an authoritative count.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ServiceSettings;
use crate::cache::{Snapshot, SnapshotCache};
use crate::clock::Clock;
use crate::fetcher::{FetchError, FollowerFetcher};
use crate::models::{Handle, HandleError, Profile, ProfileOutcome, ProfileSource};

#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    #[error("Invalid handle: {0}")]
    InvalidHandle(#[from] HandleError),

    /// The fetch failed and there is no earlier snapshot to fall back on.
    #[error("No follower data available for {handle}: {source}")]
    Unavailable {
        handle: String,
        #[source]
        source: Arc<FetchError>,
    },

    #[error("Fetch for {handle} did not complete: {reason}")]
    Aborted { handle: String, reason: String },
}

type LookupResult = Result<ProfileOutcome, ProfileError>;
type PendingLookup = Shared<BoxFuture<'static, LookupResult>>;

/// Clone is cheap; clones share the cache, the fetcher and the in-flight registry.
#[derive(Clone)]
pub struct ProfileService {
    inner: Arc<Inner>,
}

struct Inner {
    cache: Arc<SnapshotCache>,
    fetcher: Arc<dyn FollowerFetcher>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
    in_flight: Mutex<HashMap<Handle, PendingLookup>>,
}

impl ProfileService {
    pub fn new(
        cache: Arc<SnapshotCache>,
        fetcher: Arc<dyn FollowerFetcher>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                fetcher,
                clock,
                settings,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.inner.cache
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.inner.settings
    }

    /// Number of handles with a fetch currently running.
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock_in_flight().len()
    }

    /// Current follower count for `handle`, from cache or a fresh fetch.
    ///
    /// `Ok` with `ProfileSource::Fallback` means the fetch failed and the last
    /// known count is being served; `Err(Unavailable)` means there was nothing
    /// to fall back on.
    pub async fn get_profile(&self, handle: &Handle) -> LookupResult {
        let pending = {
            let mut in_flight = self.inner.lock_in_flight();
            match in_flight.get(handle) {
                Some(pending) => {
                    debug!(handle = %handle, "Joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    let pending = self.start_lookup(handle.clone());
                    in_flight.insert(handle.clone(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Run the lookup on its own task so a caller giving up does not cancel
    /// the fetch for everyone else waiting on it.
    fn start_lookup(&self, handle: Handle) -> PendingLookup {
        let inner = Arc::clone(&self.inner);
        let task_handle = handle.clone();

        let task = tokio::spawn(async move {
            let _registration = InFlightRegistration {
                inner: Arc::clone(&inner),
                handle: task_handle.clone(),
            };
            inner.resolve(&task_handle).await
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(ProfileError::Aborted {
                    handle: handle.to_string(),
                    reason: e.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }
}

/// Removes the handle from the in-flight registry when the lookup ends,
/// whether it returned, failed or panicked.
struct InFlightRegistration {
    inner: Arc<Inner>,
    handle: Handle,
}

impl Drop for InFlightRegistration {
    fn drop(&mut self) {
        self.inner.lock_in_flight().remove(&self.handle);
    }
}

impl Inner {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<Handle, PendingLookup>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether this lookup must be the day's end-of-day refresh.
    fn end_of_day_due(&self, now: DateTime<Utc>, cached: Option<&Snapshot>) -> bool {
        let zone = self.settings.zone;
        if !self.settings.window.contains(zone.local_time(now)) {
            return false;
        }
        let today = zone.local_date(now);
        !cached.is_some_and(|s| s.synced_end_of_day_on(today))
    }

    async fn resolve(&self, handle: &Handle) -> LookupResult {
        // Read and decide synchronously; the fetch is the only await
        let now = self.clock.now();
        let cached = self.cache.get(handle);
        let end_of_day = self.end_of_day_due(now, cached.as_ref());

        if end_of_day {
            info!(
                handle = %handle,
                date = %self.settings.zone.local_date(now),
                "End-of-day window open, forcing refresh"
            );
        } else if let Some(snapshot) = cached.as_ref().filter(|s| s.is_fresh(now)) {
            debug!(
                handle = %handle,
                followers = snapshot.followers,
                expires_at = %snapshot.expires_at,
                "Serving cached follower count"
            );
            return Ok(outcome(handle, snapshot.followers, ProfileSource::Cached, false, None));
        }

        info!(handle = %handle, fetcher = self.fetcher.name(), "Fetching fresh follower count");
        match self.fetch(handle).await {
            Ok(followers) => {
                if let Err(e) = self
                    .cache
                    .put(handle, followers, end_of_day, self.settings.cache_ttl)
                {
                    warn!(handle = %handle, error = %e, "Failed to cache follower count");
                }
                info!(handle = %handle, followers, end_of_day, "Fetched follower count");
                Ok(outcome(handle, followers, ProfileSource::Fetched, end_of_day, None))
            }
            Err(e) => self.fall_back(handle, e),
        }
    }

    async fn fetch(&self, handle: &Handle) -> Result<u64, FetchError> {
        let timeout = self.settings.fetch_timeout;
        match tokio::time::timeout(timeout, self.fetcher.fetch_followers(handle)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout.as_secs())),
        }
    }

    /// Serve the last known count and hold off retrying for the backoff TTL.
    fn fall_back(&self, handle: &Handle, error: FetchError) -> LookupResult {
        let error = Arc::new(error);

        let Some(previous) = self.cache.get(handle) else {
            warn!(handle = %handle, error = %error, "Fetch failed with no cached count to fall back on");
            return Err(ProfileError::Unavailable {
                handle: handle.to_string(),
                source: error,
            });
        };

        warn!(
            handle = %handle,
            error = %error,
            followers = previous.followers,
            backoff_minutes = self.settings.backoff_ttl.num_minutes(),
            "Fetch failed, serving last known count"
        );
        if let Err(e) = self
            .cache
            .put(handle, previous.followers, false, self.settings.backoff_ttl)
        {
            warn!(handle = %handle, error = %e, "Failed to write backoff snapshot");
        }

        Ok(outcome(
            handle,
            previous.followers,
            ProfileSource::Fallback,
            false,
            Some(error.to_string()),
        ))
    }
}

fn outcome(
    handle: &Handle,
    followers: u64,
    source: ProfileSource,
    end_of_day_sync: bool,
    fetch_error: Option<String>,
) -> ProfileOutcome {
    ProfileOutcome {
        profile: Profile::from_count(handle, followers),
        source,
        end_of_day_sync,
        fetch_error,
    }
}
