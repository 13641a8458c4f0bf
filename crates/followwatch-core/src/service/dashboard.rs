//! Profile lookup plus history update, shaped for display.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use super::{ProfileError, ProfileService, ServiceSettings};
use crate::cache::{CacheDocument, SnapshotCache};
use crate::clock::Clock;
use crate::config::Config;
use crate::fetcher::FollowerFetcher;
use crate::history::{HistoryDocument, HistoryLedger};
use crate::models::{Handle, HistoryEntry, Profile, ProfileSource};
use crate::store::{DocumentStore, JsonFileStore, MemoryStore};

pub const CACHE_FILE: &str = "cache.json";
pub const HISTORY_FILE: &str = "history.json";

/// How trustworthy the displayed count is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum DashboardStatus {
    /// Nothing has ever been recorded for this handle.
    Empty,
    /// Fetched just now, or served from an unexpired snapshot.
    Live,
    /// The last fetch failed; this is the last known count.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Dashboard {
    pub profile: Option<Profile>,
    pub history: Vec<HistoryEntry>,
    pub status: DashboardStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    pub end_of_day_sync: bool,
}

impl Dashboard {
    pub fn followers(&self) -> Option<u64> {
        self.profile.as_ref().map(|p| p.followers)
    }

    pub fn today(&self, today: NaiveDate) -> Option<&HistoryEntry> {
        self.history.iter().rev().find(|e| e.date == today)
    }
}

#[derive(Clone)]
pub struct DashboardService {
    profiles: ProfileService,
    ledger: Arc<HistoryLedger>,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    /// Services backed by `cache.json` and `history.json` in the configured
    /// data directory.
    pub fn open(
        config: &Config,
        fetcher: Arc<dyn FollowerFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let settings = config.service_settings()?;
        let data_dir = config.data_dir()?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        debug!(data_dir = %data_dir.display(), "Opening follower data");
        Ok(Self::with_data_dir(&data_dir, settings, fetcher, clock))
    }

    pub fn with_data_dir(
        data_dir: &Path,
        settings: ServiceSettings,
        fetcher: Arc<dyn FollowerFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_stores(
            JsonFileStore::<CacheDocument>::new(data_dir.join(CACHE_FILE)),
            JsonFileStore::<HistoryDocument>::new(data_dir.join(HISTORY_FILE)),
            settings,
            fetcher,
            clock,
        )
    }

    pub fn in_memory(
        settings: ServiceSettings,
        fetcher: Arc<dyn FollowerFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_stores(
            MemoryStore::<CacheDocument>::default(),
            MemoryStore::<HistoryDocument>::default(),
            settings,
            fetcher,
            clock,
        )
    }

    fn with_stores(
        cache: impl DocumentStore<CacheDocument> + 'static,
        history: impl DocumentStore<HistoryDocument> + 'static,
        settings: ServiceSettings,
        fetcher: Arc<dyn FollowerFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(SnapshotCache::new(cache, clock.clone(), settings.zone));
        let ledger = Arc::new(HistoryLedger::new(history, clock.clone(), settings.zone));
        Self {
            profiles: ProfileService::new(cache, fetcher, clock.clone(), settings),
            ledger,
            clock,
        }
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    /// Look up `handle` and record the count as today's history entry.
    ///
    /// Stale fallback counts are recorded too, so a day with only failed
    /// fetches still carries the last known value.
    pub async fn load(&self, handle: &str) -> Result<Dashboard, ProfileError> {
        let handle = Handle::parse(handle)?;
        let outcome = self.profiles.get_profile(&handle).await?;

        let history = match self.ledger.record_snapshot(&handle, outcome.followers()) {
            Ok(history) => history,
            Err(e) => {
                warn!(handle = %handle, error = %e, "Failed to record history, showing stored entries");
                self.ledger.history(&handle)
            }
        };

        let status = match outcome.source {
            ProfileSource::Fetched | ProfileSource::Cached => DashboardStatus::Live,
            ProfileSource::Fallback => DashboardStatus::Stale,
        };

        Ok(Dashboard {
            profile: Some(outcome.profile),
            history,
            status,
            fetch_error: outcome.fetch_error,
            end_of_day_sync: outcome.end_of_day_sync,
        })
    }

    /// What is stored for `handle`, without fetching or writing anything.
    pub fn peek(&self, handle: &str) -> Result<Dashboard, ProfileError> {
        let handle = Handle::parse(handle)?;
        let history = self.ledger.history(&handle);
        let snapshot = self.profiles.cache().get(&handle);

        let followers = snapshot
            .as_ref()
            .map(|s| s.followers)
            .or_else(|| history.last().map(|e| e.followers));

        let status = match (&snapshot, followers) {
            (_, None) => DashboardStatus::Empty,
            (Some(s), Some(_)) if s.is_fresh(self.clock.now()) => DashboardStatus::Live,
            _ => DashboardStatus::Stale,
        };

        Ok(Dashboard {
            profile: followers.map(|f| Profile::from_count(&handle, f)),
            history,
            status,
            fetch_error: None,
            end_of_day_sync: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_TTL;
    use crate::clock::FixedClock;
    use crate::models::HandleError;
    use crate::service::profile::tests::{five_to_midnight, noon, MockFetcher};
    use chrono::Duration;

    fn service(followers: Option<u64>) -> (DashboardService, Arc<FixedClock>, Arc<MockFetcher>) {
        let clock = Arc::new(FixedClock::new(noon()));
        let fetcher = Arc::new(MockFetcher::returning(followers));
        let service = DashboardService::in_memory(
            ServiceSettings::default(),
            fetcher.clone(),
            clock.clone(),
        );
        (service, clock, fetcher)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_first_load_records_history() {
        let (service, _, _) = service(Some(1000));
        let dashboard = service.load("@trawi.viajes").await.unwrap();

        assert_eq!(dashboard.status, DashboardStatus::Live);
        assert_eq!(dashboard.followers(), Some(1000));
        assert_eq!(dashboard.history, vec![HistoryEntry::new(date(2025, 6, 1), 1000, 0)]);
        assert!(dashboard.today(date(2025, 6, 1)).is_some());
    }

    #[tokio::test]
    async fn test_invalid_handle_rejected_before_fetch() {
        let (service, _, fetcher) = service(Some(1));
        let err = service.load("not a handle!").await.unwrap_err();
        assert!(matches!(err, ProfileError::InvalidHandle(HandleError::InvalidCharacter(_))));
        assert!(matches!(
            service.load("   ").await.unwrap_err(),
            ProfileError::InvalidHandle(HandleError::Empty)
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_same_day_updates_and_next_day_appends() {
        let (service, clock, fetcher) = service(Some(1000));
        service.load("trawi.viajes").await.unwrap();

        clock.advance(DEFAULT_TTL);
        fetcher.set(Some(1010));
        let dashboard = service.load("trawi.viajes").await.unwrap();
        assert_eq!(dashboard.history, vec![HistoryEntry::new(date(2025, 6, 1), 1010, 0)]);

        clock.advance(Duration::days(1));
        fetcher.set(Some(1025));
        let dashboard = service.load("trawi.viajes").await.unwrap();
        assert_eq!(
            dashboard.history,
            vec![
                HistoryEntry::new(date(2025, 6, 1), 1010, 0),
                HistoryEntry::new(date(2025, 6, 2), 1025, 15),
            ]
        );
    }

    #[tokio::test]
    async fn test_stale_fallback_still_recorded() {
        let (service, clock, fetcher) = service(Some(900));
        service.load("trawi.viajes").await.unwrap();

        fetcher.set(None);
        clock.advance(Duration::days(1));
        let dashboard = service.load("trawi.viajes").await.unwrap();
        assert_eq!(dashboard.status, DashboardStatus::Stale);
        assert!(dashboard.fetch_error.is_some());
        assert_eq!(dashboard.history.last(), Some(&HistoryEntry::new(date(2025, 6, 2), 900, 0)));
    }

    #[tokio::test]
    async fn test_hard_failure_records_nothing() {
        let (service, _, _) = service(None);
        assert!(matches!(
            service.load("trawi.viajes").await,
            Err(ProfileError::Unavailable { .. })
        ));
        assert!(service.ledger().history(&Handle::parse("trawi.viajes").unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_end_of_day_load_is_flagged() {
        let (service, clock, _) = service(Some(42));
        clock.set(five_to_midnight());
        let dashboard = service.load("trawi.viajes").await.unwrap();
        assert!(dashboard.end_of_day_sync);
        assert_eq!(dashboard.history[0].date, date(2025, 6, 1));
    }

    #[tokio::test]
    async fn test_peek_statuses() {
        let (service, clock, fetcher) = service(Some(500));
        let empty = service.peek("trawi.viajes").unwrap();
        assert_eq!(empty.status, DashboardStatus::Empty);
        assert!(empty.profile.is_none());

        service.load("trawi.viajes").await.unwrap();
        let live = service.peek("trawi.viajes").unwrap();
        assert_eq!(live.status, DashboardStatus::Live);
        assert_eq!(live.followers(), Some(500));

        clock.advance(DEFAULT_TTL);
        let stale = service.peek("trawi.viajes").unwrap();
        assert_eq!(stale.status, DashboardStatus::Stale);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_file_backed_service_persists() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FixedClock::new(noon()));
        let fetcher = Arc::new(MockFetcher::returning(Some(321)));

        let service = DashboardService::with_data_dir(
            dir.path(),
            ServiceSettings::default(),
            fetcher.clone(),
            clock.clone(),
        );
        service.load("trawi.viajes").await.unwrap();
        assert!(dir.path().join(CACHE_FILE).exists());
        assert!(dir.path().join(HISTORY_FILE).exists());

        // A fresh instance over the same files serves the cached count
        let reopened =
            DashboardService::with_data_dir(dir.path(), ServiceSettings::default(), fetcher.clone(), clock);
        let dashboard = reopened.load("trawi.viajes").await.unwrap();
        assert_eq!(dashboard.followers(), Some(321));
        assert_eq!(dashboard.history.len(), 1);
        assert_eq!(fetcher.calls(), 1);
    }
}
