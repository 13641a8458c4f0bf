//! Subcommand implementations.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use followwatch_core::auth::{CredentialStore, APIFY_ACCOUNT};
use followwatch_core::history::HistoryDocument;
use followwatch_core::service::dashboard::HISTORY_FILE;
use followwatch_core::store::JsonFileStore;
use followwatch_core::{
    fetcher, Clock, Config, DashboardService, Handle, HistoryLedger, ReferenceZone, SystemClock,
};
use tracing::{info, warn};

use crate::args::Month;
use crate::render::{self, ReportOptions};

/// The handle given on the command line, else the configured default.
fn resolve_handle(arg: Option<String>, config: &Config) -> Result<Handle> {
    let raw = arg
        .or_else(|| config.default_handle.clone())
        .ok_or_else(|| anyhow!("No handle given and no default_handle configured"))?;
    Handle::parse(&raw).map_err(Into::into)
}

fn open_service(config: &Config) -> Result<DashboardService> {
    let fetcher = fetcher::from_config(config)?;
    DashboardService::open(config, fetcher, Arc::new(SystemClock))
}

/// Read-only access to the ledger; needs no fetcher or token.
fn open_ledger(config: &Config) -> Result<HistoryLedger> {
    let path = config.data_dir()?.join(HISTORY_FILE);
    Ok(HistoryLedger::new(
        JsonFileStore::<HistoryDocument>::new(path),
        Arc::new(SystemClock),
        config.zone()?,
    ))
}

pub async fn fetch(config: &Config, handle: Option<String>, json: bool) -> Result<()> {
    let handle = resolve_handle(handle, config)?;
    let service = open_service(config)?;
    let dashboard = service.load(handle.as_str()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        print!("{}", render::dashboard(&dashboard, service.ledger().today()));
    }
    Ok(())
}

pub async fn watch(config: &Config, handle: Option<String>, interval_secs: Option<u64>) -> Result<()> {
    let handle = resolve_handle(handle, config)?;
    let service = open_service(config)?;
    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval());

    info!(handle = %handle, interval_secs = interval.as_secs(), "Watching follower count");
    eprintln!("Watching @{} every {}s (Ctrl+C to stop)", handle, interval.as_secs());

    watch_loop(&service, &handle, interval, config.zone()?, tokio::signal::ctrl_c()).await
}

/// Poll `handle` every `interval` until `shutdown` resolves.
///
/// `shutdown` is polled across ticks and in-flight loads alike, so a stop
/// request during a slow fetch ends the loop without waiting for it.
async fn watch_loop(
    service: &DashboardService,
    handle: &Handle,
    interval: Duration,
    zone: ReferenceZone,
    shutdown: impl Future<Output = io::Result<()>>,
) -> Result<()> {
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = &mut shutdown => return stopped(result),
        }

        let now = SystemClock.now().with_timezone(&zone.tz());
        tokio::select! {
            loaded = service.load(handle.as_str()) => match loaded {
                Ok(dashboard) => println!("{}", render::watch_line(&dashboard, now)),
                // Keep polling; the next tick may succeed
                Err(e) => {
                    warn!(handle = %handle, error = %e, "Poll failed");
                    eprintln!("[{}] Error: {}", now.format("%H:%M:%S"), e);
                }
            },
            result = &mut shutdown => return stopped(result),
        }
    }
}

fn stopped(result: io::Result<()>) -> Result<()> {
    result.context("Failed to listen for Ctrl+C")?;
    info!("Watch stopped");
    Ok(())
}

pub fn history(config: &Config, handle: Option<String>, month: Option<Month>) -> Result<()> {
    let handle = resolve_handle(handle, config)?;
    let ledger = open_ledger(config)?;
    print!("{}", render::history(&ledger.history(&handle), month));
    Ok(())
}

pub fn report(config: &Config, handle: Option<String>, options: ReportOptions) -> Result<()> {
    let handle = resolve_handle(handle, config)?;
    let ledger = open_ledger(config)?;
    print!("{}", render::report(&ledger.history(&handle), ledger.today(), &options));
    Ok(())
}

pub fn set_token() -> Result<()> {
    let token = rpassword::prompt_password("Apify API token: ")
        .context("Failed to read token")?;
    let token = token.trim();
    if token.is_empty() {
        bail!("Token cannot be empty");
    }
    CredentialStore::save_token(APIFY_ACCOUNT, token)?;
    eprintln!("Token stored in the OS keychain.");
    Ok(())
}

pub fn clear_token() -> Result<()> {
    CredentialStore::remove_token(APIFY_ACCOUNT)?;
    eprintln!("Token removed from the OS keychain.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use followwatch_core::{FetchError, FollowerFetcher, ServiceSettings};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Never answers, like a backend that hangs mid-request.
    struct HangingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FollowerFetcher for HangingFetcher {
        async fn fetch_followers(&self, _handle: &Handle) -> Result<u64, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
            Ok(0)
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_watch_stops_during_slow_load() {
        let fetcher = Arc::new(HangingFetcher {
            calls: AtomicUsize::new(0),
        });
        let settings = ServiceSettings {
            fetch_timeout: Duration::from_secs(3600),
            ..ServiceSettings::default()
        };
        let service = DashboardService::in_memory(settings, fetcher.clone(), Arc::new(SystemClock));
        let handle = Handle::parse("someone").unwrap();

        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<(), io::Error>(())
        };
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            watch_loop(&service, &handle, Duration::from_secs(60), settings.zone, shutdown),
        )
        .await;

        assert!(result.expect("watch kept waiting on the load").is_ok());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_watch_reports_signal_error() {
        let service = DashboardService::in_memory(
            ServiceSettings::default(),
            Arc::new(HangingFetcher {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(SystemClock),
        );
        let handle = Handle::parse("someone").unwrap();
        let shutdown = async { Err::<(), _>(io::Error::new(io::ErrorKind::Other, "no signal handler")) };

        let err = watch_loop(&service, &handle, Duration::from_secs(60), ReferenceZone::default(), shutdown)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Ctrl+C"));
    }
}
