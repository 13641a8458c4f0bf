//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the tracked handle, the reference time zone, cache lifetimes, the
//! end-of-day window and which fetcher backend to use.
//!
//! Configuration is stored at `~/.config/followwatch/config.json`. Every field
//! is optional in the file; missing fields take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::{EndOfDayWindow, ReferenceZone, DEFAULT_REFERENCE_ZONE};
use crate::fetcher::apify::INSTAGRAM_PROFILE_SCRAPER;
use crate::service::ServiceSettings;

/// Application name used for config/data directory paths
const APP_NAME: &str = "followwatch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides the data directory when set.
pub const DATA_DIR_ENV: &str = "FOLLOWWATCH_DATA_DIR";

const DEFAULT_CACHE_TTL_MINUTES: i64 = 120;
const DEFAULT_BACKOFF_TTL_MINUTES: i64 = 15;
const DEFAULT_END_OF_DAY_START: &str = "23:50";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Upper bound for either TTL: one year.
const MAX_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Which external source produces follower counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// Run `program args... <handle>`; stdout is the count.
    Script {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Call the Apify scraper actor directly.
    Apify {
        #[serde(default = "default_actor_id")]
        actor_id: String,
        /// API root, for a proxy in front of api.apify.com.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

fn default_actor_id() -> String {
    INSTAGRAM_PROFILE_SCRAPER.to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig::Script {
            program: "python3".to_string(),
            args: vec!["scripts/get_followers.py".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_handle: Option<String>,
    pub reference_zone: String,
    pub cache_ttl_minutes: i64,
    pub backoff_ttl_minutes: i64,
    /// `HH:MM` in the reference zone; the window runs to midnight.
    pub end_of_day_start: String,
    pub fetch_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub fetcher: FetcherConfig,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_handle: None,
            reference_zone: DEFAULT_REFERENCE_ZONE.to_string(),
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            backoff_ttl_minutes: DEFAULT_BACKOFF_TTL_MINUTES,
            end_of_day_start: DEFAULT_END_OF_DAY_START.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            fetcher: FetcherConfig::default(),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where `cache.json` and `history.json` live.
    ///
    /// `FOLLOWWATCH_DATA_DIR` wins over the config file, which wins over the
    /// platform data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("logs"))
    }

    pub fn zone(&self) -> Result<ReferenceZone> {
        self.reference_zone.parse()
    }

    pub fn end_of_day_window(&self) -> Result<EndOfDayWindow> {
        EndOfDayWindow::parse(&self.end_of_day_start)
    }

    pub fn cache_ttl(&self) -> Result<Duration> {
        ttl_minutes("cache_ttl_minutes", self.cache_ttl_minutes)
    }

    pub fn backoff_ttl(&self) -> Result<Duration> {
        ttl_minutes("backoff_ttl_minutes", self.backoff_ttl_minutes)
    }

    pub fn fetch_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.fetch_timeout_secs)
    }

    pub fn poll_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Validate the config and turn it into orchestrator settings.
    pub fn service_settings(&self) -> Result<ServiceSettings> {
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be positive");
        }

        Ok(ServiceSettings {
            zone: self.zone()?,
            window: self.end_of_day_window()?,
            cache_ttl: self.cache_ttl()?,
            backoff_ttl: self.backoff_ttl()?,
            fetch_timeout: self.fetch_timeout(),
        })
    }
}

/// A positive TTL of at most `MAX_TTL_MINUTES`.
fn ttl_minutes(field: &str, minutes: i64) -> Result<Duration> {
    if minutes <= 0 || minutes > MAX_TTL_MINUTES {
        anyhow::bail!("{} must be between 1 and {}, got {}", field, MAX_TTL_MINUTES, minutes);
    }
    Duration::try_minutes(minutes).ok_or_else(|| anyhow!("{} is out of range: {}", field, minutes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let settings = config.service_settings().unwrap();
        assert_eq!(settings.cache_ttl, Duration::hours(2));
        assert_eq!(settings.backoff_ttl, Duration::minutes(15));
        assert_eq!(settings.zone.to_string(), "America/Caracas");
        assert_eq!(settings.window, EndOfDayWindow::default());
        assert_eq!(config.poll_interval(), StdDuration::from_secs(60));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"default_handle": "trawi.viajes", "fetcher": {"kind": "apify"}}"#,
        )
        .unwrap();
        assert_eq!(config.default_handle.as_deref(), Some("trawi.viajes"));
        assert_eq!(config.cache_ttl_minutes, 120);
        assert_eq!(
            config.fetcher,
            FetcherConfig::Apify {
                actor_id: INSTAGRAM_PROFILE_SCRAPER.to_string(),
                base_url: None,
            }
        );
    }

    #[test]
    fn test_script_fetcher_config() {
        let config: Config = serde_json::from_str(
            r#"{"fetcher": {"kind": "script", "program": "/usr/local/bin/count"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.fetcher,
            FetcherConfig::Script {
                program: "/usr/local/bin/count".to_string(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = Config {
            reference_zone: "Nowhere/Land".to_string(),
            ..Config::default()
        };
        assert!(config.service_settings().is_err());

        config.reference_zone = DEFAULT_REFERENCE_ZONE.to_string();
        config.backoff_ttl_minutes = 0;
        assert!(config.service_settings().is_err());

        config.backoff_ttl_minutes = 15;
        config.end_of_day_start = "late".to_string();
        assert!(config.service_settings().is_err());
    }

    #[test]
    fn test_oversized_ttl_is_an_error() {
        let config: Config =
            serde_json::from_str(r#"{"cache_ttl_minutes": 9223372036854775807}"#).unwrap();
        let err = config.service_settings().unwrap_err();
        assert!(err.to_string().contains("cache_ttl_minutes"));

        let config = Config {
            backoff_ttl_minutes: MAX_TTL_MINUTES + 1,
            ..Config::default()
        };
        assert!(config.service_settings().is_err());

        let config = Config {
            cache_ttl_minutes: MAX_TTL_MINUTES,
            ..Config::default()
        };
        assert_eq!(config.cache_ttl().unwrap(), Duration::days(365));
    }

    #[test]
    fn test_apify_base_url_config() {
        let config: Config = serde_json::from_str(
            r#"{"fetcher": {"kind": "apify", "base_url": "http://proxy.local/v2"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.fetcher,
            FetcherConfig::Apify {
                actor_id: INSTAGRAM_PROFILE_SCRAPER.to_string(),
                base_url: Some("http://proxy.local/v2".to_string()),
            }
        );
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            default_handle: Some("someone".to_string()),
            poll_interval_secs: 30,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }
}
