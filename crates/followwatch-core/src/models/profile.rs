//! Profile lookups and where their data came from.

use serde::{Deserialize, Serialize};

use super::Handle;

/// Account profile as shown on the dashboard.
///
/// Only `followers` comes from the fetcher; the display fields are filled
/// with neutral defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Profile {
    pub username: String,
    pub full_name: String,
    pub followers: u64,
    pub following: u64,
    pub profile_pic_url: String,
    pub biography: String,
}

impl Profile {
    pub fn from_count(handle: &Handle, followers: u64) -> Self {
        Self {
            username: handle.to_string(),
            full_name: handle.to_string(),
            followers,
            following: 0,
            profile_pic_url: String::new(),
            biography: String::new(),
        }
    }
}

/// How a profile lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ProfileSource {
    /// The fetcher just returned this count.
    Fetched,
    /// An unexpired snapshot was served without calling the fetcher.
    Cached,
    /// The fetcher failed and the last known count was served instead.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOutcome {
    pub profile: Profile,
    pub source: ProfileSource,
    /// True when this lookup was the day's forced end-of-day refresh.
    pub end_of_day_sync: bool,
    /// Why the fetcher failed, for `Fallback` outcomes.
    pub fetch_error: Option<String>,
}

impl ProfileOutcome {
    pub fn followers(&self) -> u64 {
        self.profile.followers
    }

    pub fn is_stale(&self) -> bool {
        self.source == ProfileSource::Fallback
    }
}
