//! Time sources and the reference time zone.
//!
//! Every notion of "today" in the crate (cache end-of-day stamps, history
//! date keys, the end-of-day window) goes through [`ReferenceZone`], and every
//! notion of "now" goes through an injected [`Clock`].

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

/// Zone in which calendar days are counted unless configured otherwise.
pub const DEFAULT_REFERENCE_ZONE: &str = "America/Caracas";

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// IANA time zone in which calendar days are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone(Tz);

impl ReferenceZone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    pub fn tz(&self) -> Tz {
        self.0
    }

    /// Calendar date of `now` in this zone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.0).date_naive()
    }

    /// Wall-clock time of `now` in this zone.
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveTime {
        now.with_timezone(&self.0).time()
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self(chrono_tz::America::Caracas)
    }
}

impl FromStr for ReferenceZone {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| anyhow!("'{}' is not a valid IANA time zone (e.g. 'America/Caracas')", s))
    }
}

impl fmt::Display for ReferenceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name())
    }
}

/// The slot near midnight in which one authoritative snapshot per day is taken.
///
/// The window opens at `start` and runs to the end of the local day, so the
/// default `23:50` covers 23:50 through 23:59 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfDayWindow {
    start: NaiveTime,
}

impl EndOfDayWindow {
    pub fn new(start: NaiveTime) -> Self {
        Self { start }
    }

    /// Parse an `HH:MM` start time.
    pub fn parse(start: &str) -> Result<Self> {
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M")
            .map_err(|e| anyhow!("invalid end-of-day start '{}': {}", start, e))?;
        Ok(Self { start })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn contains(&self, local: NaiveTime) -> bool {
        local >= self.start
    }
}

impl Default for EndOfDayWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(23, 50, 0).unwrap_or_default(),
        }
    }
}
