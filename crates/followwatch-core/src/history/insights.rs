//! Period totals over a follower history.
//!
//! All functions take the ledger's output (oldest entry first) and never
//! modify it.

use chrono::{Datelike, NaiveDate};

use crate::models::HistoryEntry;

/// Number of trailing entries averaged for the daily growth rate.
const GROWTH_WINDOW_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    /// The last 7 recorded days.
    Week,
    /// The last 30 recorded days.
    Month,
}

impl Period {
    pub fn label(&self) -> &'static str {
        match self {
            Period::Today => "Today",
            Period::Week => "Last 7 days",
            Period::Month => "Last 30 days",
        }
    }

    fn trailing_days(&self) -> usize {
        match self {
            Period::Today => 1,
            Period::Week => 7,
            Period::Month => 30,
        }
    }
}

fn trailing(history: &[HistoryEntry], n: usize) -> &[HistoryEntry] {
    &history[history.len().saturating_sub(n)..]
}

/// Net follower change over `period`.
///
/// `Today` only counts an entry actually dated `today`; the trailing periods
/// sum the most recent entries regardless of gaps.
pub fn period_change(history: &[HistoryEntry], today: NaiveDate, period: Period) -> i64 {
    match period {
        Period::Today => history
            .iter()
            .rev()
            .find(|e| e.date == today)
            .map(|e| e.change)
            .unwrap_or(0),
        _ => trailing(history, period.trailing_days())
            .iter()
            .map(|e| e.change)
            .sum(),
    }
}

/// Distinct `YYYY-MM` keys present in the history, newest first.
pub fn available_months(history: &[HistoryEntry]) -> Vec<String> {
    let mut months: Vec<String> = history.iter().map(|e| e.month_key()).collect();
    months.sort_unstable_by(|a, b| b.cmp(a));
    months.dedup();
    months
}

/// Net change over one calendar month.
pub fn month_change(history: &[HistoryEntry], year: i32, month: u32) -> i64 {
    history
        .iter()
        .filter(|e| e.date.year() == year && e.date.month() == month)
        .map(|e| e.change)
        .sum()
}

/// Mean daily change over the last completed days (today excluded, since it
/// is still moving).
pub fn average_daily_growth(history: &[HistoryEntry], today: NaiveDate) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }

    let completed: Vec<&HistoryEntry> = history.iter().filter(|e| e.date < today).collect();
    let recent = &completed[completed.len().saturating_sub(GROWTH_WINDOW_DAYS)..];
    if recent.is_empty() {
        return 0.0;
    }

    let total: i64 = recent.iter().map(|e| e.change).sum();
    total as f64 / recent.len() as f64
}
