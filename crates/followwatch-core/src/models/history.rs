use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of the follower ledger.
///
/// `change` is the difference from the previous entry, or 0 for the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub followers: u64,
    pub change: i64,
}

impl HistoryEntry {
    pub fn new(date: NaiveDate, followers: u64, change: i64) -> Self {
        Self {
            date,
            followers,
            change,
        }
    }

    /// `YYYY-MM` key of the month this entry belongs to.
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape_matches_stored_files() {
        let json = r#"{"date":"2025-11-02","followers":8123,"change":-4}"#;
        let entry: HistoryEntry = serde_json::from_str(json).expect("parse history entry");
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2025, 11, 2).unwrap());
        assert_eq!(entry.followers, 8123);
        assert_eq!(entry.change, -4);
        assert_eq!(serde_json::to_string(&entry).unwrap(), json);
    }

    #[test]
    fn test_month_key() {
        let entry = HistoryEntry::new(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(), 1, 0);
        assert_eq!(entry.month_key(), "2025-03");
    }
}
