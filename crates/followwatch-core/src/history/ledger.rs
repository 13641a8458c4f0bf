use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::clock::{Clock, ReferenceZone};
use crate::models::{Handle, HistoryEntry};
use crate::store::{Document, DocumentStore};

/// Stored document: handle -> entries, oldest first.
pub type HistoryDocument = BTreeMap<String, Vec<HistoryEntry>>;

pub struct HistoryLedger {
    doc: Document<HistoryDocument>,
    clock: Arc<dyn Clock>,
    zone: ReferenceZone,
}

impl HistoryLedger {
    pub fn new(
        backend: impl DocumentStore<HistoryDocument> + 'static,
        clock: Arc<dyn Clock>,
        zone: ReferenceZone,
    ) -> Self {
        Self {
            doc: Document::new(backend),
            clock,
            zone,
        }
    }

    /// Today's date key in the reference zone.
    pub fn today(&self) -> NaiveDate {
        self.zone.local_date(self.clock.now())
    }

    pub fn history(&self, handle: &Handle) -> Vec<HistoryEntry> {
        self.doc.read().remove(handle.as_str()).unwrap_or_default()
    }

    /// Record `followers` as today's value and return the full series.
    pub fn record_snapshot(&self, handle: &Handle, followers: u64) -> Result<Vec<HistoryEntry>> {
        let today = self.today();
        self.doc.update(|doc| {
            let entries = doc.entry(handle.to_string()).or_default();
            apply_snapshot(entries, today, followers, handle);
            entries.clone()
        })
    }
}

/// Write `followers` into the entry for `date`, keeping `change` consistent.
fn apply_snapshot(entries: &mut Vec<HistoryEntry>, date: NaiveDate, followers: u64, handle: &Handle) {
    if let Some(index) = entries.iter().position(|e| e.date == date) {
        let change = match index.checked_sub(1) {
            Some(prev) => delta(followers, entries[prev].followers),
            None => 0,
        };
        let entry = &mut entries[index];
        entry.followers = followers;
        entry.change = change;
        debug!(handle = %handle, %date, followers, change, "Updated today's history entry");
        return;
    }

    if let Some(last) = entries.last() {
        if last.date > date {
            // Past days are immutable; a clock that went backwards cannot rewrite them
            warn!(
                handle = %handle,
                %date,
                last_date = %last.date,
                "Snapshot dated before the latest history entry, ignoring"
            );
            return;
        }
    }

    let change = entries
        .last()
        .map(|last| delta(followers, last.followers))
        .unwrap_or(0);
    entries.push(HistoryEntry::new(date, followers, change));
    debug!(handle = %handle, %date, followers, change, "Appended history entry");
}

fn delta(current: u64, previous: u64) -> i64 {
    current as i64 - previous as i64
}
