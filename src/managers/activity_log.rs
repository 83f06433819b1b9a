//! Capacity-bounded audit trail of user actions.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::services::clock::{local_day, Clock};
use crate::storage::{keys, Binding, LocalStorage};
use crate::types::activity::{ActivityLogEntry, ActivityType, ACTIVITY_LOG_LIMIT};
use crate::types::errors::StorageError;

/// The persisted activity log, newest entry first.
pub struct ActivityLog {
    entries: Binding<Vec<ActivityLogEntry>>,
    clock: Arc<dyn Clock>,
}

impl ActivityLog {
    pub fn new(storage: &LocalStorage, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Binding::bind(storage, keys::ACTIVITY_LOG, Vec::new()),
            clock,
        }
    }

    pub fn entries(&self) -> &[ActivityLogEntry] {
        self.entries.get()
    }

    /// Local calendar days with at least one entry, earliest first.
    pub fn activity_days(&self) -> Vec<NaiveDate> {
        self.entries()
            .iter()
            .map(|e| local_day(e.timestamp))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Entries recorded on the local calendar day `day`, newest first.
    pub fn activity_on(&self, day: NaiveDate) -> Vec<&ActivityLogEntry> {
        self.entries()
            .iter()
            .filter(|e| local_day(e.timestamp) == day)
            .collect()
    }

    /// Prepends an entry, dropping the oldest beyond the cap.
    pub fn append(
        &mut self,
        kind: ActivityType,
        description: impl Into<String>,
        bookmark_id: Option<&str>,
        bookmark_title: Option<&str>,
    ) -> Result<(), StorageError> {
        let entry = ActivityLogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: self.clock.now(),
            kind,
            description: description.into(),
            bookmark_id: bookmark_id.map(str::to_string),
            bookmark_title: bookmark_title.map(str::to_string),
        };
        self.entries.update(|current| {
            let mut next = Vec::with_capacity(ACTIVITY_LOG_LIMIT);
            next.push(entry);
            next.extend(current.iter().take(ACTIVITY_LOG_LIMIT - 1).cloned());
            next
        })
    }

    /// Empties the log. Irreversible.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        let dropped = self.entries.get().len();
        self.entries.set(Vec::new())?;
        info!(dropped, "activity log cleared");
        Ok(())
    }

    /// Replaces the whole log, keeping at most the first `ACTIVITY_LOG_LIMIT` entries.
    pub fn replace(&mut self, mut entries: Vec<ActivityLogEntry>) -> Result<(), StorageError> {
        entries.truncate(ACTIVITY_LOG_LIMIT);
        self.entries.set(entries)
    }

    pub fn sync(&mut self) -> bool {
        self.entries.sync()
    }

    pub fn reload(&mut self) {
        self.entries.reload();
    }
}
