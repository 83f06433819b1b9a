//! Consecutive-day reading streak.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::services::clock::{local_day, Clock};
use crate::storage::{keys, Binding, LocalStorage};
use crate::types::errors::StorageError;

/// Streak value after an update on `today`, or `None` when already counted today.
///
/// Yesterday extends the streak by one; any older date, or none, restarts it at 1.
pub fn next_streak(count: u32, last_update: Option<NaiveDate>, today: NaiveDate) -> Option<u32> {
    match last_update {
        Some(last) if last == today => None,
        Some(last) if last.succ_opt() == Some(today) => Some(count.saturating_add(1)),
        _ => Some(1),
    }
}

pub struct StreakTracker {
    count: Binding<u32>,
    last_update: Binding<Option<NaiveDate>>,
    clock: Arc<dyn Clock>,
}

impl StreakTracker {
    pub fn new(storage: &LocalStorage, clock: Arc<dyn Clock>) -> Self {
        Self {
            count: Binding::bind(storage, keys::STREAK_COUNT, 0),
            last_update: Binding::bind(storage, keys::STREAK_LAST_UPDATE, None),
            clock,
        }
    }

    pub fn count(&self) -> u32 {
        *self.count.get()
    }

    pub fn last_update(&self) -> Option<NaiveDate> {
        *self.last_update.get()
    }

    /// Counts today towards the streak. Returns the resulting streak.
    pub fn update(&mut self) -> Result<u32, StorageError> {
        let today = local_day(self.clock.now());
        if let Some(next) = next_streak(self.count(), self.last_update(), today) {
            self.count.set(next)?;
            self.last_update.set(Some(today))?;
            debug!(streak = next, "reading streak updated");
        }
        Ok(self.count())
    }

    pub fn sync(&mut self) -> bool {
        let count = self.count.sync();
        let last = self.last_update.sync();
        count || last
    }

    pub fn reload(&mut self) {
        self.count.reload();
        self.last_update.reload();
    }
}
