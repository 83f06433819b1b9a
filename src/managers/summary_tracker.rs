//! Weekly and daily reading counters.
//!
//! Both summaries roll over lazily. Reads return the reconciled value
//! without writing it; every mutation reconciles first and persists the
//! result, so a stale window never survives a write.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::services::clock::{local_day, start_of_day, start_of_week, Clock};
use crate::storage::{keys, Binding, LocalStorage};
use crate::types::errors::StorageError;
use crate::types::summary::{DailySummary, WeeklySummary};

/// Length of a weekly window in days.
const WEEK_DAYS: i64 = 7;

/// Fresh weekly summary for the week containing `now`.
pub fn empty_week(now: DateTime<Utc>) -> WeeklySummary {
    WeeklySummary {
        chapters_read: 0,
        series_updated: Vec::new(),
        start_date: start_of_week(now),
    }
}

/// Fresh daily summary for the day containing `now`.
pub fn empty_day(now: DateTime<Utc>) -> DailySummary {
    DailySummary {
        chapters_read: 0,
        date: start_of_day(now),
    }
}

/// Resets `summary` once `now` is past `start_date + 7 days`.
pub fn reconcile_weekly(summary: WeeklySummary, now: DateTime<Utc>) -> WeeklySummary {
    if now > summary.start_date + Duration::days(WEEK_DAYS) {
        empty_week(now)
    } else {
        summary
    }
}

/// Resets `summary` when its date is not the local calendar day of `now`.
pub fn reconcile_daily(summary: DailySummary, now: DateTime<Utc>) -> DailySummary {
    if local_day(summary.date) != local_day(now) {
        empty_day(now)
    } else {
        summary
    }
}

pub struct WeeklyTracker {
    summary: Binding<WeeklySummary>,
    clock: Arc<dyn Clock>,
}

impl WeeklyTracker {
    pub fn new(storage: &LocalStorage, clock: Arc<dyn Clock>) -> Self {
        let initial = empty_week(clock.now());
        Self {
            summary: Binding::bind(storage, keys::WEEKLY_SUMMARY, initial),
            clock,
        }
    }

    /// The summary for the current window.
    pub fn current(&self) -> WeeklySummary {
        reconcile_weekly(self.summary.get().clone(), self.clock.now())
    }

    /// Persists a rollover if the stored window has expired.
    pub fn reconcile(&mut self) -> Result<(), StorageError> {
        let current = self.current();
        if &current != self.summary.get() {
            debug!(start = %current.start_date, "weekly summary rolled over");
            self.summary.set(current)?;
        }
        Ok(())
    }

    pub fn increment_chapters(&mut self, count: u32) -> Result<(), StorageError> {
        let mut next = self.current();
        next.chapters_read = next.chapters_read.saturating_add(count);
        self.summary.set(next)
    }

    /// Records that `bookmark_id` was touched this week. Idempotent.
    pub fn add_series_update(&mut self, bookmark_id: &str) -> Result<(), StorageError> {
        let mut next = self.current();
        if next.series_updated.iter().any(|id| id == bookmark_id) {
            return self.reconcile();
        }
        next.series_updated.push(bookmark_id.to_string());
        self.summary.set(next)
    }

    /// Starts a fresh summary for the current week.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.summary.set(empty_week(self.clock.now()))
    }

    pub fn sync(&mut self) -> bool {
        self.summary.sync()
    }

    pub fn reload(&mut self) {
        self.summary.reload();
    }
}

pub struct DailyTracker {
    summary: Binding<DailySummary>,
    clock: Arc<dyn Clock>,
}

impl DailyTracker {
    pub fn new(storage: &LocalStorage, clock: Arc<dyn Clock>) -> Self {
        let initial = empty_day(clock.now());
        Self {
            summary: Binding::bind(storage, keys::DAILY_SUMMARY, initial),
            clock,
        }
    }

    pub fn current(&self) -> DailySummary {
        reconcile_daily(self.summary.get().clone(), self.clock.now())
    }

    pub fn reconcile(&mut self) -> Result<(), StorageError> {
        let current = self.current();
        if &current != self.summary.get() {
            debug!(date = %current.date, "daily summary rolled over");
            self.summary.set(current)?;
        }
        Ok(())
    }

    pub fn increment_chapters(&mut self, count: u32) -> Result<(), StorageError> {
        let mut next = self.current();
        next.chapters_read = next.chapters_read.saturating_add(count);
        self.summary.set(next)
    }

    pub fn sync(&mut self) -> bool {
        self.summary.sync()
    }

    pub fn reload(&mut self) {
        self.summary.reload();
    }
}
