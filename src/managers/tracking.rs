//! Side-effect sinks fed by bookmark mutations.

use std::sync::Arc;

use super::activity_log::ActivityLog;
use super::streak_tracker::StreakTracker;
use super::summary_tracker::{DailyTracker, WeeklyTracker};
use crate::services::clock::Clock;
use crate::storage::LocalStorage;
use crate::types::errors::StorageError;

/// The activity log, the weekly and daily summaries, and the streak.
pub struct Tracking {
    pub activity: ActivityLog,
    pub weekly: WeeklyTracker,
    pub daily: DailyTracker,
    pub streak: StreakTracker,
}

impl Tracking {
    pub fn new(storage: &LocalStorage, clock: Arc<dyn Clock>) -> Self {
        Self {
            activity: ActivityLog::new(storage, Arc::clone(&clock)),
            weekly: WeeklyTracker::new(storage, Arc::clone(&clock)),
            daily: DailyTracker::new(storage, Arc::clone(&clock)),
            streak: StreakTracker::new(storage, clock),
        }
    }

    /// Credits chapters read to both the weekly and the daily counter.
    pub fn credit_chapters(&mut self, count: u32) -> Result<(), StorageError> {
        if count == 0 {
            return Ok(());
        }
        self.weekly.increment_chapters(count)?;
        self.daily.increment_chapters(count)
    }

    /// Persists any pending window rollover.
    pub fn reconcile(&mut self) -> Result<(), StorageError> {
        self.weekly.reconcile()?;
        self.daily.reconcile()
    }

    pub fn sync(&mut self) -> bool {
        let activity = self.activity.sync();
        let weekly = self.weekly.sync();
        let daily = self.daily.sync();
        let streak = self.streak.sync();
        activity || weekly || daily || streak
    }

    pub fn reload(&mut self) {
        self.activity.reload();
        self.weekly.reload();
        self.daily.reload();
        self.streak.reload();
    }
}
