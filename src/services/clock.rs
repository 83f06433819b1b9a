//! Time source and calendar helpers.
//!
//! Every time-dependent store reads "now" through a [`Clock`] so tests can
//! pin and advance time. Day and week boundaries are computed in the local
//! time zone; weeks start on Sunday.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Calendar day of `ts` in the local time zone.
pub fn local_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// Local midnight starting `day`, as UTC.
pub fn start_of_local_day(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST jump; treat it as UTC midnight.
        None => Utc.from_utc_datetime(&midnight),
    }
}

/// Start of the local day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    start_of_local_day(local_day(ts))
}

/// Start of the local week (Sunday) containing `ts`.
pub fn start_of_week(ts: DateTime<Utc>) -> DateTime<Utc> {
    let day = local_day(ts);
    let offset = i64::from(day.weekday().num_days_from_sunday());
    start_of_local_day(day - Duration::days(offset))
}
