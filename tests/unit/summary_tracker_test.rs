//! Tests for the weekly/daily reading counters and the reading streak.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use rstest::rstest;

use mangamarks::managers::streak_tracker::{next_streak, StreakTracker};
use mangamarks::managers::summary_tracker::{empty_week, DailyTracker, WeeklyTracker};
use mangamarks::services::clock::{start_of_day, start_of_week, Clock, ManualClock};
use mangamarks::storage::{keys, Binding, StorageArea};
use mangamarks::types::summary::WeeklySummary;

fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

#[rstest]
#[case::first_update(0, None, day(6, 5), Some(1))]
#[case::same_day(4, Some(day(6, 5)), day(6, 5), None)]
#[case::yesterday(4, Some(day(6, 4)), day(6, 5), Some(5))]
#[case::gap(4, Some(day(6, 2)), day(6, 5), Some(1))]
#[case::across_month(9, Some(day(5, 31)), day(6, 1), Some(10))]
fn test_next_streak(
    #[case] count: u32,
    #[case] last: Option<NaiveDate>,
    #[case] today: NaiveDate,
    #[case] expected: Option<u32>,
) {
    assert_eq!(next_streak(count, last, today), expected);
}

#[test]
fn test_weekly_counts_accumulate_within_the_week() {
    // Wednesday; the week started on Sunday 2024-06-02.
    let clock = Arc::new(ManualClock::new(local(2024, 6, 5, 12, 0)));
    let tab = StorageArea::in_memory().open_tab();
    let mut weekly = WeeklyTracker::new(&tab, clock.clone());

    weekly.increment_chapters(3).unwrap();
    weekly.add_series_update("a").unwrap();
    weekly.add_series_update("a").unwrap();
    clock.set(local(2024, 6, 8, 22, 0));
    weekly.increment_chapters(1).unwrap();

    let current = weekly.current();
    assert_eq!(current.chapters_read, 4);
    assert_eq!(current.series_updated, vec!["a".to_string()]);
    assert_eq!(current.start_date, local(2024, 6, 2, 0, 0));
}

#[test]
fn test_weekly_rollover_is_lazy_until_reconciled() {
    let clock = Arc::new(ManualClock::new(local(2024, 6, 5, 12, 0)));
    let area = StorageArea::in_memory();
    let tab = area.open_tab();
    let mut weekly = WeeklyTracker::new(&tab, clock.clone());
    weekly.increment_chapters(6).unwrap();

    clock.set(local(2024, 6, 10, 9, 0));
    assert_eq!(weekly.current().chapters_read, 0);
    assert_eq!(weekly.current().start_date, local(2024, 6, 9, 0, 0));

    let placeholder = empty_week(clock.now());
    let stored = Binding::bind(&area.open_tab(), keys::WEEKLY_SUMMARY, placeholder.clone());
    assert_eq!(stored.get().chapters_read, 6);

    weekly.reconcile().unwrap();
    let stored = Binding::bind(&area.open_tab(), keys::WEEKLY_SUMMARY, placeholder);
    assert_eq!(stored.get().chapters_read, 0);
}

#[test]
fn test_stale_stored_week_resets_on_read() {
    let now = local(2024, 6, 5, 12, 0);
    let area = StorageArea::in_memory();
    let mut writer = Binding::bind(&area.open_tab(), keys::WEEKLY_SUMMARY, empty_week(now));
    writer
        .set(WeeklySummary {
            chapters_read: 12,
            series_updated: vec!["x".to_string()],
            start_date: now - Duration::days(8),
        })
        .unwrap();

    let weekly = WeeklyTracker::new(&area.open_tab(), Arc::new(ManualClock::new(now)));
    let current = weekly.current();
    assert_eq!(current.chapters_read, 0);
    assert!(current.series_updated.is_empty());
    assert_eq!(current.start_date, start_of_week(now));
}

#[test]
fn test_daily_rolls_over_at_local_midnight() {
    let clock = Arc::new(ManualClock::new(local(2024, 6, 5, 23, 30)));
    let tab = StorageArea::in_memory().open_tab();
    let mut daily = DailyTracker::new(&tab, clock.clone());

    daily.increment_chapters(2).unwrap();
    assert_eq!(daily.current().chapters_read, 2);

    clock.advance(Duration::hours(1));
    let today = daily.current();
    assert_eq!(today.chapters_read, 0);
    assert_eq!(today.date, start_of_day(local(2024, 6, 6, 0, 30)));

    daily.increment_chapters(1).unwrap();
    assert_eq!(daily.current().chapters_read, 1);
}

#[test]
fn test_streak_extends_and_restarts() {
    let clock = Arc::new(ManualClock::new(local(2024, 6, 5, 8, 0)));
    let tab = StorageArea::in_memory().open_tab();
    let mut streak = StreakTracker::new(&tab, clock.clone());

    assert_eq!(streak.update().unwrap(), 1);
    clock.advance(Duration::hours(10));
    assert_eq!(streak.update().unwrap(), 1);

    clock.advance(Duration::days(1));
    assert_eq!(streak.update().unwrap(), 2);
    assert_eq!(streak.last_update(), Some(day(6, 6)));

    clock.advance(Duration::days(3));
    assert_eq!(streak.update().unwrap(), 1);
    assert_eq!(streak.last_update(), Some(day(6, 9)));
}

#[test]
fn test_streak_is_shared_across_tabs() {
    let clock = Arc::new(ManualClock::new(local(2024, 6, 5, 8, 0)));
    let area = StorageArea::in_memory();
    let mut first = StreakTracker::new(&area.open_tab(), clock.clone());
    let mut second = StreakTracker::new(&area.open_tab(), clock.clone());

    first.update().unwrap();
    assert_eq!(second.count(), 0);
    assert!(second.sync());
    assert_eq!(second.count(), 1);

    clock.advance(Duration::days(1));
    assert_eq!(second.update().unwrap(), 2);
}
