//! Integration tests for the bookmark store and the side effects it feeds.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use rstest::rstest;

use mangamarks::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use mangamarks::managers::bookmark_view;
use mangamarks::managers::tracking::Tracking;
use mangamarks::services::clock::{Clock, ManualClock};
use mangamarks::storage::StorageArea;
use mangamarks::types::activity::ActivityType;
use mangamarks::types::bookmark::{BookmarkDraft, Folder, SaveKind, HISTORY_LIMIT};
use mangamarks::types::errors::BookmarkError;
use mangamarks::types::preset::SortOrder;
use mangamarks::types::status::ReadingStatus;

fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, m, d, 12, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

struct Fixture {
    clock: Arc<ManualClock>,
    manager: BookmarkManager,
    tracking: Tracking,
    statuses: Vec<ReadingStatus>,
}

impl Fixture {
    fn new() -> Self {
        let area = StorageArea::in_memory();
        let tab = area.open_tab();
        let clock = Arc::new(ManualClock::new(local_noon(2024, 3, 6)));
        Self {
            manager: BookmarkManager::new(&tab, clock.clone()),
            tracking: Tracking::new(&tab, clock.clone()),
            statuses: ReadingStatus::defaults(),
            clock,
        }
    }

    fn add(&mut self, title: &str, url: &str, chapter: f64) -> String {
        let draft = BookmarkDraft::new(title, url, chapter, "reading");
        self.manager
            .add_or_update(draft, None, &self.statuses, &mut self.tracking)
            .unwrap()
            .id
    }

    fn set_chapter(&mut self, id: &str, chapter: f64) {
        self.clock.advance(Duration::minutes(1));
        self.manager
            .update_chapter(id, chapter, &self.statuses, &mut self.tracking)
            .unwrap();
    }
}

#[test]
fn test_create_feeds_log_summary_and_streak() {
    let mut f = Fixture::new();
    let id = f.add("Solo Leveling", "https://example.com/solo", 10.0);

    let bookmark = f.manager.get(&id).unwrap();
    assert_eq!(bookmark.chapter, 10.0);
    assert!(bookmark.history.is_empty());

    let entry = &f.tracking.activity.entries()[0];
    assert_eq!(entry.kind, ActivityType::Create);
    assert_eq!(entry.bookmark_id.as_deref(), Some(id.as_str()));
    assert_eq!(f.tracking.weekly.current().series_updated, vec![id]);
    assert_eq!(f.tracking.streak.count(), 1);
}

#[test]
fn test_same_series_create_replaces_in_place() {
    let mut f = Fixture::new();
    let id = f.add("Solo Leveling", "https://example.com/solo", 10.0);

    f.clock.advance(Duration::minutes(5));
    let outcome = f
        .manager
        .add_or_update(
            BookmarkDraft::new("Solo Leveling Chapter 11", "https://example.com/solo", 11.0, "reading"),
            None,
            &f.statuses,
            &mut f.tracking,
        )
        .unwrap();

    assert_eq!(outcome.kind, SaveKind::Merged);
    assert_eq!(outcome.id, id);
    assert_eq!(f.manager.bookmarks().len(), 1);
    let merged = f.manager.get(&id).unwrap();
    assert_eq!(merged.chapter, 11.0);
    assert_eq!(merged.history.len(), 1);
    assert_eq!(merged.history[0].state.chapter, 10.0);
    assert_eq!(f.tracking.weekly.current().chapters_read, 1);
}

#[test]
fn test_same_url_different_series_is_a_new_bookmark() {
    let mut f = Fixture::new();
    f.add("Solo Leveling", "https://example.com/list", 10.0);
    f.add("Tower of God", "https://example.com/list", 3.0);
    assert_eq!(f.manager.bookmarks().len(), 2);
}

#[test]
fn test_edit_keeps_bounded_history_newest_first() {
    let mut f = Fixture::new();
    let id = f.add("Omniscient Reader", "https://example.com/orv", 1.0);
    for chapter in 2..=8 {
        f.set_chapter(&id, f64::from(chapter));
    }

    let bookmark = f.manager.get(&id).unwrap();
    assert_eq!(bookmark.chapter, 8.0);
    assert_eq!(bookmark.history.len(), HISTORY_LIMIT);
    let chapters: Vec<f64> = bookmark.history.iter().map(|h| h.state.chapter).collect();
    assert_eq!(chapters, vec![7.0, 6.0, 5.0, 4.0, 3.0]);
    assert!(bookmark.history.iter().all(|h| h.state.history.is_empty()));
}

#[test]
fn test_chapter_gain_credits_weekly_and_daily() {
    let mut f = Fixture::new();
    let id = f.add("Blue Lock", "https://example.com/bl", 10.0);
    f.set_chapter(&id, 13.5);
    f.set_chapter(&id, 12.0);

    assert_eq!(f.tracking.weekly.current().chapters_read, 3);
    assert_eq!(f.tracking.daily.current().chapters_read, 3);
}

#[test]
fn test_update_chapter_clamps_and_rejects_nan() {
    let mut f = Fixture::new();
    let id = f.add("Vinland Saga", "https://example.com/vs", 4.0);
    f.set_chapter(&id, -3.0);
    assert_eq!(f.manager.get(&id).unwrap().chapter, 0.0);

    let err = f
        .manager
        .update_chapter(&id, f64::NAN, &f.statuses, &mut f.tracking)
        .unwrap_err();
    assert!(matches!(err, BookmarkError::InvalidField { field: "chapter", .. }));
}

#[test]
fn test_revert_restores_snapshot_and_records_pre_revert_state() {
    let mut f = Fixture::new();
    let id = f.add("Berserk", "https://example.com/berserk", 1.0);
    f.set_chapter(&id, 2.0);
    f.set_chapter(&id, 3.0);

    let target = f.manager.get(&id).unwrap().history[1].clone();
    assert_eq!(target.state.chapter, 1.0);

    f.clock.advance(Duration::minutes(1));
    f.manager
        .revert(&id, target.date, &f.statuses, &[], &mut f.tracking)
        .unwrap();

    let reverted = f.manager.get(&id).unwrap();
    assert_eq!(reverted.id, id);
    assert_eq!(reverted.chapter, 1.0);
    let chapters: Vec<f64> = reverted.history.iter().map(|h| h.state.chapter).collect();
    assert_eq!(chapters, vec![3.0, 2.0]);
}

#[test]
fn test_revert_then_reedit_does_not_duplicate_target() {
    let mut f = Fixture::new();
    let id = f.add("Berserk", "https://example.com/berserk", 1.0);
    f.set_chapter(&id, 2.0);
    f.set_chapter(&id, 3.0);
    let target = f.manager.get(&id).unwrap().history[1].clone();

    f.clock.advance(Duration::minutes(1));
    f.manager
        .revert(&id, target.date, &f.statuses, &[], &mut f.tracking)
        .unwrap();
    f.set_chapter(&id, 3.0);

    let bookmark = f.manager.get(&id).unwrap();
    let ones = bookmark
        .history
        .iter()
        .filter(|h| h.state.chapter == 1.0)
        .count();
    assert_eq!(ones, 1);
    assert!(bookmark.history.iter().all(|h| h.date != target.date));
}

#[test]
fn test_revert_unknown_entry_fails() {
    let mut f = Fixture::new();
    let id = f.add("Berserk", "https://example.com/berserk", 1.0);
    let err = f
        .manager
        .revert(&id, local_noon(2000, 1, 1), &f.statuses, &[], &mut f.tracking)
        .unwrap_err();
    assert!(matches!(err, BookmarkError::HistoryEntryNotFound(_)));
}

#[test]
fn test_delete_and_undo() {
    let mut f = Fixture::new();
    let a = f.add("A", "https://example.com/a", 1.0);
    let b = f.add("B", "https://example.com/b", 1.0);

    let removed = f
        .manager
        .delete(&[a.clone(), "missing".to_string()], &mut f.tracking)
        .unwrap();
    assert_eq!(removed, 1);
    assert!(f.manager.get(&a).is_none());
    assert!(f.manager.can_undo());
    assert_eq!(f.tracking.activity.entries()[0].kind, ActivityType::Delete);

    assert_eq!(
        f.manager.undo_delete(&f.statuses, &[], &mut f.tracking).unwrap(),
        1
    );
    assert!(f.manager.get(&a).is_some());
    assert!(f.manager.get(&b).is_some());
    assert!(matches!(
        f.manager.undo_delete(&f.statuses, &[], &mut f.tracking),
        Err(BookmarkError::NothingToUndo)
    ));
}

#[test]
fn test_undo_refuses_a_batch_whose_status_is_gone() {
    let mut f = Fixture::new();
    let a = f.add("A", "https://example.com/a", 1.0);
    f.manager.delete(&[a.clone()], &mut f.tracking).unwrap();

    let without_reading: Vec<ReadingStatus> = f
        .statuses
        .iter()
        .filter(|s| s.id != "reading")
        .cloned()
        .collect();
    assert!(matches!(
        f.manager.undo_delete(&without_reading, &[], &mut f.tracking),
        Err(BookmarkError::UnknownStatus(status)) if status == "reading"
    ));
    assert!(f.manager.get(&a).is_none());
    assert!(f.manager.can_undo());

    assert_eq!(
        f.manager.undo_delete(&f.statuses, &[], &mut f.tracking).unwrap(),
        1
    );
}

#[test]
fn test_undo_drops_folders_deleted_meanwhile() {
    let mut f = Fixture::new();
    let weekly = Folder {
        id: "f1".to_string(),
        name: "Weekly".to_string(),
    };
    let a = f.add("A", "https://example.com/a", 1.0);
    let b = f.add("B", "https://example.com/b", 1.0);
    f.manager
        .move_to_folder(&[a.clone(), b.clone()], Some(&weekly), &mut f.tracking)
        .unwrap();
    f.manager
        .delete(&[a.clone(), b.clone()], &mut f.tracking)
        .unwrap();

    f.manager.undo_delete(&f.statuses, &[], &mut f.tracking).unwrap();
    assert_eq!(f.manager.get(&a).unwrap().folder_id, None);
    assert_eq!(f.manager.get(&b).unwrap().folder_id, None);
}

#[test]
fn test_revert_refuses_a_snapshot_whose_status_is_gone() {
    let mut f = Fixture::new();
    let id = f.add("A", "https://example.com/a", 1.0);
    f.clock.advance(Duration::minutes(1));
    f.manager
        .update_status(&[id.clone()], "completed", &f.statuses, &mut f.tracking)
        .unwrap();
    let snapshot_date = f.manager.get(&id).unwrap().history[0].date;

    let without_reading: Vec<ReadingStatus> = f
        .statuses
        .iter()
        .filter(|s| s.id != "reading")
        .cloned()
        .collect();
    let err = f
        .manager
        .revert(&id, snapshot_date, &without_reading, &[], &mut f.tracking)
        .unwrap_err();
    assert!(matches!(err, BookmarkError::UnknownStatus(status) if status == "reading"));

    let bookmark = f.manager.get(&id).unwrap();
    assert_eq!(bookmark.status_id, "completed");
    assert_eq!(bookmark.history.len(), 1);
}

#[test]
fn test_revert_drops_a_folder_cleared_since_the_snapshot() {
    let mut f = Fixture::new();
    let mut draft = BookmarkDraft::new("A", "https://example.com/a", 1.0, "reading");
    draft.folder_id = Some("f1".to_string());
    let id = f
        .manager
        .add_or_update(draft, None, &f.statuses, &mut f.tracking)
        .unwrap()
        .id;
    f.set_chapter(&id, 2.0);
    assert_eq!(f.manager.clear_folder("f1").unwrap(), 1);

    let snapshot = f.manager.get(&id).unwrap().history[0].clone();
    assert_eq!(snapshot.state.folder_id.as_deref(), Some("f1"));
    f.manager
        .revert(&id, snapshot.date, &f.statuses, &[], &mut f.tracking)
        .unwrap();

    let bookmark = f.manager.get(&id).unwrap();
    assert_eq!(bookmark.chapter, 1.0);
    assert_eq!(bookmark.folder_id, None);
}

#[test]
fn test_edits_in_the_same_instant_keep_distinct_snapshots() {
    let mut f = Fixture::new();
    let id = f.add("A", "https://example.com/a", 0.0);
    f.manager
        .update_chapter(&id, 1.0, &f.statuses, &mut f.tracking)
        .unwrap();
    f.manager
        .update_chapter(&id, 2.0, &f.statuses, &mut f.tracking)
        .unwrap();
    f.manager
        .update_chapter(&id, 3.0, &f.statuses, &mut f.tracking)
        .unwrap();

    let history = f.manager.get(&id).unwrap().history.clone();
    let chapters: Vec<f64> = history.iter().map(|h| h.state.chapter).collect();
    assert_eq!(chapters, vec![2.0, 1.0, 0.0]);
    assert!(history.windows(2).all(|w| w[0].date > w[1].date));

    f.manager
        .revert(&id, history[1].date, &f.statuses, &[], &mut f.tracking)
        .unwrap();
    let bookmark = f.manager.get(&id).unwrap();
    assert_eq!(bookmark.chapter, 1.0);
    let dates: Vec<_> = bookmark.history.iter().map(|h| h.date).collect();
    assert!(dates.windows(2).all(|w| w[0] > w[1]));
}

#[test]
fn test_toggles_flip_flags() {
    let mut f = Fixture::new();
    let id = f.add("A", "https://example.com/a", 1.0);

    assert!(f.manager.toggle_favorite(&id, &mut f.tracking).unwrap());
    assert!(!f.manager.toggle_favorite(&id, &mut f.tracking).unwrap());
    assert!(f.manager.toggle_pinned(&id, &mut f.tracking).unwrap());
    assert_eq!(f.tracking.activity.entries()[1].kind, ActivityType::Favorite);
    assert!(matches!(
        f.manager.toggle_pinned("missing", &mut f.tracking),
        Err(BookmarkError::NotFound(_))
    ));
}

#[test]
fn test_update_status_skips_unchanged_and_rejects_unknown() {
    let mut f = Fixture::new();
    let a = f.add("A", "https://example.com/a", 1.0);
    let b = f.add("B", "https://example.com/b", 1.0);
    f.manager
        .update_status(&[a.clone()], "completed", &f.statuses, &mut f.tracking)
        .unwrap();

    let changed = f
        .manager
        .update_status(&[a.clone(), b.clone()], "completed", &f.statuses, &mut f.tracking)
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(f.manager.count_with_status("completed"), 2);
    assert_eq!(f.manager.get(&b).unwrap().history.len(), 1);

    assert!(matches!(
        f.manager.update_status(&[a], "nope", &f.statuses, &mut f.tracking),
        Err(BookmarkError::UnknownStatus(_))
    ));
}

#[test]
fn test_move_to_folder_and_back() {
    let mut f = Fixture::new();
    let id = f.add("A", "https://example.com/a", 1.0);
    let folder = Folder {
        id: "f1".to_string(),
        name: "Weekly".to_string(),
    };

    let moved = f
        .manager
        .move_to_folder(&[id.clone()], Some(&folder), &mut f.tracking)
        .unwrap();
    assert_eq!(moved, 1);
    assert_eq!(f.manager.get(&id).unwrap().folder_id.as_deref(), Some("f1"));
    assert_eq!(f.tracking.activity.entries()[0].description, "Moved 'A' to Weekly");

    f.manager
        .move_to_folder(&[id.clone()], None, &mut f.tracking)
        .unwrap();
    assert_eq!(f.manager.get(&id).unwrap().folder_id, None);
    assert_eq!(f.manager.clear_folder("f1").unwrap(), 0);
}

#[test]
fn test_reorder_subset_keeps_other_slots() {
    let mut f = Fixture::new();
    let a = f.add("A", "https://example.com/a", 1.0);
    let b = f.add("B", "https://example.com/b", 1.0);
    let c = f.add("C", "https://example.com/c", 1.0);

    f.manager.reorder(&[a.clone(), c.clone()]).unwrap();

    let mut list: Vec<_> = f.manager.bookmarks().iter().collect();
    bookmark_view::sort(&mut list, SortOrder::Manual);
    let order: Vec<&str> = list.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(order, vec![a.as_str(), b.as_str(), c.as_str()]);
    let ranks: Vec<i64> = list.iter().map(|b| b.manual_order).collect();
    assert_eq!(ranks, vec![0, 1, 2]);

    assert!(matches!(
        f.manager.reorder(&["missing".to_string()]),
        Err(BookmarkError::NotFound(_))
    ));
}

#[test]
fn test_dismiss_reminder() {
    let mut f = Fixture::new();
    let mut draft = BookmarkDraft::new("A", "https://example.com/a", 1.0, "reading");
    draft.reminder_date = Some(local_noon(2024, 3, 5));
    let id = f
        .manager
        .add_or_update(draft, None, &f.statuses, &mut f.tracking)
        .unwrap()
        .id;

    let now = f.clock.now();
    assert_eq!(bookmark_view::due_reminders(f.manager.bookmarks(), now).len(), 1);
    f.manager.dismiss_reminder(&id).unwrap();
    assert!(bookmark_view::due_reminders(f.manager.bookmarks(), now).is_empty());
}

#[rstest]
#[case::empty_title(BookmarkDraft::new("  ", "https://example.com", 1.0, "reading"), "title")]
#[case::empty_url(BookmarkDraft::new("A", "", 1.0, "reading"), "url")]
#[case::negative_chapter(BookmarkDraft::new("A", "https://example.com", -1.0, "reading"), "chapter")]
#[case::rating(
    BookmarkDraft { rating: 6, ..BookmarkDraft::new("A", "https://example.com", 1.0, "reading") },
    "rating"
)]
fn test_invalid_drafts_are_rejected(#[case] draft: BookmarkDraft, #[case] expected: &str) {
    let mut f = Fixture::new();
    let err = f
        .manager
        .add_or_update(draft, None, &f.statuses, &mut f.tracking)
        .unwrap_err();
    match err {
        BookmarkError::InvalidField { field, .. } => assert_eq!(field, expected),
        other => panic!("unexpected error: {other}"),
    }
    assert!(f.manager.bookmarks().is_empty());
}

#[test]
fn test_unknown_status_is_rejected() {
    let mut f = Fixture::new();
    let err = f
        .manager
        .add_or_update(
            BookmarkDraft::new("A", "https://example.com", 1.0, "ghost"),
            None,
            &f.statuses,
            &mut f.tracking,
        )
        .unwrap_err();
    assert!(matches!(err, BookmarkError::UnknownStatus(_)));
}
