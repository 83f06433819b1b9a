//! Derived, read-only views over the bookmark collection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::bookmark::Bookmark;
use crate::types::preset::{SortOrder, ViewSettings};
use crate::types::status::ReadingStatus;
use crate::types::summary::{DailySummary, WeeklySummary};

/// How many entries the dashboard lists in its "recent" and "favorites" panels.
pub const DASHBOARD_LIST_LEN: usize = 5;

/// Whether `bookmark` passes every active filter of `settings`.
pub fn matches(bookmark: &Bookmark, settings: &ViewSettings) -> bool {
    let term = settings.search_term.trim().to_lowercase();
    if !term.is_empty() {
        let in_title = bookmark.title.to_lowercase().contains(&term);
        let in_alias = bookmark
            .alias
            .as_deref()
            .is_some_and(|a| a.to_lowercase().contains(&term));
        if !in_title && !in_alias {
            return false;
        }
    }
    if !settings
        .selected_tags
        .iter()
        .all(|tag| bookmark.tags.iter().any(|t| t == tag))
    {
        return false;
    }
    if settings.show_favorites && !bookmark.is_favorite {
        return false;
    }
    if let Some(status) = settings.status_filter.as_deref() {
        if bookmark.status_id != status {
            return false;
        }
    }
    if let Some(min) = settings.rating_filter {
        if bookmark.rating < min {
            return false;
        }
    }
    true
}

fn compare(a: &Bookmark, b: &Bookmark, order: SortOrder) -> Ordering {
    match order {
        SortOrder::LastUpdatedDesc => b.last_updated.cmp(&a.last_updated),
        SortOrder::LastUpdatedAsc => a.last_updated.cmp(&b.last_updated),
        SortOrder::TitleAsc => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortOrder::TitleDesc => b.title.to_lowercase().cmp(&a.title.to_lowercase()),
        SortOrder::ChapterDesc => b.chapter.total_cmp(&a.chapter),
        SortOrder::ChapterAsc => a.chapter.total_cmp(&b.chapter),
        SortOrder::RatingDesc => b.rating.cmp(&a.rating),
        SortOrder::RatingAsc => a.rating.cmp(&b.rating),
        SortOrder::Manual => a.manual_order.cmp(&b.manual_order),
    }
}

/// Sorts in place. Outside manual mode pinned entries come first, then
/// favorites, then the chosen comparator.
pub fn sort(bookmarks: &mut [&Bookmark], order: SortOrder) {
    if order == SortOrder::Manual {
        bookmarks.sort_by(|a, b| compare(a, b, order));
        return;
    }
    bookmarks.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then(b.is_favorite.cmp(&a.is_favorite))
            .then_with(|| compare(a, b, order))
    });
}

/// The filtered and sorted list shown for `settings`.
pub fn visible<'a>(bookmarks: &'a [Bookmark], settings: &ViewSettings) -> Vec<&'a Bookmark> {
    let mut list: Vec<&Bookmark> = bookmarks.iter().filter(|b| matches(b, settings)).collect();
    sort(&mut list, settings.sort_order);
    list
}

/// Every tag in use, sorted and without duplicates.
pub fn all_tags(bookmarks: &[Bookmark]) -> Vec<String> {
    bookmarks
        .iter()
        .flat_map(|b| b.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Bookmarks whose reminder is due at `now`, earliest first.
pub fn due_reminders(bookmarks: &[Bookmark], now: DateTime<Utc>) -> Vec<&Bookmark> {
    let mut due: Vec<&Bookmark> = bookmarks
        .iter()
        .filter(|b| b.reminder_date.is_some_and(|at| at <= now))
        .collect();
    due.sort_by_key(|b| b.reminder_date);
    due
}

/// Count of bookmarks for one status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status_id: String,
    pub label: String,
    pub count: usize,
}

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_bookmarks: usize,
    pub favorites: usize,
    pub unique_tags: usize,
    pub by_status: Vec<StatusCount>,
    pub recently_updated: Vec<Bookmark>,
    pub favorite_bookmarks: Vec<Bookmark>,
    pub reading_streak: u32,
    pub weekly: WeeklySummary,
    pub daily: DailySummary,
}

pub fn dashboard(
    bookmarks: &[Bookmark],
    statuses: &[ReadingStatus],
    reading_streak: u32,
    weekly: WeeklySummary,
    daily: DailySummary,
) -> DashboardStats {
    let mut per_status: BTreeMap<&str, usize> = BTreeMap::new();
    for bookmark in bookmarks {
        *per_status.entry(bookmark.status_id.as_str()).or_default() += 1;
    }
    let by_status = statuses
        .iter()
        .map(|s| StatusCount {
            status_id: s.id.clone(),
            label: s.label.clone(),
            count: per_status.get(s.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    let mut recent: Vec<&Bookmark> = bookmarks.iter().collect();
    recent.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));

    DashboardStats {
        total_bookmarks: bookmarks.len(),
        favorites: bookmarks.iter().filter(|b| b.is_favorite).count(),
        unique_tags: all_tags(bookmarks).len(),
        by_status,
        recently_updated: recent.iter().take(DASHBOARD_LIST_LEN).map(|b| b.snapshot()).collect(),
        favorite_bookmarks: recent
            .iter()
            .filter(|b| b.is_favorite)
            .take(DASHBOARD_LIST_LEN)
            .map(|b| b.snapshot())
            .collect(),
        reading_streak,
        weekly,
        daily,
    }
}
