//! Bookmark collection store.
//!
//! Implements `BookmarkManagerTrait`: creation with same-series merging,
//! edits that keep a bounded history of prior states, revert, batch delete
//! with a single-level undo, flags, status and folder moves, and the
//! global manual ordering. Every mutation writes the whole collection
//! through its binding and then feeds the activity log, summaries and
//! streak held in [`Tracking`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::tracking::Tracking;
use crate::services::clock::Clock;
use crate::storage::{keys, Binding, LocalStorage};
use crate::types::activity::ActivityType;
use crate::types::bookmark::{
    next_history_date, Bookmark, BookmarkDraft, BookmarkHistory, Folder, SaveKind, SaveOutcome,
    HISTORY_LIMIT,
};
use crate::types::errors::BookmarkError;
use crate::types::status::ReadingStatus;

/// Highest allowed rating.
pub const MAX_RATING: u8 = 5;

static CHAPTER_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\b(?:chapter|ch\.?)\s*\d+(?:\.\d+)?\s*$")
        .expect("CHAPTER_SUFFIX should compile - this is a bug")
});

/// Title with a trailing "Chapter N" suffix removed, lowercased and trimmed.
pub fn normalize_title(title: &str) -> String {
    CHAPTER_SUFFIX.replace(title.trim(), "").trim().to_lowercase()
}

/// Trait defining bookmark management operations.
pub trait BookmarkManagerTrait {
    /// Creates a bookmark (`id == None`) or edits an existing one.
    ///
    /// A create whose url and normalized title match an existing bookmark
    /// replaces that bookmark in place instead of adding a duplicate.
    ///
    /// # Errors
    /// - [`BookmarkError::InvalidField`] / [`BookmarkError::UnknownStatus`] for a bad draft
    /// - [`BookmarkError::NotFound`] when editing an unknown id
    fn add_or_update(
        &mut self,
        draft: BookmarkDraft,
        id: Option<&str>,
        statuses: &[ReadingStatus],
        tracking: &mut Tracking,
    ) -> Result<SaveOutcome, BookmarkError>;

    /// Sets the chapter of one bookmark, clamped at zero.
    fn update_chapter(
        &mut self,
        id: &str,
        chapter: f64,
        statuses: &[ReadingStatus],
        tracking: &mut Tracking,
    ) -> Result<(), BookmarkError>;

    /// Restores the snapshot taken at `history_date`.
    ///
    /// A snapshot folder that no longer exists is dropped.
    ///
    /// # Errors
    /// - [`BookmarkError::HistoryEntryNotFound`] when no entry has that date
    /// - [`BookmarkError::UnknownStatus`] when the snapshot's status was deleted
    fn revert(
        &mut self,
        id: &str,
        history_date: DateTime<Utc>,
        statuses: &[ReadingStatus],
        folders: &[Folder],
        tracking: &mut Tracking,
    ) -> Result<(), BookmarkError>;

    /// Removes the given bookmarks. Unknown ids are ignored. Returns how many
    /// were removed; the removed batch becomes available to `undo_delete`.
    fn delete(&mut self, ids: &[String], tracking: &mut Tracking) -> Result<usize, BookmarkError>;

    /// Re-inserts the most recently deleted batch. Folders deleted in the
    /// meantime are dropped from the restored bookmarks.
    ///
    /// # Errors
    /// - [`BookmarkError::NothingToUndo`] when no batch is waiting
    /// - [`BookmarkError::UnknownStatus`] when a status of the batch was
    ///   deleted; nothing is restored and the batch stays available
    fn undo_delete(
        &mut self,
        statuses: &[ReadingStatus],
        folders: &[Folder],
        tracking: &mut Tracking,
    ) -> Result<usize, BookmarkError>;

    /// Flips the favorite flag. Returns the new value.
    fn toggle_favorite(&mut self, id: &str, tracking: &mut Tracking) -> Result<bool, BookmarkError>;

    /// Flips the pinned flag. Returns the new value.
    fn toggle_pinned(&mut self, id: &str, tracking: &mut Tracking) -> Result<bool, BookmarkError>;

    /// Moves bookmarks to `status_id`. Returns how many changed.
    fn update_status(
        &mut self,
        ids: &[String],
        status_id: &str,
        statuses: &[ReadingStatus],
        tracking: &mut Tracking,
    ) -> Result<usize, BookmarkError>;

    /// Assigns bookmarks to `folder`, or to no folder. Returns how many matched.
    fn move_to_folder(
        &mut self,
        ids: &[String],
        folder: Option<&Folder>,
        tracking: &mut Tracking,
    ) -> Result<usize, BookmarkError>;

    /// Rewrites `manual_order` so `ordered_ids` appear in that order.
    fn reorder(&mut self, ordered_ids: &[String]) -> Result<(), BookmarkError>;

    fn dismiss_reminder(&mut self, id: &str) -> Result<(), BookmarkError>;
}

/// Bookmark store bound to the bookmarks key of one tab.
pub struct BookmarkManager {
    bookmarks: Binding<Vec<Bookmark>>,
    clock: Arc<dyn Clock>,
    last_deleted: Vec<Bookmark>,
}

impl BookmarkManager {
    pub fn new(storage: &LocalStorage, clock: Arc<dyn Clock>) -> Self {
        Self {
            bookmarks: Binding::bind(storage, keys::BOOKMARKS, Vec::new()),
            clock,
            last_deleted: Vec::new(),
        }
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.bookmarks.get()
    }

    pub fn get(&self, id: &str) -> Option<&Bookmark> {
        self.bookmarks().iter().find(|b| b.id == id)
    }

    /// Number of bookmarks whose status is `status_id`.
    pub fn count_with_status(&self, status_id: &str) -> usize {
        self.bookmarks()
            .iter()
            .filter(|b| b.status_id == status_id)
            .count()
    }

    /// Whether a deleted batch is waiting for `undo_delete`.
    pub fn can_undo(&self) -> bool {
        !self.last_deleted.is_empty()
    }

    /// Clears `folder_id` on every bookmark in `folder_id`. Returns how many changed.
    pub fn clear_folder(&mut self, folder_id: &str) -> Result<usize, BookmarkError> {
        let mut list = self.bookmarks().to_vec();
        let mut changed = 0;
        for bookmark in list.iter_mut() {
            if bookmark.folder_id.as_deref() == Some(folder_id) {
                bookmark.folder_id = None;
                changed += 1;
            }
        }
        if changed > 0 {
            self.bookmarks.set(list)?;
        }
        Ok(changed)
    }

    /// Replaces the collection wholesale (import and rollback).
    pub fn replace_all(&mut self, bookmarks: Vec<Bookmark>) -> Result<(), BookmarkError> {
        self.bookmarks.set(bookmarks)?;
        self.last_deleted.clear();
        Ok(())
    }

    pub fn sync(&mut self) -> bool {
        self.bookmarks.sync()
    }

    pub fn reload(&mut self) {
        self.bookmarks.reload();
        self.last_deleted.clear();
    }

    fn position(&self, id: &str) -> Result<usize, BookmarkError> {
        self.bookmarks()
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| BookmarkError::NotFound(id.to_string()))
    }

    /// Index of the first bookmark with the draft's url, if its title is the same series.
    fn find_same_series(&self, draft: &BookmarkDraft) -> Option<usize> {
        let url = draft.url.trim();
        let index = self.bookmarks().iter().position(|b| b.url.trim() == url)?;
        let existing = &self.bookmarks()[index];
        (normalize_title(&existing.title) == normalize_title(&draft.title)).then_some(index)
    }

    fn create(
        &mut self,
        draft: BookmarkDraft,
        now: DateTime<Utc>,
        tracking: &mut Tracking,
    ) -> Result<SaveOutcome, BookmarkError> {
        let manual_order = self
            .bookmarks()
            .iter()
            .map(|b| b.manual_order)
            .min()
            .map_or(0, |min| min - 1);
        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            alias: draft.alias,
            url: draft.url,
            chapter: draft.chapter,
            total_chapters: draft.total_chapters,
            tags: draft.tags,
            notes: draft.notes,
            cover_image: draft.cover_image,
            color: draft.color,
            rating: draft.rating,
            reminder_date: draft.reminder_date,
            status_id: draft.status_id,
            folder_id: draft.folder_id,
            manual_order,
            is_favorite: false,
            is_pinned: false,
            last_updated: now,
            history: Vec::new(),
        };
        let id = bookmark.id.clone();
        let name = bookmark.display_name().to_string();

        let mut list = Vec::with_capacity(self.bookmarks().len() + 1);
        list.push(bookmark);
        list.extend(self.bookmarks().iter().cloned());
        self.bookmarks.set(list)?;

        info!(%id, "bookmark created");
        tracking.activity.append(
            ActivityType::Create,
            format!("Added '{}'", name),
            Some(&id),
            Some(&name),
        )?;
        tracking.weekly.add_series_update(&id)?;
        tracking.streak.update()?;
        Ok(SaveOutcome {
            id,
            kind: SaveKind::Created,
        })
    }

    /// Applies `draft` over the bookmark at `index`, recording history and side effects.
    fn revise(
        &mut self,
        index: usize,
        draft: &BookmarkDraft,
        kind: SaveKind,
        statuses: &[ReadingStatus],
        now: DateTime<Utc>,
        tracking: &mut Tracking,
    ) -> Result<SaveOutcome, BookmarkError> {
        let mut list = self.bookmarks().to_vec();
        let bookmark = &mut list[index];
        let old_chapter = bookmark.chapter;
        let old_status = bookmark.status_id.clone();

        bookmark.push_history(now);
        bookmark.apply_draft(draft);
        bookmark.last_updated = now;

        let id = bookmark.id.clone();
        let name = bookmark.display_name().to_string();
        let description = match kind {
            SaveKind::Merged => format!(
                "New chapter of '{}': {}",
                name,
                format_chapter(bookmark.chapter)
            ),
            _ => describe_edit(
                &name,
                old_chapter,
                bookmark.chapter,
                &old_status,
                &bookmark.status_id,
                statuses,
            ),
        };
        let credited = chapters_gained(old_chapter, bookmark.chapter);
        self.bookmarks.set(list)?;

        debug!(%id, ?kind, credited, "bookmark revised");
        let activity = match kind {
            SaveKind::Merged => ActivityType::Create,
            _ => ActivityType::Update,
        };
        tracking
            .activity
            .append(activity, description, Some(&id), Some(&name))?;
        tracking.credit_chapters(credited)?;
        tracking.weekly.add_series_update(&id)?;
        tracking.streak.update()?;
        Ok(SaveOutcome { id, kind })
    }

    fn touch(&mut self, id: &str) -> Result<(usize, Vec<Bookmark>), BookmarkError> {
        let index = self.position(id)?;
        let mut list = self.bookmarks().to_vec();
        list[index].last_updated = self.clock.now();
        Ok((index, list))
    }
}

impl BookmarkManagerTrait for BookmarkManager {
    fn add_or_update(
        &mut self,
        draft: BookmarkDraft,
        id: Option<&str>,
        statuses: &[ReadingStatus],
        tracking: &mut Tracking,
    ) -> Result<SaveOutcome, BookmarkError> {
        validate_draft(&draft, statuses)?;
        let now = self.clock.now();

        match id {
            Some(id) => {
                let index = self.position(id)?;
                self.revise(index, &draft, SaveKind::Updated, statuses, now, tracking)
            }
            None => match self.find_same_series(&draft) {
                Some(index) => {
                    info!(id = %self.bookmarks()[index].id, "merging same-series bookmark");
                    self.revise(index, &draft, SaveKind::Merged, statuses, now, tracking)
                }
                None => self.create(draft, now, tracking),
            },
        }
    }

    fn update_chapter(
        &mut self,
        id: &str,
        chapter: f64,
        statuses: &[ReadingStatus],
        tracking: &mut Tracking,
    ) -> Result<(), BookmarkError> {
        if !chapter.is_finite() {
            return Err(BookmarkError::InvalidField {
                field: "chapter",
                reason: "must be a finite number".to_string(),
            });
        }
        let existing = self.get(id).ok_or_else(|| BookmarkError::NotFound(id.to_string()))?;
        let mut draft = BookmarkDraft::from_bookmark(existing);
        draft.chapter = chapter.max(0.0);
        self.add_or_update(draft, Some(id), statuses, tracking)?;
        Ok(())
    }

    fn revert(
        &mut self,
        id: &str,
        history_date: DateTime<Utc>,
        statuses: &[ReadingStatus],
        folders: &[Folder],
        tracking: &mut Tracking,
    ) -> Result<(), BookmarkError> {
        let index = self.position(id)?;
        let now = self.clock.now();
        let mut list = self.bookmarks().to_vec();
        let current = &list[index];

        let entry_index = current
            .history
            .iter()
            .position(|h| h.date == history_date)
            .ok_or_else(|| BookmarkError::HistoryEntryNotFound(id.to_string()))?;

        let mut history = current.history.clone();
        let chosen = history.remove(entry_index);
        if status_label(statuses, &chosen.state.status_id).is_none() {
            return Err(BookmarkError::UnknownStatus(chosen.state.status_id.clone()));
        }
        let date = next_history_date(&history, now);
        history.insert(
            0,
            BookmarkHistory {
                state: Box::new(current.snapshot()),
                date,
            },
        );
        history.truncate(HISTORY_LIMIT);

        let mut reverted = *chosen.state;
        drop_missing_folder(&mut reverted, folders);
        reverted.id = current.id.clone();
        reverted.last_updated = now;
        reverted.history = history;

        let name = reverted.display_name().to_string();
        let chapter = reverted.chapter;
        list[index] = reverted;
        self.bookmarks.set(list)?;

        info!(%id, "bookmark reverted");
        tracking.activity.append(
            ActivityType::Update,
            format!("Reverted '{}' to chapter {}", name, format_chapter(chapter)),
            Some(id),
            Some(&name),
        )?;
        Ok(())
    }

    fn delete(&mut self, ids: &[String], tracking: &mut Tracking) -> Result<usize, BookmarkError> {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let (removed, kept): (Vec<Bookmark>, Vec<Bookmark>) = self
            .bookmarks()
            .iter()
            .cloned()
            .partition(|b| targets.contains(b.id.as_str()));
        if removed.is_empty() {
            return Ok(0);
        }

        self.bookmarks.set(kept)?;
        info!(count = removed.len(), "bookmarks deleted");
        for bookmark in &removed {
            let name = bookmark.display_name();
            tracking.activity.append(
                ActivityType::Delete,
                format!("Deleted '{}'", name),
                Some(&bookmark.id),
                Some(name),
            )?;
        }
        let count = removed.len();
        self.last_deleted = removed;
        Ok(count)
    }

    fn undo_delete(
        &mut self,
        statuses: &[ReadingStatus],
        folders: &[Folder],
        tracking: &mut Tracking,
    ) -> Result<usize, BookmarkError> {
        if self.last_deleted.is_empty() {
            return Err(BookmarkError::NothingToUndo);
        }
        if let Some(orphan) = self
            .last_deleted
            .iter()
            .find(|b| status_label(statuses, &b.status_id).is_none())
        {
            warn!(id = %orphan.id, status = %orphan.status_id, "undo refused: status was deleted");
            return Err(BookmarkError::UnknownStatus(orphan.status_id.clone()));
        }
        let present: HashSet<String> = self.bookmarks().iter().map(|b| b.id.clone()).collect();
        let restored: Vec<Bookmark> = self
            .last_deleted
            .iter()
            .filter(|b| !present.contains(&b.id))
            .cloned()
            .map(|mut b| {
                drop_missing_folder(&mut b, folders);
                b
            })
            .collect();

        let mut list = self.bookmarks().to_vec();
        list.extend(restored.iter().cloned());
        list.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        self.bookmarks.set(list)?;
        self.last_deleted.clear();

        info!(count = restored.len(), "deleted bookmarks restored");
        for bookmark in &restored {
            let name = bookmark.display_name();
            tracking.activity.append(
                ActivityType::Create,
                format!("Restored '{}'", name),
                Some(&bookmark.id),
                Some(name),
            )?;
        }
        Ok(restored.len())
    }

    fn toggle_favorite(&mut self, id: &str, tracking: &mut Tracking) -> Result<bool, BookmarkError> {
        let (index, mut list) = self.touch(id)?;
        list[index].is_favorite = !list[index].is_favorite;
        let favorite = list[index].is_favorite;
        let name = list[index].display_name().to_string();
        self.bookmarks.set(list)?;

        let description = if favorite {
            format!("Added '{}' to favorites", name)
        } else {
            format!("Removed '{}' from favorites", name)
        };
        tracking
            .activity
            .append(ActivityType::Favorite, description, Some(id), Some(&name))?;
        tracking.weekly.add_series_update(id)?;
        Ok(favorite)
    }

    fn toggle_pinned(&mut self, id: &str, tracking: &mut Tracking) -> Result<bool, BookmarkError> {
        let (index, mut list) = self.touch(id)?;
        list[index].is_pinned = !list[index].is_pinned;
        let pinned = list[index].is_pinned;
        let name = list[index].display_name().to_string();
        self.bookmarks.set(list)?;

        let description = if pinned {
            format!("Pinned '{}'", name)
        } else {
            format!("Unpinned '{}'", name)
        };
        tracking
            .activity
            .append(ActivityType::Update, description, Some(id), Some(&name))?;
        Ok(pinned)
    }

    fn update_status(
        &mut self,
        ids: &[String],
        status_id: &str,
        statuses: &[ReadingStatus],
        tracking: &mut Tracking,
    ) -> Result<usize, BookmarkError> {
        let new_label = status_label(statuses, status_id)
            .ok_or_else(|| BookmarkError::UnknownStatus(status_id.to_string()))?
            .to_string();
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if !self.bookmarks().iter().any(|b| targets.contains(b.id.as_str())) {
            let missing = ids.first().cloned().unwrap_or_default();
            return Err(BookmarkError::NotFound(missing));
        }

        let now = self.clock.now();
        let mut list = self.bookmarks().to_vec();
        let mut changes = Vec::new();
        for bookmark in list.iter_mut() {
            if !targets.contains(bookmark.id.as_str()) || bookmark.status_id == status_id {
                continue;
            }
            let old_label = status_label(statuses, &bookmark.status_id)
                .unwrap_or(&bookmark.status_id)
                .to_string();
            bookmark.push_history(now);
            bookmark.status_id = status_id.to_string();
            bookmark.last_updated = now;
            changes.push((bookmark.id.clone(), bookmark.display_name().to_string(), old_label));
        }
        if changes.is_empty() {
            return Ok(0);
        }
        self.bookmarks.set(list)?;

        for (id, name, old_label) in &changes {
            tracking.activity.append(
                ActivityType::Status,
                format!("Changed status of '{}' from {} to {}", name, old_label, new_label),
                Some(id),
                Some(name),
            )?;
            tracking.weekly.add_series_update(id)?;
        }
        tracking.streak.update()?;
        Ok(changes.len())
    }

    fn move_to_folder(
        &mut self,
        ids: &[String],
        folder: Option<&Folder>,
        tracking: &mut Tracking,
    ) -> Result<usize, BookmarkError> {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let now = self.clock.now();
        let folder_id = folder.map(|f| f.id.clone());
        let destination = folder.map_or("No Folder", |f| f.name.as_str());

        let mut list = self.bookmarks().to_vec();
        let mut moved = Vec::new();
        for bookmark in list.iter_mut().filter(|b| targets.contains(b.id.as_str())) {
            bookmark.folder_id = folder_id.clone();
            bookmark.last_updated = now;
            moved.push((bookmark.id.clone(), bookmark.display_name().to_string()));
        }
        if moved.is_empty() {
            let missing = ids.first().cloned().unwrap_or_default();
            return Err(BookmarkError::NotFound(missing));
        }
        self.bookmarks.set(list)?;

        for (id, name) in &moved {
            tracking.activity.append(
                ActivityType::Move,
                format!("Moved '{}' to {}", name, destination),
                Some(id),
                Some(name),
            )?;
        }
        Ok(moved.len())
    }

    fn reorder(&mut self, ordered_ids: &[String]) -> Result<(), BookmarkError> {
        let mut list = self.bookmarks().to_vec();

        let mut seen = HashSet::new();
        let mut visible = Vec::new();
        for id in ordered_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let index = list
                .iter()
                .position(|b| &b.id == id)
                .ok_or_else(|| BookmarkError::NotFound(id.clone()))?;
            visible.push(index);
        }

        // Global ranking: rank -> index into `list`.
        let mut ranking: Vec<usize> = (0..list.len()).collect();
        ranking.sort_by_key(|&i| (list[i].manual_order, i));

        let slots: Vec<usize> = ranking
            .iter()
            .enumerate()
            .filter(|&(_, &i)| seen.contains(list[i].id.as_str()))
            .map(|(rank, _)| rank)
            .collect();
        for (slot, index) in slots.into_iter().zip(visible) {
            ranking[slot] = index;
        }
        for (rank, index) in ranking.into_iter().enumerate() {
            list[index].manual_order = rank as i64;
        }

        self.bookmarks.set(list)?;
        debug!(count = seen.len(), "manual order rewritten");
        Ok(())
    }

    fn dismiss_reminder(&mut self, id: &str) -> Result<(), BookmarkError> {
        let (index, mut list) = self.touch(id)?;
        list[index].reminder_date = None;
        self.bookmarks.set(list)?;
        Ok(())
    }
}

/// Checks the user-editable fields of a draft.
pub fn validate_draft(draft: &BookmarkDraft, statuses: &[ReadingStatus]) -> Result<(), BookmarkError> {
    if draft.title.trim().is_empty() {
        return Err(invalid("title", "cannot be empty"));
    }
    if draft.url.trim().is_empty() {
        return Err(invalid("url", "cannot be empty"));
    }
    if !draft.chapter.is_finite() || draft.chapter < 0.0 {
        return Err(invalid("chapter", "must be a non-negative number"));
    }
    if let Some(total) = draft.total_chapters {
        if !total.is_finite() || total < 0.0 {
            return Err(invalid("totalChapters", "must be a non-negative number"));
        }
    }
    if draft.rating > MAX_RATING {
        return Err(invalid("rating", "must be between 0 and 5"));
    }
    if !statuses.iter().any(|s| s.id == draft.status_id) {
        return Err(BookmarkError::UnknownStatus(draft.status_id.clone()));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> BookmarkError {
    BookmarkError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

fn drop_missing_folder(bookmark: &mut Bookmark, folders: &[Folder]) {
    if let Some(folder_id) = bookmark.folder_id.as_deref() {
        if !folders.iter().any(|f| f.id == folder_id) {
            bookmark.folder_id = None;
        }
    }
}

fn status_label<'a>(statuses: &'a [ReadingStatus], id: &str) -> Option<&'a str> {
    statuses.iter().find(|s| s.id == id).map(|s| s.label.as_str())
}

/// Whole chapters gained between two readings; decreases count as zero.
pub fn chapters_gained(old: f64, new: f64) -> u32 {
    let delta = new.floor() - old.floor();
    if delta > 0.0 {
        delta as u32
    } else {
        0
    }
}

fn format_chapter(chapter: f64) -> String {
    format!("{}", chapter)
}

fn describe_edit(
    name: &str,
    old_chapter: f64,
    new_chapter: f64,
    old_status: &str,
    new_status: &str,
    statuses: &[ReadingStatus],
) -> String {
    let mut changes = Vec::new();
    if old_chapter != new_chapter {
        changes.push(format!(
            "chapter {} → {}",
            format_chapter(old_chapter),
            format_chapter(new_chapter)
        ));
    }
    if old_status != new_status {
        changes.push(format!(
            "status {} → {}",
            status_label(statuses, old_status).unwrap_or(old_status),
            status_label(statuses, new_status).unwrap_or(new_status)
        ));
    }
    if changes.is_empty() {
        format!("Updated '{}'", name)
    } else {
        format!("Updated '{}': {}", name, changes.join(", "))
    }
}
