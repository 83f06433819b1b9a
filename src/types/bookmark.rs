use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of prior-state snapshots kept per bookmark.
pub const HISTORY_LIMIT: usize = 5;

/// Date for a new front history entry: `now`, or one millisecond past the
/// newest entry when `now` is not later. Entry dates stay unique, so a date
/// identifies exactly one snapshot.
pub fn next_history_date(history: &[BookmarkHistory], now: DateTime<Utc>) -> DateTime<Utc> {
    match history.first() {
        Some(newest) if newest.date >= now => newest.date + Duration::milliseconds(1),
        _ => now,
    }
}

/// A tracked series: the latest known chapter of one manga/manhwa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub url: String,
    #[serde(default)]
    pub chapter: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chapters: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<DateTime<Utc>>,
    pub status_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub manual_order: i64,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_pinned: bool,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<BookmarkHistory>,
}

impl Bookmark {
    /// Name shown in lists and log lines: the alias when set, else the title.
    pub fn display_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.trim().is_empty() => alias,
            _ => &self.title,
        }
    }

    /// Copy of this bookmark without its own history, used as a snapshot.
    pub fn snapshot(&self) -> Bookmark {
        Bookmark {
            history: Vec::new(),
            ..self.clone()
        }
    }

    /// Pushes the current state onto the front of the history ring.
    pub fn push_history(&mut self, now: DateTime<Utc>) {
        let entry = BookmarkHistory {
            state: Box::new(self.snapshot()),
            date: next_history_date(&self.history, now),
        };
        self.history.insert(0, entry);
        self.history.truncate(HISTORY_LIMIT);
    }

    /// Overwrites the user-editable content with the draft's fields.
    pub fn apply_draft(&mut self, draft: &BookmarkDraft) {
        self.title = draft.title.clone();
        self.alias = draft.alias.clone();
        self.url = draft.url.clone();
        self.chapter = draft.chapter;
        self.total_chapters = draft.total_chapters;
        self.tags = draft.tags.clone();
        self.notes = draft.notes.clone();
        self.cover_image = draft.cover_image.clone();
        self.color = draft.color.clone();
        self.rating = draft.rating;
        self.reminder_date = draft.reminder_date;
        self.status_id = draft.status_id.clone();
        self.folder_id = draft.folder_id.clone();
    }
}

/// A prior state of a bookmark (without its own history) and when it was taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmarkHistory {
    pub state: Box<Bookmark>,
    pub date: DateTime<Utc>,
}

/// User-supplied content for creating or editing a bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkDraft {
    pub title: String,
    pub alias: Option<String>,
    pub url: String,
    pub chapter: f64,
    pub total_chapters: Option<f64>,
    pub tags: Vec<String>,
    pub notes: String,
    pub cover_image: Option<String>,
    pub color: Option<String>,
    pub rating: u8,
    pub reminder_date: Option<DateTime<Utc>>,
    pub status_id: String,
    pub folder_id: Option<String>,
}

impl BookmarkDraft {
    /// Minimal draft with the required fields set.
    pub fn new(title: &str, url: &str, chapter: f64, status_id: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            chapter,
            status_id: status_id.to_string(),
            ..Self::default()
        }
    }

    /// Builds a draft carrying the content of an existing bookmark.
    pub fn from_bookmark(bookmark: &Bookmark) -> Self {
        Self {
            title: bookmark.title.clone(),
            alias: bookmark.alias.clone(),
            url: bookmark.url.clone(),
            chapter: bookmark.chapter,
            total_chapters: bookmark.total_chapters,
            tags: bookmark.tags.clone(),
            notes: bookmark.notes.clone(),
            cover_image: bookmark.cover_image.clone(),
            color: bookmark.color.clone(),
            rating: bookmark.rating,
            reminder_date: bookmark.reminder_date,
            status_id: bookmark.status_id.clone(),
            folder_id: bookmark.folder_id.clone(),
        }
    }
}

/// How `add_or_update` resolved a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveKind {
    /// A new entry was inserted.
    Created,
    /// A same-series entry was replaced in place.
    Merged,
    /// An existing entry was edited by id.
    Updated,
}

/// Result of `add_or_update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOutcome {
    pub id: String,
    pub kind: SaveKind,
}

/// Folder used to group bookmarks manually.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Folder {
    pub id: String,
    pub name: String,
}
