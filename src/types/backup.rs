use serde::{Deserialize, Serialize};

use super::activity::ActivityLogEntry;
use super::bookmark::{Bookmark, Folder};
use super::preset::SortPreset;
use super::status::ReadingStatus;

/// The user-facing export/import document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    pub bookmarks: Vec<Bookmark>,
    pub reading_statuses: Vec<ReadingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_presets: Option<Vec<SortPreset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folders: Option<Vec<Folder>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_log: Option<Vec<ActivityLogEntry>>,
}

/// Counts of what an import replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub bookmarks: usize,
    pub reading_statuses: usize,
    pub sort_presets: Option<usize>,
    pub folders: Option<usize>,
    pub activity_log: Option<usize>,
}
