use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chapters read and series touched during the current week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub chapters_read: u32,
    /// Bookmark ids, each present at most once.
    pub series_updated: Vec<String>,
    pub start_date: DateTime<Utc>,
}

/// Chapters read today.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub chapters_read: u32,
    pub date: DateTime<Utc>,
}
