use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of activity entries kept.
pub const ACTIVITY_LOG_LIMIT: usize = 200;

/// Kind of user action recorded in the activity log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityType {
    Create,
    Update,
    Delete,
    Favorite,
    Status,
    Move,
}

/// One immutable audit-trail record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_title: Option<String>,
}
