use serde::{Deserialize, Serialize};

/// A user-defined reading status ("Reading", "Completed", ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingStatus {
    pub id: String,
    pub label: String,
    /// Hex color, e.g. `#3b82f6`.
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ReadingStatus {
    fn seeded(id: &str, label: &str, color: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            color: color.to_string(),
            icon: Some(icon.to_string()),
        }
    }

    /// The statuses seeded on first run.
    pub fn defaults() -> Vec<ReadingStatus> {
        vec![
            Self::seeded("reading", "Reading", "#3b82f6", "📖"),
            Self::seeded("completed", "Completed", "#22c55e", "✅"),
            Self::seeded("on-hold", "On Hold", "#f59e0b", "⏸"),
            Self::seeded("dropped", "Dropped", "#ef4444", "🗑"),
            Self::seeded("plan-to-read", "Plan to Read", "#a855f7", "🗓"),
        ]
    }
}
