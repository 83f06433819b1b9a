//! Persisted key names. Every key lives under [`NAMESPACE`], which is what
//! an app reset erases.

pub const NAMESPACE: &str = "mangamarks-";

pub const BOOKMARKS: &str = "mangamarks-bookmarks";
pub const READING_STATUSES: &str = "mangamarks-reading-statuses";
pub const FOLDERS: &str = "mangamarks-folders";
pub const SORT_PRESETS: &str = "mangamarks-sort-presets";
pub const ACTIVITY_LOG: &str = "mangamarks-activity-log";
pub const WEEKLY_SUMMARY: &str = "mangamarks-weekly-summary";
pub const DAILY_SUMMARY: &str = "mangamarks-daily-summary";
pub const STREAK_COUNT: &str = "mangamarks-streak-count";
pub const STREAK_LAST_UPDATE: &str = "mangamarks-streak-last-update";
pub const AUTH_PIN_HASH: &str = "mangamarks-auth-pin";
pub const AUTH_LOCK_ENABLED: &str = "mangamarks-auth-lock-enabled";
pub const AUTOBACKUP: &str = "mangamarks-autobackup";
pub const AUTOBACKUP_TIMESTAMP: &str = "mangamarks-autobackup-timestamp";
