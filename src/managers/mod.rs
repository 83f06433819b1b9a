// MangaMarks state managers
// Managers own one persisted slice of state each: bookmarks, statuses,
// folders, presets, the activity log, summaries and the reading streak.

pub mod activity_log;
pub mod bookmark_manager;
pub mod bookmark_view;
pub mod folder_manager;
pub mod preset_manager;
pub mod status_manager;
pub mod streak_tracker;
pub mod summary_tracker;
pub mod tracking;
