//! MangaMarks: a local-first manga/manhwa bookmark tracker.
//!
//! The library owns the persisted state (bookmarks, reading statuses,
//! folders, sort presets, the activity log, reading summaries and the
//! streak), the PIN lock and backups. A front-end drives it through the
//! [`app::MangaMarks`] facade or the JSON-RPC binary.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod storage;
pub mod types;
