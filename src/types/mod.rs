// MangaMarks shared type definitions
// Each submodule defines types used across the application.

pub mod activity;
pub mod auth;
pub mod backup;
pub mod bookmark;
pub mod errors;
pub mod preset;
pub mod settings;
pub mod status;
pub mod summary;
