// MangaMarks services
// Services provide stateless or self-contained functionality: time, crypto,
// the PIN lock and its idle timer, backups, metadata extraction, settings.

pub mod auth_lock;
pub mod backup_service;
pub mod clock;
pub mod crypto_service;
pub mod idle_timer;
pub mod metadata_extractor;
pub mod settings_engine;
