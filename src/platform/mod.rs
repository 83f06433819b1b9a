// MangaMarks platform paths
// Resolves where settings and the database live on Windows, macOS and Linux.
//
// `MANGAMARKS_DATA_DIR` overrides the data directory on every platform.

use std::env;
use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Environment variable that overrides [`get_data_dir`].
pub const DATA_DIR_ENV: &str = "MANGAMARKS_DATA_DIR";

/// Returns the directory holding `settings.json`.
///
/// - **Linux**: `$XDG_CONFIG_HOME/mangamarks` or `~/.config/mangamarks`
/// - **macOS**: `~/Library/Preferences/MangaMarks`
/// - **Windows**: `%APPDATA%/MangaMarks`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the directory holding the database.
///
/// - **Linux**: `$XDG_DATA_HOME/mangamarks` or `~/.local/share/mangamarks`
/// - **macOS**: `~/Library/Application Support/MangaMarks`
/// - **Windows**: `%LOCALAPPDATA%/MangaMarks`
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
