// MangaMarks platform paths for Linux
// Config: ~/.config/mangamarks
// Data:   ~/.local/share/mangamarks

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Uses `$XDG_CONFIG_HOME/mangamarks` if set, otherwise `~/.config/mangamarks`.
pub fn get_config_dir() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("mangamarks"),
        _ => home_dir().join(".config").join("mangamarks"),
    }
}

/// Uses `$XDG_DATA_HOME/mangamarks` if set, otherwise `~/.local/share/mangamarks`.
pub fn get_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("mangamarks"),
        _ => home_dir().join(".local").join("share").join("mangamarks"),
    }
}
