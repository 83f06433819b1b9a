// MangaMarks Settings Engine
// Loads, saves, updates and resets tracker settings.
// Settings are stored as a JSON file at the platform-specific config path.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::platform;
use crate::services::auth_lock::MAX_PIN_LENGTH;
use crate::types::errors::SettingsError;
use crate::types::settings::TrackerSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<TrackerSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &TrackerSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: TrackerSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            settings: TrackerSettings::default(),
        }
    }

    /// Creates an engine that starts from `settings` instead of loading.
    pub fn with_settings(path_override: Option<String>, settings: TrackerSettings) -> Self {
        Self {
            settings,
            ..Self::new(path_override)
        }
    }
}

/// Rejects values that parse but make no sense.
pub fn validate(settings: &TrackerSettings) -> Result<(), SettingsError> {
    let security = &settings.security;
    if security.inactivity_timeout_secs == 0 {
        return Err(SettingsError::InvalidValue(
            "security.inactivity_timeout_secs must be positive".to_string(),
        ));
    }
    if security.pin_hash_iterations == 0 {
        return Err(SettingsError::InvalidValue(
            "security.pin_hash_iterations must be positive".to_string(),
        ));
    }
    if security.min_pin_length == 0 || security.min_pin_length > MAX_PIN_LENGTH {
        return Err(SettingsError::InvalidValue(format!(
            "security.min_pin_length must be between 1 and {}",
            MAX_PIN_LENGTH
        )));
    }
    if settings.backup.auto_backup_interval_days == 0 {
        return Err(SettingsError::InvalidValue(
            "backup.auto_backup_interval_days must be positive".to_string(),
        ));
    }
    if settings.storage.database_file.trim().is_empty() {
        return Err(SettingsError::InvalidValue(
            "storage.database_file cannot be empty".to_string(),
        ));
    }
    Ok(())
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<TrackerSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!(path = %self.config_path, "no settings file, using defaults");
            self.settings = TrackerSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: TrackerSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        validate(&settings)?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Updates an individual setting by dot-notation key path and saves.
    ///
    /// # Examples
    /// - `"security.inactivity_timeout_secs"` → updates `settings.security.inactivity_timeout_secs`
    /// - `"metadata.endpoint"` → updates `settings.metadata.endpoint`
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return Err(SettingsError::InvalidKey("Key cannot be empty".to_string())),
        };

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        let mut current = &mut json_value;
        for part in parents {
            current = current.get_mut(*part).ok_or_else(|| {
                SettingsError::InvalidKey(format!("Key '{}' not found in settings", key))
            })?;
        }
        match current {
            serde_json::Value::Object(map) if map.contains_key(*last) => {
                map.insert(last.to_string(), value);
            }
            serde_json::Value::Object(_) => {
                return Err(SettingsError::InvalidKey(format!(
                    "Key '{}' not found in settings",
                    key
                )));
            }
            _ => {
                return Err(SettingsError::InvalidKey(format!(
                    "Cannot navigate to key '{}': intermediate value is not an object",
                    key
                )));
            }
        }

        let new_settings: TrackerSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        validate(&new_settings)?;

        self.settings = new_settings;
        self.save()?;
        info!(key, "setting updated");
        Ok(())
    }

    /// Resets all settings to factory defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = TrackerSettings::default();
        self.save()?;
        Ok(())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
