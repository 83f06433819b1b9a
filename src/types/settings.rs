use serde::{Deserialize, Serialize};

/// Top-level tracker settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrackerSettings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub backup: BackupSettings,
    #[serde(default)]
    pub metadata: MetadataSettings,
}

/// Where persisted state lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// File name of the SQLite database inside the data directory.
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "mangamarks.db".to_string(),
        }
    }
}

/// PIN lock settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecuritySettings {
    pub inactivity_timeout_secs: u64,
    pub pin_hash_iterations: u32,
    pub min_pin_length: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 300,
            pin_hash_iterations: 100_000,
            min_pin_length: 4,
        }
    }
}

/// Automatic local backup settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupSettings {
    pub auto_backup_enabled: bool,
    pub auto_backup_interval_days: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            auto_backup_enabled: true,
            auto_backup_interval_days: 3,
        }
    }
}

/// Remote metadata-extraction service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataSettings {
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 15,
        }
    }
}
