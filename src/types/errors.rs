use thiserror::Error;

// === StorageError ===

/// Errors raised by the key-value storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing database failed.
    #[error("Storage database error: {0}")]
    Database(String),
    /// A value could not be serialized for storage.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

// === CryptoError ===

/// Errors related to cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Failed to derive encryption key from a passphrase.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    /// Encryption operation failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),
    /// Decryption operation failed.
    #[error("Decryption failed: {0}")]
    Decryption(String),
    /// Failed to generate random bytes.
    #[error("Random generation failed: {0}")]
    RandomGeneration(String),
    /// The provided key is invalid.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

// === BookmarkError ===

/// Errors related to bookmark mutations.
#[derive(Debug, Error)]
pub enum BookmarkError {
    /// Bookmark with the given ID was not found.
    #[error("Bookmark not found: {0}")]
    NotFound(String),
    /// A field failed validation.
    #[error("Invalid bookmark field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    /// The referenced reading status does not exist.
    #[error("Unknown reading status: {0}")]
    UnknownStatus(String),
    /// The history entry to revert to is not part of the bookmark's history.
    #[error("History entry not found for bookmark {0}")]
    HistoryEntryNotFound(String),
    /// There is no deleted batch to restore.
    #[error("Nothing to undo")]
    NothingToUndo,
    /// Persisting the change failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === StatusError ===

/// Errors related to reading-status definitions.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Status with the given ID was not found.
    #[error("Reading status not found: {0}")]
    NotFound(String),
    /// The status label is empty.
    #[error("Status label cannot be empty")]
    EmptyLabel,
    /// The status is still referenced by bookmarks and cannot be deleted.
    #[error("Reading status '{label}' is in use by {count} bookmark(s)")]
    InUse { label: String, count: usize },
    /// Persisting the change failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === FolderError ===

/// Errors related to folder management.
#[derive(Debug, Error)]
pub enum FolderError {
    /// Folder with the given ID was not found.
    #[error("Folder not found: {0}")]
    NotFound(String),
    /// The folder name is empty.
    #[error("Folder name cannot be empty")]
    EmptyName,
    /// Persisting the change failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === PresetError ===

/// Errors related to saved sort presets.
#[derive(Debug, Error)]
pub enum PresetError {
    /// Preset with the given ID was not found.
    #[error("Sort preset not found: {0}")]
    NotFound(String),
    /// The preset name is empty.
    #[error("Preset name cannot be empty")]
    EmptyName,
    /// Persisting the change failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === AuthError ===

/// Errors related to the PIN lock.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The PIN does not satisfy the PIN policy.
    #[error("Invalid PIN: {0}")]
    InvalidPin(String),
    /// Hashing the PIN failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// Persisting the change failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === BackupError ===

/// Errors related to backup export and import.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The file is encrypted and no passphrase was supplied.
    #[error("Backup is encrypted: a passphrase is required")]
    PassphraseRequired,
    /// The passphrase did not open the ciphertext.
    #[error("Wrong passphrase or tampered backup")]
    WrongPassphrase,
    /// The encrypted payload is structurally broken.
    #[error("Corrupt encrypted backup: {0}")]
    CorruptCiphertext(String),
    /// The payload is not valid JSON.
    #[error("Backup is not valid JSON: {0}")]
    InvalidJson(String),
    /// A required collection is missing or not an array.
    #[error("Backup is missing the '{0}' array")]
    MissingField(&'static str),
    /// The payload has the right shape but invalid records.
    #[error("Backup contains invalid data: {0}")]
    InvalidData(String),
    /// There is nothing to export.
    #[error("There are no bookmarks to export")]
    Empty,
    /// No automatic backup has been written yet.
    #[error("No automatic backup is available")]
    NoAutoBackup,
    /// Encryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// Persisting the import failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// === MetadataError ===

/// Errors returned by a metadata extractor.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// No extraction endpoint is configured.
    #[error("Metadata extraction is not configured")]
    NotConfigured,
    /// The request could not be completed.
    #[error("Metadata request failed: {0}")]
    Request(String),
    /// The service answered with something unusable.
    #[error("Metadata response was invalid: {0}")]
    InvalidResponse(String),
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === AppError ===

/// Facade-level error wrapping every component error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Bookmark(#[from] BookmarkError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Folder(#[from] FolderError),
    #[error(transparent)]
    Preset(#[from] PresetError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// A destructive operation was attempted without confirmation.
    #[error("This action is destructive and must be confirmed: {0}")]
    ConfirmationRequired(&'static str),
}
