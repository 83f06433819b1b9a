use mangamarks::types::errors::*;

// === BookmarkError Tests ===

#[test]
fn bookmark_error_not_found_display() {
    let err = BookmarkError::NotFound("bm-123".to_string());
    assert_eq!(err.to_string(), "Bookmark not found: bm-123");
}

#[test]
fn bookmark_error_invalid_field_display() {
    let err = BookmarkError::InvalidField {
        field: "rating",
        reason: "must be between 0 and 5".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Invalid bookmark field 'rating': must be between 0 and 5"
    );
}

#[test]
fn bookmark_error_wraps_storage_transparently() {
    let err: BookmarkError = StorageError::Database("disk full".to_string()).into();
    assert_eq!(err.to_string(), "Storage database error: disk full");
}

// === StatusError Tests ===

#[test]
fn status_error_in_use_names_label_and_count() {
    let err = StatusError::InUse {
        label: "Reading".to_string(),
        count: 3,
    };
    assert_eq!(
        err.to_string(),
        "Reading status 'Reading' is in use by 3 bookmark(s)"
    );
}

// === CryptoError Tests ===

#[test]
fn crypto_error_display_variants() {
    assert_eq!(
        CryptoError::KeyDerivation("bad salt".to_string()).to_string(),
        "Key derivation failed: bad salt"
    );
    assert_eq!(
        CryptoError::Decryption("tag mismatch".to_string()).to_string(),
        "Decryption failed: tag mismatch"
    );
}

// === BackupError Tests ===

#[test]
fn backup_error_display_variants() {
    assert_eq!(
        BackupError::PassphraseRequired.to_string(),
        "Backup is encrypted: a passphrase is required"
    );
    assert_eq!(
        BackupError::WrongPassphrase.to_string(),
        "Wrong passphrase or tampered backup"
    );
    assert_eq!(
        BackupError::MissingField("bookmarks").to_string(),
        "Backup is missing the 'bookmarks' array"
    );
    assert_eq!(BackupError::Empty.to_string(), "There are no bookmarks to export");
}

// === AppError Tests ===

#[test]
fn app_error_is_transparent_over_components() {
    let err: AppError = FolderError::NotFound("f-1".to_string()).into();
    assert_eq!(err.to_string(), "Folder not found: f-1");

    let err: AppError = AuthError::InvalidPin("too short".to_string()).into();
    assert_eq!(err.to_string(), "Invalid PIN: too short");
}

#[test]
fn app_error_confirmation_required_display() {
    let err = AppError::ConfirmationRequired("erase all application data");
    assert_eq!(
        err.to_string(),
        "This action is destructive and must be confirmed: erase all application data"
    );
}

#[test]
fn errors_implement_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(PresetError::EmptyName);
    assert_eq!(err.to_string(), "Preset name cannot be empty");
}
