//! Backup document encoding.
//!
//! A backup is the pretty-printed JSON of [`BackupData`]. An encrypted
//! backup is `MMENC1:` followed by base64 of
//! `iterations ‖ salt ‖ iv ‖ ciphertext ‖ tag`, where the AES-256-GCM key is
//! derived from the passphrase with PBKDF2 and `iterations` is the
//! big-endian `u32` count it was derived with.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::services::crypto_service::{
    CryptoService, CryptoServiceTrait, EncryptedData, NONCE_LENGTH, SALT_LENGTH, TAG_LENGTH,
};
use crate::types::backup::BackupData;
use crate::types::errors::BackupError;

/// Marker that starts every encrypted backup.
pub const ENCRYPTED_PREFIX: &str = "MMENC1:";

/// Length of the iteration-count header of an encrypted blob.
const ITERATIONS_LENGTH: usize = 4;

/// Top-level arrays every backup must carry.
const REQUIRED_ARRAYS: [&str; 2] = ["bookmarks", "readingStatuses"];

/// Trait defining backup serialization.
pub trait BackupServiceTrait {
    /// Serializes `data`, encrypting it when a non-empty passphrase is given.
    fn export(&self, data: &BackupData, passphrase: Option<&str>) -> Result<String, BackupError>;

    /// Parses and validates a backup document.
    ///
    /// # Errors
    /// - [`BackupError::PassphraseRequired`] for an encrypted document without a passphrase
    /// - [`BackupError::WrongPassphrase`] when decryption fails authentication
    /// - [`BackupError::CorruptCiphertext`] when the encrypted payload is malformed
    /// - [`BackupError::InvalidJson`], [`BackupError::MissingField`] or
    ///   [`BackupError::InvalidData`] when the document itself is unusable
    fn parse(&self, text: &str, passphrase: Option<&str>) -> Result<BackupData, BackupError>;
}

/// Returns whether `text` looks like an encrypted backup.
pub fn is_encrypted(text: &str) -> bool {
    text.trim_start().starts_with(ENCRYPTED_PREFIX)
}

pub struct BackupService {
    crypto: CryptoService,
}

impl BackupService {
    pub fn new(crypto: CryptoService) -> Self {
        Self { crypto }
    }

    fn encrypt(&self, plaintext: &str, passphrase: &str) -> Result<String, BackupError> {
        let iterations = self.crypto.iterations();
        let salt = self.crypto.generate_salt()?;
        let mut key = self
            .crypto
            .derive_key_with_iterations(passphrase, &salt, iterations)?;
        let sealed = self.crypto.encrypt_aes256gcm(plaintext.as_bytes(), &key);
        key.zeroize();
        let sealed = sealed?;

        let mut blob = Vec::with_capacity(
            ITERATIONS_LENGTH
                + salt.len()
                + sealed.iv.len()
                + sealed.ciphertext.len()
                + sealed.auth_tag.len(),
        );
        blob.extend_from_slice(&iterations.to_be_bytes());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&sealed.iv);
        blob.extend_from_slice(&sealed.ciphertext);
        blob.extend_from_slice(&sealed.auth_tag);
        Ok(format!("{}{}", ENCRYPTED_PREFIX, BASE64.encode(blob)))
    }

    fn decrypt(&self, payload: &str, passphrase: &str) -> Result<String, BackupError> {
        let blob = BASE64
            .decode(payload.trim())
            .map_err(|e| BackupError::CorruptCiphertext(format!("invalid base64: {}", e)))?;
        if blob.len() < ITERATIONS_LENGTH + SALT_LENGTH + NONCE_LENGTH + TAG_LENGTH {
            return Err(BackupError::CorruptCiphertext(format!(
                "payload is too short ({} bytes)",
                blob.len()
            )));
        }

        let (header, rest) = blob.split_at(ITERATIONS_LENGTH);
        let mut count = [0u8; ITERATIONS_LENGTH];
        count.copy_from_slice(header);
        let iterations = u32::from_be_bytes(count);
        let (salt, rest) = rest.split_at(SALT_LENGTH);
        let (iv, rest) = rest.split_at(NONCE_LENGTH);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LENGTH);
        let encrypted = EncryptedData {
            ciphertext: ciphertext.to_vec(),
            iv: iv.to_vec(),
            auth_tag: tag.to_vec(),
        };

        let mut key = self
            .crypto
            .derive_key_with_iterations(passphrase, salt, iterations)
            .map_err(|e| BackupError::CorruptCiphertext(e.to_string()))?;
        let opened = self.crypto.decrypt_aes256gcm(&encrypted, &key);
        key.zeroize();
        let plaintext = opened.map_err(|e| {
            warn!(error = %e, "backup decryption failed");
            BackupError::WrongPassphrase
        })?;

        String::from_utf8(plaintext)
            .map_err(|e| BackupError::InvalidJson(format!("decrypted data is not UTF-8: {}", e)))
    }
}

impl BackupServiceTrait for BackupService {
    fn export(&self, data: &BackupData, passphrase: Option<&str>) -> Result<String, BackupError> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| BackupError::InvalidData(e.to_string()))?;
        match passphrase.filter(|p| !p.is_empty()) {
            Some(passphrase) => {
                debug!(bookmarks = data.bookmarks.len(), "exporting encrypted backup");
                self.encrypt(&json, passphrase)
            }
            None => Ok(json),
        }
    }

    fn parse(&self, text: &str, passphrase: Option<&str>) -> Result<BackupData, BackupError> {
        let text = text.trim();
        match text.strip_prefix(ENCRYPTED_PREFIX) {
            Some(payload) => {
                let passphrase = passphrase
                    .filter(|p| !p.is_empty())
                    .ok_or(BackupError::PassphraseRequired)?;
                let json = self.decrypt(payload, passphrase)?;
                parse_backup_json(&json)
            }
            None => parse_backup_json(text),
        }
    }
}

/// Parses plain backup JSON and checks it is internally consistent.
pub fn parse_backup_json(json: &str) -> Result<BackupData, BackupError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| BackupError::InvalidJson(e.to_string()))?;
    for field in REQUIRED_ARRAYS {
        if !value.get(field).is_some_and(Value::is_array) {
            return Err(BackupError::MissingField(field));
        }
    }

    let data: BackupData =
        serde_json::from_value(value).map_err(|e| BackupError::InvalidData(e.to_string()))?;
    validate(&data)?;
    Ok(data)
}

fn validate(data: &BackupData) -> Result<(), BackupError> {
    let mut status_ids = HashSet::new();
    for status in &data.reading_statuses {
        if !status_ids.insert(status.id.as_str()) {
            return Err(BackupError::InvalidData(format!(
                "duplicate status id '{}'",
                status.id
            )));
        }
    }

    // Without a folder list the live folders are kept, so references are
    // checked when the backup is applied instead.
    let folder_ids = match &data.folders {
        Some(folders) => {
            let mut ids = HashSet::new();
            for folder in folders {
                if !ids.insert(folder.id.as_str()) {
                    return Err(BackupError::InvalidData(format!(
                        "duplicate folder id '{}'",
                        folder.id
                    )));
                }
            }
            Some(ids)
        }
        None => None,
    };

    let mut seen = HashSet::new();
    for bookmark in &data.bookmarks {
        if bookmark.id.is_empty() || bookmark.title.trim().is_empty() || bookmark.url.trim().is_empty() {
            return Err(BackupError::InvalidData(
                "every bookmark needs an id, a title and a url".to_string(),
            ));
        }
        if !seen.insert(bookmark.id.as_str()) {
            return Err(BackupError::InvalidData(format!(
                "duplicate bookmark id '{}'",
                bookmark.id
            )));
        }
        if !status_ids.contains(bookmark.status_id.as_str()) {
            return Err(BackupError::InvalidData(format!(
                "bookmark '{}' references unknown status '{}'",
                bookmark.title, bookmark.status_id
            )));
        }
        if let (Some(folder_ids), Some(folder_id)) = (&folder_ids, bookmark.folder_id.as_deref()) {
            if !folder_ids.contains(folder_id) {
                return Err(BackupError::InvalidData(format!(
                    "bookmark '{}' references unknown folder '{}'",
                    bookmark.title, folder_id
                )));
            }
        }
    }
    Ok(())
}
