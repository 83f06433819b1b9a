//! Versioned text encoding of stored values.
//!
//! Current values are written as `{"v":<version>,"data":<json>}`. Older
//! installs stored bare JSON, and a few keys stored raw unquoted strings;
//! both decode as [`Decoded::Legacy`] so the caller can rewrite them once.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::errors::StorageError;

/// Envelope version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    v: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    v: u32,
    data: T,
}

#[derive(Deserialize)]
struct VersionHeader {
    v: u32,
}

/// Outcome of decoding a stored value.
#[derive(Debug, PartialEq)]
pub enum Decoded<T> {
    /// Envelope of the current version.
    Current(T),
    /// Pre-envelope encoding; should be rewritten.
    Legacy(T),
    /// Unreadable; the reason is meant for logs.
    Corrupt(String),
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(&EnvelopeRef {
        v: SCHEMA_VERSION,
        data: value,
    })
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(raw: &str) -> Decoded<T> {
    if let Ok(envelope) = serde_json::from_str::<Envelope<T>>(raw) {
        if envelope.v == SCHEMA_VERSION {
            return Decoded::Current(envelope.data);
        }
        return Decoded::Corrupt(format!("unsupported schema version {}", envelope.v));
    }
    if let Ok(header) = serde_json::from_str::<VersionHeader>(raw) {
        if header.v > SCHEMA_VERSION {
            return Decoded::Corrupt(format!("unsupported schema version {}", header.v));
        }
    }
    if let Ok(value) = serde_json::from_str::<T>(raw) {
        return Decoded::Legacy(value);
    }
    match serde_json::from_value::<T>(serde_json::Value::String(raw.to_string())) {
        Ok(value) => Decoded::Legacy(value),
        Err(e) => Decoded::Corrupt(e.to_string()),
    }
}
