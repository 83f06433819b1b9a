//! Typed binding of one storage key to an in-memory value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::area::{LocalStorage, StorageEvent};
use super::codec::{self, Decoded};
use super::event_bus::Subscription;
use crate::types::errors::StorageError;

/// Live link between a value of type `T` and the text stored under `key`.
///
/// Writes made through [`Binding::set`] and [`Binding::update`] are visible
/// immediately in this binding. Writes from other tabs are picked up by
/// [`Binding::sync`], which re-reads the key so the last committed write
/// wins. Writes from the binding's own tab through a different handle are
/// not signalled and only show up after [`Binding::reload`].
pub struct Binding<T> {
    storage: LocalStorage,
    key: String,
    initial: T,
    value: T,
    stale: Arc<AtomicBool>,
    _subscription: Subscription<StorageEvent>,
}

impl<T> Binding<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Binds `key`, reading its current value or falling back to `initial`.
    pub fn bind(storage: &LocalStorage, key: &str, initial: T) -> Self {
        let stale = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stale);
        let watched = key.to_string();
        let own_tab = storage.tab_id();
        let subscription = storage.area().subscribe(move |event| {
            if event.key == watched && event.origin != own_tab {
                flag.store(true, Ordering::Release);
            }
        });

        let value = read_value(storage, key, &initial);
        Self {
            storage: storage.clone(),
            key: key.to_string(),
            initial,
            value,
            stale,
            _subscription: subscription,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Persists `value` and makes it current.
    ///
    /// # Errors
    /// Returns the storage error if the write fails; the in-memory value is
    /// left unchanged in that case.
    pub fn set(&mut self, value: T) -> Result<(), StorageError> {
        let text = codec::encode(&value)?;
        self.storage.set_item(&self.key, &text)?;
        self.value = value;
        Ok(())
    }

    /// Computes the next value from the current one and persists it.
    pub fn update<F>(&mut self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value);
        self.set(next)
    }

    /// Re-reads the stored value, discarding the in-memory copy.
    pub fn reload(&mut self) {
        self.stale.store(false, Ordering::Release);
        self.value = read_value(&self.storage, &self.key, &self.initial);
    }

    /// Applies pending changes made by other tabs. Returns `true` if the value
    /// was re-read.
    pub fn sync(&mut self) -> bool {
        if self.stale.swap(false, Ordering::AcqRel) {
            debug!(key = %self.key, "reloading after change in another tab");
            self.value = read_value(&self.storage, &self.key, &self.initial);
            true
        } else {
            false
        }
    }
}

/// Reads and decodes `key`, migrating legacy encodings in place.
pub(crate) fn read_value<T>(storage: &LocalStorage, key: &str, initial: &T) -> T
where
    T: Serialize + DeserializeOwned + Clone,
{
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return initial.clone(),
        Err(e) => {
            warn!(key, error = %e, "failed to read stored value, using default");
            return initial.clone();
        }
    };

    match codec::decode::<T>(&raw) {
        Decoded::Current(value) => value,
        Decoded::Legacy(value) => {
            match codec::encode(&value).and_then(|text| storage.set_item(key, &text)) {
                Ok(()) => info!(key, "migrated legacy value to the current encoding"),
                Err(e) => warn!(key, error = %e, "failed to rewrite legacy value"),
            }
            value
        }
        Decoded::Corrupt(reason) => {
            warn!(key, %reason, "stored value is unreadable, using default");
            initial.clone()
        }
    }
}
