//! Shared storage area and per-tab handles.
//!
//! A [`StorageArea`] is one physical key-value namespace shared by every tab
//! of the application. Each tab talks to it through its own [`LocalStorage`]
//! handle. Every write or removal publishes a [`StorageEvent`] tagged with the
//! writing tab, so listeners can tell their own writes from foreign ones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::backend::{KeyValueStore, MemoryStore, SqliteStore};
use super::event_bus::{EventBus, Subscription};
use crate::database::Database;
use crate::types::errors::StorageError;

/// Identifies the tab that performed a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(u64);

/// Change notification for a single key.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
    pub origin: TabId,
}

struct AreaInner {
    backend: Mutex<Box<dyn KeyValueStore>>,
    events: EventBus<StorageEvent>,
    next_tab: AtomicU64,
}

/// The storage shared by all tabs. Cheap to clone.
#[derive(Clone)]
pub struct StorageArea {
    inner: Arc<AreaInner>,
}

impl StorageArea {
    pub fn new<S: KeyValueStore + 'static>(backend: S) -> Self {
        Self {
            inner: Arc::new(AreaInner {
                backend: Mutex::new(Box::new(backend)),
                events: EventBus::new(),
                next_tab: AtomicU64::new(1),
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn sqlite(db: Database) -> Self {
        Self::new(SqliteStore::new(db))
    }

    /// Opens a new tab onto this area.
    pub fn open_tab(&self) -> LocalStorage {
        let id = TabId(self.inner.next_tab.fetch_add(1, Ordering::Relaxed));
        debug!(tab = id.0, "opened storage tab");
        LocalStorage {
            area: self.clone(),
            tab: id,
        }
    }

    /// Subscribes to changes made by any tab, including the subscriber's own.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<StorageEvent>
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(callback)
    }

    fn with_backend<R>(&self, f: impl FnOnce(&mut dyn KeyValueStore) -> R) -> R {
        let mut guard = self
            .inner
            .backend
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        f(&mut **guard)
    }
}

/// One tab's view of the shared [`StorageArea`].
#[derive(Clone)]
pub struct LocalStorage {
    area: StorageArea,
    tab: TabId,
}

impl LocalStorage {
    pub fn tab_id(&self) -> TabId {
        self.tab
    }

    pub fn area(&self) -> &StorageArea {
        &self.area
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.area.with_backend(|b| b.get_item(key))
    }

    /// Writes `value` and notifies every subscriber once the write is committed.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = self.area.with_backend(|b| {
            let old = b.get_item(key)?;
            b.set_item(key, value)?;
            Ok::<_, StorageError>(old)
        })?;
        self.area.inner.events.publish(&StorageEvent {
            key: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
            origin: self.tab,
        });
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let old_value = self.area.with_backend(|b| {
            let old = b.get_item(key)?;
            if old.is_some() {
                b.remove_item(key)?;
            }
            Ok::<_, StorageError>(old)
        })?;
        if old_value.is_some() {
            self.area.inner.events.publish(&StorageEvent {
                key: key.to_string(),
                old_value,
                new_value: None,
                origin: self.tab,
            });
        }
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.area.with_backend(|b| b.keys())
    }

    /// Removes every key starting with `prefix`. Returns how many were removed.
    pub fn clear_namespace(&self, prefix: &str) -> Result<usize, StorageError> {
        let keys: Vec<String> = self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        for key in &keys {
            self.remove_item(key)?;
        }
        Ok(keys.len())
    }
}
