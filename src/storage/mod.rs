// MangaMarks storage layer
// Key-value backends, the shared storage area with per-tab handles, the
// change-event bus, the value codec and typed bindings.

pub mod area;
pub mod backend;
pub mod binding;
pub mod codec;
pub mod event_bus;
pub mod keys;

pub use area::{LocalStorage, StorageArea, StorageEvent, TabId};
pub use backend::{KeyValueStore, MemoryStore, SqliteStore};
pub use binding::Binding;
pub use event_bus::{EventBus, Subscription};
