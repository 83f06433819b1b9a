//! Minimal publish/subscribe registry.
//!
//! Subscribers are plain callbacks. A [`Subscription`] guard removes its
//! callback when dropped, so a listener lives exactly as long as its owner.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct BusInner<E> {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Callback<E>>>,
}

/// Synchronous event bus. Cloning yields another handle to the same registry.
pub struct EventBus<E> {
    inner: Arc<BusInner<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers `callback`; it stays registered until the returned guard is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription<E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(callback));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers `event` to every current subscriber.
    ///
    /// The registry lock is released before callbacks run, so a callback may
    /// subscribe or publish without deadlocking.
    pub fn publish(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// Registration guard returned by [`EventBus::subscribe`].
pub struct Subscription<E> {
    id: u64,
    bus: Weak<BusInner<E>>,
}

impl<E> Subscription<E> {
    /// Explicitly removes the callback. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner
                .subscribers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&self.id);
        }
    }
}
