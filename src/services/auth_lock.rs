//! PIN lock state machine.
//!
//! The PIN hash and the lock-enabled flag live in storage; whether this tab
//! is currently locked is runtime state shared with the idle timer and with
//! the storage-change listener, so both can flip it from other threads.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::services::crypto_service::{CryptoService, CryptoServiceTrait};
use crate::services::idle_timer::IdleTimer;
use crate::storage::codec::{self, Decoded};
use crate::storage::{keys, LocalStorage, StorageEvent, Subscription};
use crate::types::auth::{ActivitySignal, AuthState};
use crate::types::errors::AuthError;

/// Longest PIN accepted by the lock screen.
pub const MAX_PIN_LENGTH: usize = 6;

/// Trait defining the lock operations.
pub trait AuthLockTrait {
    fn state(&self) -> AuthState;
    fn is_locked(&self) -> bool;
    fn is_lock_enabled(&self) -> bool;
    fn is_pin_set(&self) -> bool;

    /// Stores a new PIN and unlocks.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidPin`] if the PIN breaks the PIN policy.
    fn set_pin(&mut self, pin: &str) -> Result<(), AuthError>;

    /// Unlocks when `pin` matches. Always succeeds while the lock is disabled.
    fn unlock(&mut self, pin: &str) -> bool;

    /// Verifies `pin` without changing the lock state.
    fn check_pin(&self, pin: &str) -> bool;

    /// Replaces the stored PIN. The caller is expected to have checked the old one.
    fn change_pin(&mut self, new_pin: &str) -> Result<(), AuthError>;

    fn set_lock_enabled(&mut self, enabled: bool) -> Result<(), AuthError>;

    /// Pushes the inactivity deadline back.
    fn record_activity(&self, signal: ActivitySignal);

    /// Erases every key of the application namespace. Returns how many keys
    /// were removed.
    fn reset_app(&mut self) -> Result<usize, AuthError>;
}

#[derive(Debug)]
struct LockRuntime {
    locked: bool,
    deadline: Option<Instant>,
}

pub struct AuthLock {
    storage: LocalStorage,
    crypto: CryptoService,
    runtime: Arc<Mutex<LockRuntime>>,
    idle_timeout: Duration,
    min_pin_length: usize,
    timer: Option<IdleTimer>,
    _subscription: Subscription<StorageEvent>,
}

impl AuthLock {
    /// Creates the lock for one tab. It starts locked when the lock is
    /// enabled and a PIN exists.
    pub fn new(
        storage: &LocalStorage,
        crypto: CryptoService,
        idle_timeout: Duration,
        min_pin_length: usize,
    ) -> Self {
        let locked = read_lock_enabled(storage) && read_pin_hash(storage).is_some();
        let runtime = Arc::new(Mutex::new(LockRuntime {
            locked,
            deadline: None,
        }));

        let shared = Arc::clone(&runtime);
        let subscription = storage.area().subscribe(move |event| {
            on_storage_event(&shared, event);
        });

        debug!(locked, "auth lock initialised");
        Self {
            storage: storage.clone(),
            crypto,
            runtime,
            idle_timeout,
            min_pin_length,
            timer: None,
            _subscription: subscription,
        }
    }

    /// Starts the inactivity timer on the current tokio runtime.
    ///
    /// Returns `false` when called outside a runtime; the lock then never
    /// re-locks on its own.
    pub fn start_idle_timer(&mut self) -> bool {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no tokio runtime, inactivity re-lock disabled");
                return false;
            }
        };

        let runtime = Arc::clone(&self.runtime);
        let storage = self.storage.clone();
        self.timer = Some(IdleTimer::spawn(&handle, self.idle_timeout, move || {
            if !(read_lock_enabled(&storage) && read_pin_hash(&storage).is_some()) {
                return;
            }
            let mut rt = lock_runtime(&runtime);
            if !rt.locked {
                rt.locked = true;
                rt.deadline = None;
                info!("locked after inactivity");
            }
        }));
        if !self.is_locked() {
            self.arm();
        }
        true
    }

    fn runtime(&self) -> MutexGuard<'_, LockRuntime> {
        lock_runtime(&self.runtime)
    }

    fn arm(&self) {
        let deadline = self.timer.as_ref().map(|timer| {
            timer.reset();
            Instant::now() + self.idle_timeout
        });
        self.runtime().deadline = deadline;
    }

    fn set_locked(&self, locked: bool) {
        let mut rt = self.runtime();
        rt.locked = locked;
        rt.deadline = None;
    }

    fn validate_pin(&self, pin: &str) -> Result<(), AuthError> {
        if !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::InvalidPin("PIN must contain only digits".to_string()));
        }
        if pin.len() < self.min_pin_length || pin.len() > MAX_PIN_LENGTH {
            return Err(AuthError::InvalidPin(format!(
                "PIN must be {} to {} digits long",
                self.min_pin_length, MAX_PIN_LENGTH
            )));
        }
        Ok(())
    }

    fn store_pin(&self, pin: &str) -> Result<(), AuthError> {
        self.validate_pin(pin)?;
        let hash = self.crypto.hash_pin(pin)?;
        self.storage
            .set_item(keys::AUTH_PIN_HASH, &codec::encode(&hash)?)?;
        Ok(())
    }
}

impl AuthLockTrait for AuthLock {
    fn state(&self) -> AuthState {
        let (locked, deadline) = {
            let rt = self.runtime();
            (rt.locked, rt.deadline)
        };
        if locked {
            AuthState::Locked
        } else if !self.is_pin_set() {
            AuthState::NoPinSet
        } else if !self.is_lock_enabled() {
            AuthState::LockDisabled
        } else {
            AuthState::Unlocked { deadline }
        }
    }

    fn is_locked(&self) -> bool {
        self.runtime().locked
    }

    fn is_lock_enabled(&self) -> bool {
        read_lock_enabled(&self.storage)
    }

    fn is_pin_set(&self) -> bool {
        read_pin_hash(&self.storage).is_some()
    }

    fn set_pin(&mut self, pin: &str) -> Result<(), AuthError> {
        self.store_pin(pin)?;
        self.set_locked(false);
        self.arm();
        info!("PIN set, app unlocked");
        Ok(())
    }

    fn unlock(&mut self, pin: &str) -> bool {
        if !self.is_lock_enabled() {
            self.set_locked(false);
            return true;
        }
        let Some(stored) = read_pin_hash(&self.storage) else {
            warn!("unlock attempted with no stored PIN");
            return false;
        };
        if self.crypto.verify_pin(pin, &stored) {
            self.set_locked(false);
            self.arm();
            info!("app unlocked");
            true
        } else {
            warn!("wrong PIN entered");
            false
        }
    }

    fn check_pin(&self, pin: &str) -> bool {
        match read_pin_hash(&self.storage) {
            Some(stored) => self.crypto.verify_pin(pin, &stored),
            None => false,
        }
    }

    fn change_pin(&mut self, new_pin: &str) -> Result<(), AuthError> {
        self.store_pin(new_pin)?;
        info!("PIN changed");
        Ok(())
    }

    fn set_lock_enabled(&mut self, enabled: bool) -> Result<(), AuthError> {
        self.storage
            .set_item(keys::AUTH_LOCK_ENABLED, &codec::encode(&enabled)?)?;
        if !enabled {
            self.set_locked(false);
        } else if !self.is_pin_set() {
            self.set_locked(true);
        } else if !self.is_locked() {
            self.arm();
        }
        info!(enabled, "lock setting changed");
        Ok(())
    }

    fn record_activity(&self, signal: ActivitySignal) {
        if self.is_locked() {
            return;
        }
        debug!(?signal, "user activity");
        self.arm();
    }

    fn reset_app(&mut self) -> Result<usize, AuthError> {
        let removed = self.storage.clear_namespace(keys::NAMESPACE)?;
        self.set_locked(false);
        warn!(removed, "application data erased");
        Ok(removed)
    }
}

fn lock_runtime(runtime: &Mutex<LockRuntime>) -> MutexGuard<'_, LockRuntime> {
    runtime.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mirrors lock-relevant changes made by any tab.
fn on_storage_event(runtime: &Mutex<LockRuntime>, event: &StorageEvent) {
    let unlock = match event.key.as_str() {
        keys::AUTH_LOCK_ENABLED => !event.new_value.as_deref().is_some_and(decode_flag),
        keys::AUTH_PIN_HASH => event.new_value.is_none(),
        _ => false,
    };
    if unlock {
        let mut rt = lock_runtime(runtime);
        if rt.locked {
            debug!(key = %event.key, "unlocked by a storage change");
        }
        rt.locked = false;
    }
}

fn decode_flag(raw: &str) -> bool {
    matches!(
        codec::decode::<bool>(raw),
        Decoded::Current(true) | Decoded::Legacy(true)
    )
}

fn read_lock_enabled(storage: &LocalStorage) -> bool {
    match storage.get_item(keys::AUTH_LOCK_ENABLED) {
        Ok(Some(raw)) => decode_flag(&raw),
        Ok(None) => false,
        Err(e) => {
            warn!(error = %e, "failed to read lock setting");
            false
        }
    }
}

fn read_pin_hash(storage: &LocalStorage) -> Option<String> {
    let raw = match storage.get_item(keys::AUTH_PIN_HASH) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "failed to read PIN hash");
            return None;
        }
    };
    match codec::decode::<String>(&raw) {
        Decoded::Current(hash) | Decoded::Legacy(hash) if !hash.is_empty() => Some(hash),
        _ => None,
    }
}
