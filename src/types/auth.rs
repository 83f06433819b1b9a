use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Observable state of the PIN lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No PIN stored and the app is open.
    NoPinSet,
    /// A PIN exists but the lock is switched off.
    LockDisabled,
    /// The lock screen is shown. Without a stored PIN this means "set up a PIN".
    Locked,
    /// Unlocked with the lock enabled; re-locks at `deadline` without activity.
    Unlocked { deadline: Option<Instant> },
}

impl AuthState {
    /// Short machine-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::NoPinSet => "noPinSet",
            AuthState::LockDisabled => "lockDisabled",
            AuthState::Locked => "locked",
            AuthState::Unlocked { .. } => "unlocked",
        }
    }
}

/// User-activity signals that push the inactivity deadline back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivitySignal {
    PointerMove,
    KeyPress,
    Click,
    Scroll,
    Touch,
}
