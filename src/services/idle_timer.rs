//! Resettable single-shot inactivity timer.
//!
//! The timer runs as one tokio task that sleeps for the timeout and is
//! restarted by every [`IdleTimer::reset`]. After firing it stays quiet
//! until the next reset re-arms it. Dropping the timer cancels the task.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct IdleTimer {
    reset_tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl IdleTimer {
    /// Spawns the timer on `handle`. `on_idle` runs once per idle period.
    pub fn spawn<F>(handle: &Handle, timeout: Duration, on_idle: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (reset_tx, mut reset_rx) = mpsc::unbounded_channel::<()>();
        let task = handle.spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        debug!(timeout_secs = timeout.as_secs(), "idle timeout elapsed");
                        on_idle();
                        // Disarmed until the next activity.
                        if reset_rx.recv().await.is_none() {
                            break;
                        }
                    }
                    signal = reset_rx.recv() => {
                        if signal.is_none() {
                            break;
                        }
                    }
                }
            }
        });
        Self { reset_tx, task }
    }

    /// Restarts the countdown.
    pub fn reset(&self) {
        let _ = self.reset_tx.send(());
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
