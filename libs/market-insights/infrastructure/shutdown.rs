//! Ctrl+C handling for the sync binary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tracing::info;

/// Running flag flipped by Ctrl+C, with a wake-up for sleepers
pub struct ShutdownManager {
    running: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Spawn a Ctrl+C signal handler that triggers shutdown
    pub fn spawn_signal_handler(&self) {
        let running = Arc::clone(&self.running);
        let notify = Arc::clone(&self.notify);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal (Ctrl+C)");
                running.store(false, Ordering::Release);
                notify.notify_waiters();
            }
        });
    }

    /// Request shutdown programmatically
    pub fn trigger(&self) {
        self.running.store(false, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, returning early once shutdown is requested
    pub async fn interruptible_sleep(&self, duration: Duration) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent trigger can't slip between
        notified.as_mut().enable();

        if !self.is_running() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = notified => {}
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_stops_and_wakes() {
        let shutdown = Arc::new(ShutdownManager::new());
        assert!(shutdown.is_running());

        let sleeper = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move {
            sleeper.interruptible_sleep(Duration::from_secs(60)).await;
        });

        tokio::task::yield_now().await;
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sleep should end on shutdown")
            .unwrap();
        assert!(!shutdown.is_running());
    }
}
