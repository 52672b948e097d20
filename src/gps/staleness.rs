// src/gps/staleness.rs
//! Restartable countdown that fires when no fresh fix arrives in time

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};
use tokio::task::JoinHandle;

pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_millis(5000);

/// A one-shot timer that is aborted and respawned on every restart.
///
/// Each arming gets a generation number which is handed to the expiry
/// callback. A callback that lost a race with a later restart can detect
/// it with [`StalenessMonitor::is_current`].
#[derive(Debug)]
pub struct StalenessMonitor {
    timeout: Duration,
    generation: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl StalenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            generation: AtomicU64::new(0),
            timer: Mutex::new(None),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stop any running countdown and start a new one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn restart<F>(&self, on_expire: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let mut timer = self.lock_timer();
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let timeout = self.timeout;
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            on_expire(generation);
        }));
    }

    pub fn stop(&self) {
        let mut timer = self.lock_timer();
        // Invalidate a callback that may already be past its sleep.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }

    /// Whether `generation` belongs to the most recent arming.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for StalenessMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
    }
}
