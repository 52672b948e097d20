// src/gps/decoder.rs
//! The decoding core: owns the fix state and applies the publish policy

use super::{
    data::FixState,
    nmea,
    publisher::FixPublisher,
    staleness::StalenessMonitor,
};
use crate::display::FixSink;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};
use tracing::{debug, trace, warn};

/// Turns raw sentences into fixes.
///
/// Safe to call from the reader task: every entry point does bounded,
/// synchronous work and never returns an error. The fix state is only
/// touched under its lock, so a dispatch and the validity check that
/// follows it are never interleaved with a staleness expiry.
pub struct NmeaDecoder {
    state: Mutex<FixState>,
    publisher: FixPublisher,
    staleness: StalenessMonitor,
    active: AtomicBool,
}

impl NmeaDecoder {
    pub fn new(sink: Arc<dyn FixSink>, stale_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FixState::new()),
            publisher: FixPublisher::new(sink),
            staleness: StalenessMonitor::new(stale_timeout),
            active: AtomicBool::new(false),
        })
    }

    /// Begin accepting sentences and arm the staleness timer.
    pub fn activate(self: &Arc<Self>) {
        let _state = self.lock_state();
        self.active.store(true, Ordering::SeqCst);
        self.arm_staleness();
    }

    /// Stop dispatching immediately; sentences still in flight are dropped.
    pub fn deactivate(&self) {
        let _state = self.lock_state();
        self.active.store(false, Ordering::SeqCst);
        self.staleness.stop();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// A copy of the current fix state
    pub fn snapshot(&self) -> FixState {
        self.lock_state().clone()
    }

    /// Validate and dispatch one sentence. Returns whether it was applied.
    pub fn handle_sentence(self: &Arc<Self>, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        let mut state = self.lock_state();
        if !self.is_active() {
            trace!(sentence = line, "decoder inactive, dropping sentence");
            return false;
        }

        if !nmea::validate_checksum(line) {
            debug!(sentence = line, "dropping sentence with bad checksum");
            return false;
        }

        let outcome = nmea::dispatch(&mut state, line);
        if outcome.kind.is_none() {
            trace!(sentence = line, "ignoring uninterpreted sentence");
            return true;
        }

        if outcome.fresh_fix {
            self.arm_staleness();
            if self.publisher.publish_fresh(&state) {
                debug!(
                    quality = state.quality().description(),
                    satellites = state.satellites(),
                    hdop = state.hdop(),
                    "published fresh fix"
                );
            }
        }

        if outcome.heading_updated {
            self.publisher.publish_heading(&state);
        }

        true
    }

    /// Report a read or transport failure from the byte source.
    ///
    /// Forces a stale publish when a position is already known.
    pub fn handle_transport_error(&self, error: &dyn fmt::Display) {
        warn!(%error, "GPS transport error");

        let mut state = self.lock_state();
        if !self.is_active() {
            return;
        }
        if self.publisher.publish_stale(&mut state) {
            self.staleness.stop();
            debug!("published stale fix after transport error");
        }
    }

    fn arm_staleness(self: &Arc<Self>) {
        let decoder = Arc::downgrade(self);
        self.staleness.restart(move |generation| {
            if let Some(decoder) = decoder.upgrade() {
                decoder.expire(generation);
            }
        });
    }

    fn expire(&self, generation: u64) {
        let mut state = self.lock_state();
        // A fresh fix or a stop may have raced past this expiry.
        if !self.staleness.is_current(generation) || !self.is_active() {
            return;
        }
        if self.publisher.publish_stale(&mut state) {
            debug!(
                timeout_ms = self.staleness.timeout().as_millis() as u64,
                "no fresh fix within timeout, published stale fix"
            );
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, FixState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
