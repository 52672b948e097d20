// src/display/mod.rs
//! Fix sinks: where decoded fixes end up

pub mod json;
pub mod terminal;

use crate::gps::data::Fix;
use serde::Serialize;
use tokio::sync::mpsc;

/// Receiver of published fixes.
///
/// Called from the reader task and the staleness timer while the fix state
/// is locked, so implementations should hand the data off quickly.
pub trait FixSink: Send + Sync {
    fn publish_fix(&self, fix: Fix);

    /// Only invoked while the current position is valid.
    fn publish_heading(&self, heading: f64);
}

/// A single publish, as seen by channel and JSON consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixEvent {
    Fix(Fix),
    Heading { heading: f64 },
}

/// Forwards every publish over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<FixEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FixEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FixSink for ChannelSink {
    fn publish_fix(&self, fix: Fix) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(FixEvent::Fix(fix));
    }

    fn publish_heading(&self, heading: f64) {
        let _ = self.tx.send(FixEvent::Heading { heading });
    }
}
