// src/gps/publisher.rs
//! Fix assembly and hand-off to the sink

use super::{
    accuracy::{self, UNKNOWN_ACCURACY_M},
    data::{Fix, FixState},
};
use crate::display::FixSink;
use chrono::Utc;
use std::sync::Arc;

/// Assemble a fix from the current state, or `None` before the first position.
pub fn build_fix(state: &FixState, stale: bool) -> Option<Fix> {
    let position = state.position()?;
    let accuracy = if stale {
        UNKNOWN_ACCURACY_M
    } else {
        accuracy::estimate(state.quality(), state.hdop())
    };

    Some(Fix {
        position,
        accuracy,
        velocity: state.velocity(),
        heading: state.heading(),
        stale,
        timestamp: Utc::now(),
    })
}

pub struct FixPublisher {
    sink: Arc<dyn FixSink>,
}

impl FixPublisher {
    pub fn new(sink: Arc<dyn FixSink>) -> Self {
        Self { sink }
    }

    /// Publish the current state as a new fix. Returns `false` if no position
    /// has been established yet.
    pub fn publish_fresh(&self, state: &FixState) -> bool {
        self.publish(state, false)
    }

    /// Zero the velocity and republish the last position flagged as stale.
    pub fn publish_stale(&self, state: &mut FixState) -> bool {
        if state.position().is_none() {
            return false;
        }
        state.mark_stale();
        self.publish(state, true)
    }

    pub fn publish_heading(&self, state: &FixState) -> bool {
        if !state.position_valid() {
            return false;
        }
        self.sink.publish_heading(state.heading());
        true
    }

    fn publish(&self, state: &FixState, stale: bool) -> bool {
        match build_fix(state, stale) {
            Some(fix) => {
                self.sink.publish_fix(fix);
                true
            }
            None => false,
        }
    }
}
