// src/display/json.rs
//! JSON-lines sink for piping fixes into other tools

use super::{FixEvent, FixSink};
use crate::gps::data::Fix;
use std::{
    io::{self, Write},
    sync::Mutex,
};
use tracing::warn;

pub struct JsonLinesSink<W: Write + Send = io::Stdout> {
    out: Mutex<W>,
}

impl JsonLinesSink {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for JsonLinesSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: &FixEvent) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = write_event(&mut *out, event) {
            warn!(error = %e, "failed to write fix as JSON");
        }
    }
}

fn write_event(out: &mut impl Write, event: &FixEvent) -> io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    out.flush()
}

impl<W: Write + Send> FixSink for JsonLinesSink<W> {
    fn publish_fix(&self, fix: Fix) {
        self.emit(&FixEvent::Fix(fix));
    }

    fn publish_heading(&self, heading: f64) {
        self.emit(&FixEvent::Heading { heading });
    }
}
