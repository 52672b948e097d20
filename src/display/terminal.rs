// src/display/terminal.rs
//! Terminal sink: one colored line per published fix

use super::FixSink;
use crate::{
    error::{GpsError, Result},
    gps::data::Fix,
};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::{
    io::{self, Write},
    sync::Mutex,
};
use tracing::warn;

pub struct TerminalSink<W: Write + Send = io::Stdout> {
    out: Mutex<W>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_with<F>(&self, render: F)
    where
        F: FnOnce(&mut W) -> Result<()>,
    {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = render(&mut *out).and_then(|_| out.flush().map_err(GpsError::Io)) {
            warn!(error = %e, "failed to write to terminal");
        }
    }
}

/// Render a fix as `[FIX]`/`[STALE]` followed by position and motion.
fn render_fix(out: &mut impl Write, fix: &Fix) -> Result<()> {
    let (label, color) = if fix.stale {
        ("STALE", Color::Yellow)
    } else {
        ("FIX  ", Color::Green)
    };

    execute!(
        out,
        SetForegroundColor(color),
        Print(format!("[{}]", label)),
        ResetColor,
        Print(format!(
            " {} lat {} lon {} ±{:.1} m  {:.2} m/s  {:.1}°\n",
            fix.timestamp.format("%H:%M:%S"),
            Fix::format_coordinate(fix.position.latitude),
            Fix::format_coordinate(fix.position.longitude),
            fix.accuracy,
            fix.velocity,
            fix.heading,
        ))
    )
    .map_err(GpsError::Io)
}

fn render_heading(out: &mut impl Write, heading: f64) -> Result<()> {
    execute!(
        out,
        SetForegroundColor(Color::Cyan),
        Print("[HDG  ]"),
        ResetColor,
        Print(format!(" {:.1}°\n", heading))
    )
    .map_err(GpsError::Io)
}

impl<W: Write + Send> FixSink for TerminalSink<W> {
    fn publish_fix(&self, fix: Fix) {
        self.write_with(|out| render_fix(out, &fix));
    }

    fn publish_heading(&self, heading: f64) {
        self.write_with(|out| render_heading(out, heading));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::data::Position;
    use chrono::Utc;

    fn fix(stale: bool) -> Fix {
        Fix {
            position: Position::new(11.516667, 48.1173),
            accuracy: 4.6,
            velocity: 0.0,
            heading: 84.4,
            stale,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_renders_fresh_and_stale_labels() {
        let sink = TerminalSink::with_writer(Vec::new());
        sink.publish_fix(fix(false));
        sink.publish_fix(fix(true));
        sink.publish_heading(12.5);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("[FIX  ]"));
        assert!(lines[0].contains("48.117300"));
        assert!(lines[0].contains("±4.6 m"));
        assert!(lines[1].contains("[STALE]"));
        assert!(lines[2].contains("12.5°"));
    }
}
