// src/lib.rs
//! GPS Fix Monitor Library
//!
//! Decodes NMEA-0183 sentences from a serial receiver or gpsd into position
//! fixes with accuracy estimates, republishes the last position as stale when
//! the receiver goes quiet, and manages the connection so that a reopen can
//! never race a close that is still releasing the port.

pub mod config;
pub mod display;
pub mod error;
pub mod gps;
pub mod lifecycle;
pub mod monitor;
pub mod source;

// Re-export main types for convenience
pub use display::{FixEvent, FixSink};
pub use error::{GpsError, Result};
pub use gps::{Fix, FixQuality, FixState, NmeaDecoder, Position};
pub use lifecycle::{CloseOutcome, ConnectionState};
pub use monitor::{ConnectionSettings, GpsMonitor};
pub use source::ByteSource;
