// src/gps/mod.rs
//! NMEA decoding, fix state and publish policy

pub mod accuracy;
pub mod data;
pub mod decoder;
pub mod nmea;
pub mod publisher;
pub mod staleness;

pub use data::{Fix, FixQuality, FixState, Position};
pub use decoder::NmeaDecoder;
