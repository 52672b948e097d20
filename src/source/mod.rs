// src/source/mod.rs
//! Byte sources that deliver newline-delimited NMEA sentences

pub mod gpsd;
pub mod serial;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::Result;
use std::future::Future;

pub use gpsd::GpsdByteSource;
pub use serial::{list_serial_ports, SerialByteSource};

/// Sentences are terminated by CR/LF; splitting on LF and trimming covers both.
pub const NMEA_DELIMITER: u8 = b'\n';

/// The transport underneath the monitor.
///
/// `open` and `close` may take arbitrarily long; the monitor guarantees it
/// never has two opens in flight and never opens while a close is pending.
/// Any error returned here is treated as a transport error, never a crash.
pub trait ByteSource: Send + Sync + 'static {
    /// An open connection, owned by the reader task while open.
    type Port: Send + 'static;

    fn open(&self, port: &str, baud_rate: u32) -> impl Future<Output = Result<Self::Port>> + Send;

    /// Read the next line without its delimiter. `Ok(None)` means end of stream.
    fn read_line(
        &self,
        port: &mut Self::Port,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Release the port. Runs on the reader task, not on the caller of `stop`.
    fn close(&self, port: Self::Port) -> impl Future<Output = Result<()>> + Send;
}
