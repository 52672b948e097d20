// src/source/serial.rs
//! Serial port byte source

use super::{ByteSource, NMEA_DELIMITER};
use crate::error::{GpsError, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialPortInfo, SerialStream};
use tracing::{debug, info};

const READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Reads NMEA sentences from a serial GPS receiver.
#[derive(Debug, Default, Clone)]
pub struct SerialByteSource;

impl SerialByteSource {
    pub fn new() -> Self {
        Self
    }
}

impl ByteSource for SerialByteSource {
    type Port = BufReader<SerialStream>;

    async fn open(&self, port: &str, baud_rate: u32) -> Result<Self::Port> {
        info!(port, baud_rate, "opening serial port");

        let serial = tokio_serial::new(port, baud_rate)
            .timeout(READ_TIMEOUT)
            .open_native_async()
            .map_err(|e| {
                GpsError::Connection(format!("Failed to open serial port {}: {}", port, e))
            })?;

        Ok(BufReader::new(serial))
    }

    async fn read_line(&self, port: &mut Self::Port) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let n = port.read_until(NMEA_DELIMITER, &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).trim().to_string()))
    }

    async fn close(&self, port: Self::Port) -> Result<()> {
        // Dropping the OS handle can block on some drivers.
        tokio::task::spawn_blocking(move || drop(port))
            .await
            .map_err(|e| GpsError::Other(format!("Serial port release failed: {}", e)))?;
        debug!("serial port released");
        Ok(())
    }
}

/// List available serial ports
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>> {
    Ok(tokio_serial::available_ports()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_port_is_connection_error() {
        let source = SerialByteSource::new();
        let result = source.open("/dev/does-not-exist-gps0", 9600).await;
        assert!(matches!(result, Err(GpsError::Connection(_))));
    }
}
