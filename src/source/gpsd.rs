// src/source/gpsd.rs
//! gpsd byte source: raw NMEA relayed over gpsd's TCP socket

use super::{ByteSource, NMEA_DELIMITER};
use crate::error::{GpsError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tracing::{debug, info};

pub const DEFAULT_GPSD_PORT: u16 = 2947;

const WATCH_NMEA: &str = "?WATCH={\"enable\":true,\"nmea\":true}\n";

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// Connects to gpsd and asks it to pass through the receiver's NMEA.
///
/// The port identifier is `host:port`; the baud rate is ignored since
/// gpsd owns the serial line.
#[derive(Debug, Default, Clone)]
pub struct GpsdByteSource;

impl GpsdByteSource {
    pub fn new() -> Self {
        Self
    }
}

impl ByteSource for GpsdByteSource {
    type Port = BufReader<TcpStream>;

    async fn open(&self, port: &str, _baud_rate: u32) -> Result<Self::Port> {
        info!(address = port, "connecting to gpsd");

        let mut stream = TcpStream::connect(port).await.map_err(|e| {
            GpsError::Connection(format!("Failed to connect to gpsd at {}: {}", port, e))
        })?;

        stream
            .write_all(WATCH_NMEA.as_bytes())
            .await
            .map_err(|e| GpsError::Connection(format!("Failed to send WATCH command: {}", e)))?;

        Ok(BufReader::new(stream))
    }

    async fn read_line(&self, port: &mut Self::Port) -> Result<Option<String>> {
        loop {
            let mut buf = Vec::new();
            if port.read_until(NMEA_DELIMITER, &mut buf).await? == 0 {
                return Ok(None);
            }

            let line = String::from_utf8_lossy(&buf).trim().to_string();
            if line.starts_with('{') {
                report_gpsd_message(&line);
                continue;
            }
            return Ok(Some(line));
        }
    }

    async fn close(&self, port: Self::Port) -> Result<()> {
        let mut stream = port.into_inner();
        stream.shutdown().await?;
        debug!("gpsd connection closed");
        Ok(())
    }
}

/// Log gpsd's own JSON status lines; they never reach the decoder.
fn report_gpsd_message(line: &str) -> Option<String> {
    let msg: GpsdMessage = match serde_json::from_str(line) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(error = %e, "unparsable gpsd status line");
            return None;
        }
    };

    match msg.class.as_str() {
        "VERSION" => {
            if let Some(version) = msg.data.get("release").and_then(|v| v.as_str()) {
                info!(version, "connected to gpsd");
            }
        }
        "DEVICES" => {
            if let Some(devices) = msg.data.get("devices").and_then(|v| v.as_array()) {
                let paths: Vec<&str> = devices
                    .iter()
                    .filter_map(|device| device.get("path").and_then(|v| v.as_str()))
                    .collect();
                info!(count = devices.len(), ?paths, "gpsd managing devices");
            }
        }
        _ => debug!(class = %msg.class, "ignoring gpsd message"),
    }

    Some(msg.class)
}
