// src/config.rs
//! Configuration management with file-based storage

use crate::{
    error::{GpsError, Result},
    gps::staleness::DEFAULT_STALE_TIMEOUT,
    monitor::ConnectionSettings,
    source::gpsd::DEFAULT_GPSD_PORT,
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    pub source_type: String, // "serial", "gpsd"
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    pub stale_timeout_ms: Option<u64>,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            source_type: "serial".to_string(),
            serial_port: None,
            serial_baudrate: Some(9600),
            gpsd_host: Some("localhost".to_string()),
            gpsd_port: Some(DEFAULT_GPSD_PORT),
            stale_timeout_ms: Some(DEFAULT_STALE_TIMEOUT.as_millis() as u64),
        }
    }
}

impl GpsConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Load from a config file, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GpsError::Config(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| GpsError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GpsError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(path, contents)
            .map_err(|e| GpsError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| GpsError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gps-fix-monitor")
            .join("config.json"))
    }

    /// Port identifier and baud rate for the configured source.
    pub fn connection(&self) -> Result<ConnectionSettings> {
        match self.source_type.as_str() {
            "serial" => {
                let port = self
                    .serial_port
                    .clone()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| GpsError::Config("No serial port configured".to_string()))?;
                Ok(ConnectionSettings {
                    port,
                    baud_rate: self.serial_baudrate.unwrap_or(9600),
                })
            }
            "gpsd" => {
                let host = self.gpsd_host.as_deref().unwrap_or("localhost");
                let port = self.gpsd_port.unwrap_or(DEFAULT_GPSD_PORT);
                Ok(ConnectionSettings {
                    port: format!("{}:{}", host, port),
                    baud_rate: 0,
                })
            }
            other => Err(GpsError::Config(format!("Unknown source type '{}'", other))),
        }
    }

    pub fn stale_timeout(&self) -> Duration {
        self.stale_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STALE_TIMEOUT)
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.source_type = "gpsd".to_string();
        self.gpsd_host = Some(host);
        self.gpsd_port = Some(port);
    }
}
