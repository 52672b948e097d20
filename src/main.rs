// src/main.rs
//! GPS Fix Monitor - streams NMEA fixes from a serial receiver or gpsd

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use gps_fix_monitor::{
    config::GpsConfig,
    display::{json::JsonLinesSink, terminal::TerminalSink},
    source::{list_serial_ports, GpsdByteSource, SerialByteSource},
    ByteSource, CloseOutcome, FixSink, GpsMonitor, NmeaDecoder,
};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for the port to be released on shutdown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    Serial,
    Gpsd,
}

#[derive(Debug, Parser)]
#[command(name = "gps-fix-monitor", version, about)]
struct Args {
    /// Where NMEA sentences come from
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Serial port, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// gpsd host name or address
    #[arg(long)]
    gpsd_host: Option<String>,

    /// gpsd TCP port (default 2947)
    #[arg(long)]
    gpsd_port: Option<u16>,

    /// Republish the last fix as stale after this long without a fresh one
    #[arg(long)]
    stale_timeout_ms: Option<u64>,

    /// Print fixes as JSON lines instead of colored text
    #[arg(long)]
    json: bool,

    /// Persist the effective settings to the config file
    #[arg(long)]
    save: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Args {
    fn apply(&self, config: &mut GpsConfig) {
        match self.source {
            Some(SourceKind::Serial) => config.source_type = "serial".to_string(),
            Some(SourceKind::Gpsd) => config.source_type = "gpsd".to_string(),
            None => {}
        }
        if let Some(port) = &self.port {
            config.serial_port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.serial_baudrate = Some(baud);
        }
        if let Some(host) = &self.gpsd_host {
            config.gpsd_host = Some(host.clone());
        }
        if let Some(port) = self.gpsd_port {
            config.gpsd_port = Some(port);
        }
        if let Some(ms) = self.stale_timeout_ms {
            config.stale_timeout_ms = Some(ms);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout only carries fixes
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if args.list_ports {
        let ports = list_serial_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        } else {
            println!("Available serial ports:");
            for port in ports {
                println!("  {} - {:?}", port.port_name, port.port_type);
            }
        }
        return Ok(());
    }

    let mut config = GpsConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable config: {}", e);
        GpsConfig::default()
    });
    args.apply(&mut config);

    if args.save {
        config.save().context("saving configuration")?;
        tracing::info!("Configuration saved to {}", GpsConfig::get_config_path()?.display());
    }

    let sink: Arc<dyn FixSink> = if args.json {
        Arc::new(JsonLinesSink::new())
    } else {
        Arc::new(TerminalSink::new())
    };

    match config.source_type.as_str() {
        "gpsd" => run(GpsdByteSource::new(), &config, sink).await,
        _ => run(SerialByteSource::new(), &config, sink).await,
    }
}

async fn run<S: ByteSource>(
    source: S,
    config: &GpsConfig,
    sink: Arc<dyn FixSink>,
) -> anyhow::Result<()> {
    let settings = config.connection().context("incomplete configuration")?;
    let decoder = NmeaDecoder::new(sink, config.stale_timeout());
    let monitor = GpsMonitor::new(source, settings, decoder);

    monitor
        .start()
        .await
        .with_context(|| format!("starting GPS source on {}", monitor.settings().port))?;

    tracing::info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;

    monitor.stop().await;
    match tokio::time::timeout(CLOSE_TIMEOUT, monitor.wait_closed()).await {
        Ok(Some(CloseOutcome::Released)) | Ok(None) => {
            tracing::info!("Shutting down...");
            Ok(())
        }
        Ok(Some(CloseOutcome::Failed(msg))) => bail!("GPS source did not close cleanly: {}", msg),
        Ok(Some(CloseOutcome::Cancelled)) => bail!("GPS source close was cancelled"),
        Err(_) => bail!("timed out waiting for the GPS source to close"),
    }
}
