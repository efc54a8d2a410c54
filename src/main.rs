//! # ARDrone Link
//!
//! Connects to a drone, negotiates the reduced telemetry configuration and
//! logs status, telemetry and configuration events until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! ardrone-link [config.toml]
//! ```
//!
//! Without an argument the built-in defaults are used. Log verbosity follows
//! `RUST_LOG` (default INFO).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use ardrone_link::at::config::ConfigEntry;
use ardrone_link::{Config, DroneEvent, DroneLink};

/// Number of decoded pictures between frame log messages
const FRAME_LOG_INTERVAL: u64 = 100;

fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("Failed to load configuration from {}", path)),
        None => Ok(Config::default()),
    }
}

fn log_event(event: &DroneEvent<'_>, frames: &AtomicU64) {
    match event {
        DroneEvent::Connected => info!("Drone connected"),
        DroneEvent::Transition(transition) => info!("Drone status: {:?}", transition),
        DroneEvent::Telemetry(sample) => info!(
            "Battery {}% altitude {:.2} m pitch {:.0} roll {:.0} yaw {:.0}",
            sample.battery_percentage, sample.altitude, sample.pitch, sample.roll, sample.yaw
        ),
        DroneEvent::VisionDetect(tags) => info!("{} vision tag(s) detected", tags.len()),
        DroneEvent::ConfigurationComplete => info!("Configuration complete"),
        DroneEvent::Frame(frame) => {
            let count = frames.fetch_add(1, Ordering::Relaxed) + 1;
            if count % FRAME_LOG_INTERVAL == 0 {
                info!("Decoded {} frames ({}x{})", count, frame.width, frame.height);
            }
        }
        DroneEvent::CommunicationFailure => warn!("Communication with drone lost"),
        DroneEvent::Status(_) | DroneEvent::ConfigLine(_) => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("ARDrone Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let mut link = DroneLink::new(config);

    let frames = Arc::new(AtomicU64::new(0));
    link.subscribe(move |event| log_event(event, &frames));

    link.connect().await.context("Failed to connect to drone")?;
    link.configure(ConfigEntry::navdata_demo())?;
    info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");

    if link.is_connected() {
        match link.land() {
            // Let a few batches carry the cleared takeoff bit
            Ok(()) => tokio::time::sleep(link.config().control.send_interval() * 3).await,
            Err(e) => warn!("Landing request failed: {}", e),
        }
    }
    link.disconnect().await;

    Ok(())
}
