//! # Error Types
//!
//! Custom error types for ARDrone Link using `thiserror`.

use thiserror::Error;

/// Main error type for ARDrone Link
#[derive(Debug, Error)]
pub enum DroneError {
    /// Operation needs an active connection to the drone
    #[error("Drone is not connected")]
    NotConnected,

    /// An emergency handshake is already running
    #[error("Command in progress")]
    CommandInProgress,

    /// Header too short, truncated record or size overflow
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// NavData parsed but the transmitted checksum does not match
    #[error("Checksum mismatch: expected 0x{expected:08X}, computed 0x{computed:08X}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    /// Stale sequence number
    #[error("Duplicate packet (sequence {0})")]
    DuplicatePacket(u32),

    /// Packet arrived inside the burst window of the previous one
    #[error("Burst packet dropped")]
    BurstPacket,

    /// Video bitstream could not be decoded into a picture
    #[error("Video decode error: {0}")]
    Video(String),

    /// Socket-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// No data within the configured timeout
    #[error("Transport timeout: {0}")]
    TransportTimeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ARDrone Link
pub type Result<T> = std::result::Result<T, DroneError>;
