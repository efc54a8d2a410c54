//! # ARDrone Link Library
//!
//! Command, telemetry and video link for Wi-Fi quadcopters speaking the
//! AT command, NavData and UVLC protocols.
//!
//! The library provides:
//! - AT command encoding and the configuration handshake (`at`, `engine`)
//! - NavData telemetry decoding with replay filtering (`navdata`)
//! - UVLC picture decoding and PaVE reassembly (`video`)
//! - An async driver running it all over UDP/TCP (`link`)

pub mod at;
pub mod bitstream;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod link;
pub mod navdata;
pub mod transport;
pub mod video;

pub use config::Config;
pub use error::{DroneError, Result};
pub use events::DroneEvent;
pub use link::DroneLink;
