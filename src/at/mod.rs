//! # AT Command Module
//!
//! Text command protocol of the device command port.
//!
//! ## Modules
//!
//! - `command` - Command kinds and line encoding
//! - `config` - Configuration entries and multi-configuration ids
//! - `crc` - CRC-32 for configuration ids

pub mod command;
pub mod config;
pub mod crc;

pub use command::{AtCommand, AtCommandKind, ControlMode, FlightAnimation, LedAnimation};
pub use config::{ConfigEntry, ConfigIds};
