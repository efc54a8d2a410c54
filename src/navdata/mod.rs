//! # NavData Telemetry Module
//!
//! Decoding of the binary telemetry stream.
//!
//! ## Modules
//!
//! - `protocol` - Datagram layout, record tags and decoded types
//! - `status` - Status word flags and edge events
//! - `decoder` - Datagram parser with checksum validation
//! - `sequence` - Burst and duplicate filtering

pub mod decoder;
pub mod protocol;
pub mod sequence;
pub mod status;

pub use decoder::{decode_navdata, navdata_checksum};
pub use protocol::{NavData, TelemetrySample, VisionTag};
pub use sequence::SequenceGuard;
pub use status::{StatusFlags, StatusTransition};
