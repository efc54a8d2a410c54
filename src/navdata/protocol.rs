//! # NavData Protocol Constants and Types
//!
//! Layout of the binary telemetry datagram (all fields little-endian):
//!
//! ```text
//! +--------+--------+----------+----------------+------------------------------+
//! | magic  | status | sequence | vision_defined | (tag u16, size u16, payload)* |
//! | u32    | u32    | u32      | u32            |                              |
//! +--------+--------+----------+----------------+------------------------------+
//! ```
//!
//! `size` counts the 4-byte record header. The checksum record (tag
//! `0xFFFF`) is always last and holds the byte sum of everything before it.

use super::status::StatusFlags;

/// Device telemetry UDP port
pub const NAVDATA_PORT: u16 = 5554;

/// Datagram sent to the telemetry port to start the stream
pub const NAVDATA_WAKE_UP: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Fixed header size (4 × u32)
pub const NAVDATA_HEADER_SIZE: usize = 16;

/// Record header size (tag u16 + size u16)
pub const NAVDATA_RECORD_HEADER_SIZE: usize = 4;

/// Checksum record size (header + u32), excluded from the checksum sum
pub const NAVDATA_CHECKSUM_RECORD_SIZE: usize = 8;

/// Demo record: attitude, altitude, velocity, battery
pub const NAVDATA_TAG_DEMO: u16 = 0;

/// Vision detection record: up to four tags
pub const NAVDATA_TAG_VISION_DETECT: u16 = 16;

/// Checksum record
pub const NAVDATA_TAG_CHECKSUM: u16 = 0xFFFF;

/// Demo payload size after the record header (10 × 4 bytes)
pub const NAVDATA_DEMO_PAYLOAD_SIZE: usize = 40;

/// Vision detect payload size after the record header (29 × 4 bytes)
pub const NAVDATA_VISION_DETECT_PAYLOAD_SIZE: usize = 116;

/// Checksum payload size after the record header
pub const NAVDATA_CHECKSUM_PAYLOAD_SIZE: usize = 4;

/// Maximum number of vision tags per datagram
pub const MAX_VISION_TAGS: usize = 4;

/// Vision coordinates are reported in a 1000×1000 space
pub const VISION_SCALE_X: f64 = 320.0 / 1000.0;
/// Vision coordinates are reported in a 1000×1000 space
pub const VISION_SCALE_Y: f64 = 240.0 / 1000.0;

/// Datagram header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavDataHeader {
    /// Protocol magic (not validated)
    pub magic: u32,

    /// Raw status bitmask
    pub status: u32,

    /// Sequence number, restarts at 1 when the device restarts its counter
    pub sequence: u32,

    /// Non-zero when vision data is defined
    pub vision_defined: u32,
}

/// Raw demo record
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DemoData {
    /// Control state of the flight controller
    pub control_state: u32,

    /// Battery level (0-100%)
    pub battery_percentage: u32,

    /// Pitch in millidegrees
    pub theta: f32,

    /// Roll in millidegrees
    pub phi: f32,

    /// Yaw in millidegrees
    pub psi: f32,

    /// Altitude in millimeters
    pub altitude_mm: i32,

    /// Velocity X in mm/s
    pub velocity_x: f32,

    /// Velocity Y in mm/s
    pub velocity_y: f32,

    /// Velocity Z in mm/s
    pub velocity_z: f32,

    /// Index of the last encoded video frame
    pub last_frame_index: u32,
}

/// Decoded attitude/altitude/battery sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySample {
    /// Battery level (0-100%)
    pub battery_percentage: u32,

    /// Altitude in meters
    pub altitude: f32,

    /// Pitch in millidegrees
    pub pitch: f32,

    /// Roll in millidegrees
    pub roll: f32,

    /// Yaw in millidegrees
    pub yaw: f32,
}

impl From<&DemoData> for TelemetrySample {
    fn from(demo: &DemoData) -> Self {
        Self {
            battery_percentage: demo.battery_percentage,
            altitude: demo.altitude_mm as f32 / 1000.0,
            pitch: demo.theta,
            roll: demo.phi,
            yaw: demo.psi,
        }
    }
}

/// A detected visual marker, scaled to a 320×240 viewport
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VisionTag {
    pub tag_type: u32,
    pub center_x: u32,
    pub center_y: u32,
    pub box_left: u32,
    pub box_top: u32,
    pub box_width: u32,
    pub box_height: u32,
    /// Distance in meters
    pub distance: f64,
    pub orientation_angle: f32,
}

impl VisionTag {
    /// Scale raw detection values (1000×1000 space, distance in mm)
    pub fn from_raw(
        tag_type: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        distance_mm: u32,
        orientation_angle: f32,
    ) -> Self {
        let (x, y, width, height) = (x as f64, y as f64, width as f64, height as f64);

        // Float to int casts saturate, so a box hanging off the left edge clamps to 0
        Self {
            tag_type,
            center_x: (x * VISION_SCALE_X) as u32,
            center_y: (y * VISION_SCALE_Y) as u32,
            box_left: ((x - width / 2.0) * VISION_SCALE_X) as u32,
            box_top: ((y - height / 2.0) * VISION_SCALE_Y) as u32,
            box_width: (width * VISION_SCALE_X) as u32,
            box_height: (height * VISION_SCALE_Y) as u32,
            distance: distance_mm as f64 / 1000.0,
            orientation_angle,
        }
    }
}

/// One decoded telemetry datagram
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavData {
    pub header: NavDataHeader,

    /// Demo record, if present
    pub demo: Option<DemoData>,

    /// Detected tags (0-4)
    pub vision_tags: Vec<VisionTag>,

    /// Transmitted checksum, if the checksum record was reached
    pub checksum: Option<u32>,

    /// True only when a checksum record was present and matched
    pub contains_valid_data: bool,
}

impl NavData {
    /// Status snapshot of this datagram
    pub fn status(&self) -> StatusFlags {
        StatusFlags::new(self.header.status)
    }

    /// Sequence number of this datagram
    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    /// Telemetry sample derived from the demo record
    pub fn sample(&self) -> Option<TelemetrySample> {
        self.demo.as_ref().map(TelemetrySample::from)
    }
}
