//! # Flight Input
//!
//! Stick input source and the `AT*REF` input bitmask.

/// Bits 18, 20, 22, 24 and 28 must always be set
pub const INPUT_BASE: u32 = 0x1154_0000;

/// Emergency bit of the input bitmask
pub const INPUT_EMERGENCY: u32 = 0x0000_0100;

/// Takeoff bit of the input bitmask (clear means land)
pub const INPUT_TAKEOFF: u32 = 0x0000_0200;

/// Source of progressive flight input, each axis in [-1, 1]
///
/// Sampled by the sender loop on every tick while the takeoff bit is set.
/// Out-of-range values are clamped.
#[cfg_attr(test, mockall::automock)]
pub trait FlightInput: Send + Sync {
    /// Left/right bank
    fn roll(&self) -> f32;

    /// Front/back tilt
    fn pitch(&self) -> f32;

    /// Rotation around the vertical axis
    fn yaw(&self) -> f32;

    /// Vertical speed
    fn gaz(&self) -> f32;
}

/// Fixed input, useful for scripted flights
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StaticInput {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub gaz: f32,
}

impl FlightInput for StaticInput {
    fn roll(&self) -> f32 {
        self.roll
    }

    fn pitch(&self) -> f32 {
        self.pitch
    }

    fn yaw(&self) -> f32 {
        self.yaw
    }

    fn gaz(&self) -> f32 {
        self.gaz
    }
}
