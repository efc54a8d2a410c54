//! # Drone Status Flags
//!
//! Named view over the 32-bit status word carried in every NavData header,
//! plus edge detection between two consecutive snapshots.

/// Status bit masks
pub mod mask {
    pub const FLY: u32 = 1 << 0;
    pub const VIDEO: u32 = 1 << 1;
    pub const VISION: u32 = 1 << 2;
    pub const CONTROL: u32 = 1 << 3;
    pub const ALTITUDE: u32 = 1 << 4;
    pub const USER_FEEDBACK_START: u32 = 1 << 5;
    pub const COMMAND: u32 = 1 << 6;
    pub const TRIM_COMMAND: u32 = 1 << 7;
    pub const TRIM_RUNNING: u32 = 1 << 8;
    pub const TRIM_RESULT: u32 = 1 << 9;
    pub const NAVDATA_DEMO: u32 = 1 << 10;
    pub const NAVDATA_BOOTSTRAP: u32 = 1 << 11;
    pub const MOTORS_BRUSHED: u32 = 1 << 12;
    pub const COM_LOST: u32 = 1 << 13;
    pub const GYROS_ZERO: u32 = 1 << 14;
    pub const VBAT_LOW: u32 = 1 << 15;
    pub const VBAT_HIGH: u32 = 1 << 16;
    pub const TIMER_ELAPSED: u32 = 1 << 17;
    pub const NOT_ENOUGH_POWER: u32 = 1 << 18;
    pub const ANGLES_OUT_OF_RANGE: u32 = 1 << 19;
    pub const WIND: u32 = 1 << 20;
    pub const ULTRASOUND: u32 = 1 << 21;
    pub const CUTOUT: u32 = 1 << 22;
    pub const PIC_VERSION: u32 = 1 << 23;
    pub const ATCODEC_THREAD_ON: u32 = 1 << 24;
    pub const NAVDATA_THREAD_ON: u32 = 1 << 25;
    pub const VIDEO_THREAD_ON: u32 = 1 << 26;
    pub const ACQ_THREAD_ON: u32 = 1 << 27;
    pub const CTRL_WATCHDOG: u32 = 1 << 28;
    pub const ADC_WATCHDOG: u32 = 1 << 29;
    pub const COM_WATCHDOG: u32 = 1 << 30;
    pub const EMERGENCY: u32 = 1 << 31;
}

/// Immutable snapshot of the device status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags(u32);

/// Edge-triggered status events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// Flight flag went high
    Takeoff,
    /// Flight flag went low
    Land,
    TooMuchWind,
    AnglesOutOfRange,
    BatteryLow,
    SystemCutout,
    /// Ultrasound or gyro problem went high
    SensorFailure,
}

impl StatusFlags {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw status word
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Check if all bits of `mask` are set
    pub fn has(&self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    pub fn flight_enabled(&self) -> bool { self.has(mask::FLY) }
    pub fn video_enabled(&self) -> bool { self.has(mask::VIDEO) }
    pub fn vision_enabled(&self) -> bool { self.has(mask::VISION) }
    pub fn angular_speed_control(&self) -> bool { self.has(mask::CONTROL) }
    pub fn altitude_control(&self) -> bool { self.has(mask::ALTITUDE) }
    pub fn start_button(&self) -> bool { self.has(mask::USER_FEEDBACK_START) }
    pub fn command_received(&self) -> bool { self.has(mask::COMMAND) }
    pub fn flat_trim_received(&self) -> bool { self.has(mask::TRIM_COMMAND) }
    pub fn flat_trim_running(&self) -> bool { self.has(mask::TRIM_RUNNING) }
    pub fn flat_trim_succeeded(&self) -> bool { self.has(mask::TRIM_RESULT) }
    pub fn navdata_demo(&self) -> bool { self.has(mask::NAVDATA_DEMO) }
    pub fn bootstrap(&self) -> bool { self.has(mask::NAVDATA_BOOTSTRAP) }
    pub fn brushed_motors(&self) -> bool { self.has(mask::MOTORS_BRUSHED) }
    pub fn communication_lost(&self) -> bool { self.has(mask::COM_LOST) }
    pub fn gyros_problem(&self) -> bool { self.has(mask::GYROS_ZERO) }
    pub fn battery_low(&self) -> bool { self.has(mask::VBAT_LOW) }
    pub fn battery_high(&self) -> bool { self.has(mask::VBAT_HIGH) }
    pub fn timer_elapsed(&self) -> bool { self.has(mask::TIMER_ELAPSED) }
    pub fn insufficient_power(&self) -> bool { self.has(mask::NOT_ENOUGH_POWER) }
    pub fn angles_out_of_range(&self) -> bool { self.has(mask::ANGLES_OUT_OF_RANGE) }
    pub fn too_much_wind(&self) -> bool { self.has(mask::WIND) }
    pub fn ultrasound_problem(&self) -> bool { self.has(mask::ULTRASOUND) }
    pub fn system_cutout(&self) -> bool { self.has(mask::CUTOUT) }
    pub fn pic_version_ok(&self) -> bool { self.has(mask::PIC_VERSION) }
    pub fn at_codec_thread(&self) -> bool { self.has(mask::ATCODEC_THREAD_ON) }
    pub fn navdata_thread(&self) -> bool { self.has(mask::NAVDATA_THREAD_ON) }
    pub fn video_thread(&self) -> bool { self.has(mask::VIDEO_THREAD_ON) }
    pub fn acquisition_thread(&self) -> bool { self.has(mask::ACQ_THREAD_ON) }
    pub fn control_watchdog(&self) -> bool { self.has(mask::CTRL_WATCHDOG) }
    pub fn adc_watchdog(&self) -> bool { self.has(mask::ADC_WATCHDOG) }
    pub fn com_watchdog(&self) -> bool { self.has(mask::COM_WATCHDOG) }
    pub fn has_emergency(&self) -> bool { self.has(mask::EMERGENCY) }

    /// Bits that differ from `previous`
    pub fn toggled(&self, previous: &StatusFlags) -> StatusFlags {
        StatusFlags(self.0 ^ previous.0)
    }

    /// True when `mask` is set now and was clear in `previous`
    pub fn rose(&self, previous: &StatusFlags, mask: u32) -> bool {
        self.has(mask) && self.toggled(previous).has(mask)
    }

    /// Edge events between `previous` and this snapshot, in a fixed order
    pub fn transitions(&self, previous: &StatusFlags) -> Vec<StatusTransition> {
        let toggled = self.toggled(previous);
        let mut events = Vec::new();

        if toggled.flight_enabled() {
            if self.flight_enabled() {
                events.push(StatusTransition::Takeoff);
            } else {
                events.push(StatusTransition::Land);
            }
        }
        if self.rose(previous, mask::WIND) {
            events.push(StatusTransition::TooMuchWind);
        }
        if self.rose(previous, mask::ANGLES_OUT_OF_RANGE) {
            events.push(StatusTransition::AnglesOutOfRange);
        }
        if self.rose(previous, mask::VBAT_LOW) {
            events.push(StatusTransition::BatteryLow);
        }
        if self.rose(previous, mask::CUTOUT) {
            events.push(StatusTransition::SystemCutout);
        }
        if self.rose(previous, mask::ULTRASOUND) || self.rose(previous, mask::GYROS_ZERO) {
            events.push(StatusTransition::SensorFailure);
        }

        events
    }
}

impl From<u32> for StatusFlags {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
