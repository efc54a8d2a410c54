//! # Device Configuration Entries
//!
//! Key/value pairs negotiated with `AT*CONFIG`. Typed constructors convert
//! user units to device units and clamp them to the ranges the device
//! accepts.

use std::f32::consts::PI;
use std::fmt;

/// Fixed multi-configuration session id
pub const SESSION_ID: u32 = 0x000a_bcde;

/// MAC sent when the owner MAC is cleared
pub const NO_OWNER_MAC: &str = "00:00:00:00:00:00";

/// Camera selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoChannel {
    Horizontal = 0,
    Vertical,
    VerticalInHorizontal,
    HorizontalInVertical,
    Next,
}

/// Video codec selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    Null = 0,
    Uvlc = 32,
    P264 = 64,
}

/// Video bitrate control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateControl {
    Disabled,
    Dynamic,
    /// Fixed frame size, sent as `video:bitrate`
    Manual(u32),
}

impl BitrateControl {
    fn mode(self) -> u32 {
        match self {
            BitrateControl::Disabled => 0,
            BitrateControl::Dynamic => 1,
            BitrateControl::Manual(_) => 2,
        }
    }
}

/// Hull colors the vision detection looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyColor {
    OrangeGreen = 1,
    OrangeYellow = 2,
    OrangeBlue = 3,
    ArraceFinishLine = 16,
    ArraceDonut = 17,
}

/// Vision detection modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionType {
    VisionDetect = 2,
    None,
    Cocarde,
    OrientedCocarde,
    Stripe,
    HCocarde,
    HOrientedCocarde,
    StripeV,
    Multiple,
}

/// One configuration key/value pair awaiting acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    /// Preceded by `AT*CONFIG_IDS` when multi-configuration ids are set
    pub multi: bool,
}

impl ConfigEntry {
    /// Multi-configuration entry
    pub fn new(key: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
            multi: true,
        }
    }

    /// Entry sent without `AT*CONFIG_IDS`
    pub fn single(key: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            multi: false,
            ..Self::new(key, value)
        }
    }

    /// Boolean entry, sent as `TRUE`/`FALSE`
    pub fn flag(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, if value { "TRUE" } else { "FALSE" })
    }

    pub fn drone_name(name: &str) -> Self {
        Self::new("general:ardrone_name", name)
    }

    /// Reduced telemetry (demo record only)
    pub fn navdata_demo() -> Self {
        Self::flag("general:navdata_demo", true)
    }

    pub fn outdoor(value: bool) -> Self {
        Self::flag("control:outdoor", value)
    }

    pub fn flight_without_shell(value: bool) -> Self {
        Self::flag("control:flight_without_shell", value)
    }

    /// Combined yaw control level
    pub fn combined_yaw() -> Self {
        Self::new("control:control_level", 3)
    }

    /// Maximum bending angle in degrees, sent in radians (0..0.52)
    pub fn euler_angle_max(degrees: f32) -> Self {
        Self::new("control:euler_angle_max", (degrees * PI / 180.0).clamp(0.0, 0.52))
    }

    /// Maximum vertical speed in m/s, sent in mm/s (200..2000)
    pub fn max_vertical_speed(meters_per_second: f32) -> Self {
        Self::new("control:control_vz_max", to_device_int(meters_per_second * 1000.0, 200.0, 2000.0))
    }

    /// Maximum yaw speed in degrees/s, sent in radians/s (0.7..6.1)
    pub fn yaw_speed(degrees_per_second: f32) -> Self {
        Self::new("control:control_yaw", (degrees_per_second * PI / 180.0).clamp(0.7, 6.1))
    }

    /// Altitude limit in meters, sent in millimeters (500..10000)
    pub fn altitude_max(meters: f32) -> Self {
        Self::new("control:altitude_max", to_device_int(meters * 1000.0, 500.0, 10000.0))
    }

    pub fn single_player_ssid(ssid: &str) -> Self {
        Self::new("network:ssid_single_player", ssid)
    }

    /// Pair the device with a MAC; empty unpairs
    pub fn owner_mac(mac: &str) -> Self {
        Self::new("network:owner_mac", if mac.is_empty() { NO_OWNER_MAC } else { mac })
    }

    pub fn video_channel(channel: VideoChannel) -> Self {
        Self::new("video:video_channel", channel as u32)
    }

    pub fn video_codec(codec: VideoCodec) -> Self {
        Self::new("video:video_codec", codec as u32)
    }

    /// Bitrate mode, followed by the frame size in manual mode
    pub fn bitrate_control(control: BitrateControl) -> Vec<Self> {
        let mut entries = vec![Self::new("video:bitrate_ctrl_mode", control.mode())];
        if let BitrateControl::Manual(frame_size) = control {
            entries.push(Self::new("video:bitrate", frame_size));
        }
        entries
    }

    pub fn enemy_colors(color: EnemyColor) -> Self {
        Self::new("detect:enemy_colors", color as u32)
    }

    /// Sent as `1`/`0`
    pub fn detection_without_shell(value: bool) -> Self {
        Self::new("detect:enemy_without_shell", u8::from(value))
    }

    pub fn detection_type(detection: DetectionType) -> Self {
        Self::new("detect:detect_type", detection as u32)
    }

    /// Session, profile and application entries for a multi-configuration
    pub fn multi_configuration(ids: &ConfigIds) -> [Self; 3] {
        [
            Self::single("custom:session_id", hex_id(ids.session)),
            Self::single("custom:profile_id", hex_id(ids.profile)),
            Self::single("custom:application_id", hex_id(ids.application)),
        ]
    }
}

/// Multi-configuration identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigIds {
    pub session: u32,
    pub profile: u32,
    pub application: u32,
}

impl ConfigIds {
    /// Derive ids from application and user names
    pub fn from_names(application: &str, user: &str) -> Self {
        Self {
            session: SESSION_ID,
            profile: super::crc::name_id(user),
            application: super::crc::name_id(application),
        }
    }

    /// True when a profile or application id is set
    pub fn is_active(&self) -> bool {
        self.profile != 0 || self.application != 0
    }
}

/// Format an id as 8 lowercase hex digits
pub fn hex_id(id: u32) -> String {
    format!("{:08x}", id)
}

/// Clamp, then round half to even
fn to_device_int(value: f32, min: f32, max: f32) -> i32 {
    value.clamp(min, max).round_ties_even() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert_eq!(ConfigEntry::outdoor(true).value, "TRUE");
        assert_eq!(ConfigEntry::flight_without_shell(false).value, "FALSE");
        assert_eq!(ConfigEntry::navdata_demo().key, "general:navdata_demo");
        assert!(ConfigEntry::outdoor(true).multi);
    }

    #[test]
    fn test_euler_angle_clamped() {
        assert_eq!(ConfigEntry::euler_angle_max(90.0).value, "0.52");
        assert_eq!(ConfigEntry::euler_angle_max(-5.0).value, "0");

        let value: f32 = ConfigEntry::euler_angle_max(12.0).value.parse().unwrap();
        assert!((value - 12.0f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_vertical_speed_in_mm() {
        assert_eq!(ConfigEntry::max_vertical_speed(0.7).value, "700");
        assert_eq!(ConfigEntry::max_vertical_speed(0.01).value, "200");
        assert_eq!(ConfigEntry::max_vertical_speed(5.0).value, "2000");
    }

    #[test]
    fn test_yaw_speed_clamped() {
        assert_eq!(ConfigEntry::yaw_speed(1.0).value, "0.7");
        assert_eq!(ConfigEntry::yaw_speed(1000.0).value, "6.1");
    }

    #[test]
    fn test_altitude_in_mm() {
        assert_eq!(ConfigEntry::altitude_max(3.0).value, "3000");
        assert_eq!(ConfigEntry::altitude_max(0.0).value, "500");
        assert_eq!(ConfigEntry::altitude_max(100.0).value, "10000");
    }

    #[test]
    fn test_owner_mac_default() {
        assert_eq!(ConfigEntry::owner_mac("").value, NO_OWNER_MAC);
        assert_eq!(ConfigEntry::owner_mac("aa:bb:cc:dd:ee:ff").value, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_enum_values() {
        assert_eq!(ConfigEntry::video_codec(VideoCodec::Uvlc).value, "32");
        assert_eq!(ConfigEntry::video_codec(VideoCodec::P264).value, "64");
        assert_eq!(ConfigEntry::video_channel(VideoChannel::Next).value, "4");
        assert_eq!(ConfigEntry::enemy_colors(EnemyColor::ArraceDonut).value, "17");
        assert_eq!(ConfigEntry::detection_type(DetectionType::Multiple).value, "10");
        assert_eq!(ConfigEntry::detection_without_shell(true).value, "1");
        assert_eq!(ConfigEntry::combined_yaw().value, "3");
    }

    #[test]
    fn test_bitrate_control() {
        let entries = ConfigEntry::bitrate_control(BitrateControl::Dynamic);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, "1");

        let entries = ConfigEntry::bitrate_control(BitrateControl::Manual(4000));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, "2");
        assert_eq!(entries[1].key, "video:bitrate");
        assert_eq!(entries[1].value, "4000");
    }

    #[test]
    fn test_multi_configuration() {
        let ids = ConfigIds::from_names("123456789", "");
        assert_eq!(ids.session, SESSION_ID);
        assert_eq!(ids.profile, 0);
        assert_eq!(ids.application, 0xCBF4_3926);
        assert!(ids.is_active());

        let entries = ConfigEntry::multi_configuration(&ids);
        assert_eq!(entries[0].key, "custom:session_id");
        assert_eq!(entries[0].value, "000abcde");
        assert_eq!(entries[1].value, "00000000");
        assert_eq!(entries[2].value, "cbf43926");
        assert!(entries.iter().all(|entry| !entry.multi));
    }

    #[test]
    fn test_empty_names_are_inactive() {
        assert!(!ConfigIds::from_names("", "").is_active());
        assert!(!ConfigIds::default().is_active());
    }
}
