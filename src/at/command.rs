//! # AT Command Encoding
//!
//! Text commands sent to the command port. Each command is one line
//! terminated by `\r` and carries a sequence number as its first argument.
//! Float arguments are sent as the signed 32-bit integer with the same bit
//! pattern as the IEEE-754 value.

use std::fmt;

/// Device command UDP port
pub const COMMAND_PORT: u16 = 5556;

/// Control modes for `AT*CTRL`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    NoControl = 0,
    SoftwareUpdate = 1,
    PicUpdate = 2,
    GetLogs = 3,
    /// Ask the device to send its active configuration
    GetConfiguration = 4,
    /// Reset the command-received flag in telemetry
    Acknowledge = 5,
}

/// LED patterns for `AT*LED`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedAnimation {
    BlinkGreenRed = 0,
    BlinkGreen,
    BlinkRed,
    BlinkOrange,
    SnakeGreenRed,
    Fire,
    Standard,
    Red,
    Green,
    RedSnake,
    Blank,
    RightMissile,
    LeftMissile,
    DoubleMissile,
}

/// Flight figures for `AT*ANIM`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightAnimation {
    PhiM30Deg = 0,
    Phi30Deg,
    ThetaM30Deg,
    Theta30Deg,
    Theta20DegYaw200Deg,
    Theta20DegYawM200Deg,
    Turnaround,
    TurnaroundGoDown,
    YawShake,
    YawDance,
    PhiDance,
    ThetaDance,
    VzDance,
    Wave,
    PhiThetaMixed,
    DoublePhiThetaMixed,
}

/// Shortest and longest animation duration in seconds
pub const ANIMATION_SECONDS_MIN: u32 = 1;
pub const ANIMATION_SECONDS_MAX: u32 = 10;

/// Round a duration to whole seconds and clamp it to the animation range
pub fn animation_seconds(duration: std::time::Duration) -> u32 {
    let seconds = duration.as_secs_f64().round_ties_even();
    (seconds as u32).clamp(ANIMATION_SECONDS_MIN, ANIMATION_SECONDS_MAX)
}

/// Payload of one AT command
#[derive(Debug, Clone, PartialEq)]
pub enum AtCommandKind {
    /// `AT*REF`: takeoff/land/emergency input bitmask
    Ref { input: u32 },
    /// `AT*PCMD`: progressive flight input, each axis in [-1, 1]
    Pcmd {
        progressive: bool,
        roll: f32,
        pitch: f32,
        gaz: f32,
        yaw: f32,
    },
    /// `AT*CONFIG`
    Config { key: String, value: String },
    /// `AT*CONFIG_IDS`: multi-configuration identifiers, 8 hex digits each
    ConfigIds {
        session: String,
        profile: String,
        application: String,
    },
    /// `AT*CTRL`
    Ctrl { mode: ControlMode },
    /// `AT*COMWDG`: reset the communication watchdog
    ComWdg,
    /// `AT*FTRIM`: flat trim
    FTrim,
    /// `AT*LED`
    Led {
        animation: u32,
        frequency: f32,
        seconds: u32,
    },
    /// `AT*ANIM`
    Anim { animation: u32, seconds: u32 },
}

impl AtCommandKind {
    /// Hover in place: all axes zero, progressive flag off
    pub fn hover() -> Self {
        AtCommandKind::Pcmd {
            progressive: false,
            roll: 0.0,
            pitch: 0.0,
            gaz: 0.0,
            yaw: 0.0,
        }
    }

    /// Progressive input with every axis clamped to [-1, 1]
    pub fn progressive(roll: f32, pitch: f32, gaz: f32, yaw: f32) -> Self {
        AtCommandKind::Pcmd {
            progressive: true,
            roll: clamp_axis(roll),
            pitch: clamp_axis(pitch),
            gaz: clamp_axis(gaz),
            yaw: clamp_axis(yaw),
        }
    }
}

/// One sequenced AT command
#[derive(Debug, Clone, PartialEq)]
pub struct AtCommand {
    pub sequence: u32,
    pub kind: AtCommandKind,
}

impl AtCommand {
    pub fn new(sequence: u32, kind: AtCommandKind) -> Self {
        Self { sequence, kind }
    }

    /// Encode as one `\r`-terminated line
    ///
    /// # Examples
    ///
    /// ```
    /// use ardrone_link::at::command::{AtCommand, AtCommandKind};
    ///
    /// let command = AtCommand::new(7, AtCommandKind::Ref { input: 0x1154_0200 });
    /// assert_eq!(command.encode(), "AT*REF=7,290718208\r");
    /// ```
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seq = self.sequence;

        match &self.kind {
            AtCommandKind::Ref { input } => write!(f, "AT*REF={},{}\r", seq, input),
            AtCommandKind::Pcmd {
                progressive,
                roll,
                pitch,
                gaz,
                yaw,
            } => write!(
                f,
                "AT*PCMD={},{},{},{},{},{}\r",
                seq,
                u8::from(*progressive),
                float_bits(*roll),
                float_bits(*pitch),
                float_bits(*gaz),
                float_bits(*yaw)
            ),
            AtCommandKind::Config { key, value } => {
                write!(f, "AT*CONFIG={},\"{}\",\"{}\"\r", seq, key, value)
            }
            AtCommandKind::ConfigIds {
                session,
                profile,
                application,
            } => write!(
                f,
                "AT*CONFIG_IDS={},\"{}\",\"{}\",\"{}\"\r",
                seq, session, profile, application
            ),
            AtCommandKind::Ctrl { mode } => write!(f, "AT*CTRL={},{},0\r", seq, *mode as u32),
            AtCommandKind::ComWdg => write!(f, "AT*COMWDG={}\r", seq),
            AtCommandKind::FTrim => write!(f, "AT*FTRIM={}\r", seq),
            AtCommandKind::Led {
                animation,
                frequency,
                seconds,
            } => write!(
                f,
                "AT*LED={},{},{},{}\r",
                seq,
                animation,
                float_bits(*frequency),
                seconds
            ),
            AtCommandKind::Anim { animation, seconds } => {
                write!(f, "AT*ANIM={},{},{}\r", seq, animation, seconds)
            }
        }
    }
}

/// IEEE-754 bit pattern of `value` as a signed integer
pub fn float_bits(value: f32) -> i32 {
    value.to_bits() as i32
}

fn clamp_axis(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

/// Concatenate encoded commands into one datagram payload
pub fn encode_batch<'a>(commands: impl IntoIterator<Item = &'a AtCommand>) -> String {
    commands.into_iter().map(AtCommand::encode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(kind: AtCommandKind) -> String {
        AtCommand::new(3, kind).encode()
    }

    #[test]
    fn test_ref() {
        assert_eq!(encode(AtCommandKind::Ref { input: 0x1154_0000 }), "AT*REF=3,290717696\r");
    }

    #[test]
    fn test_pcmd_float_bits() {
        let line = encode(AtCommandKind::progressive(-0.8, 0.5, 0.0, 1.0));
        assert_eq!(line, "AT*PCMD=3,1,-1085485875,1056964608,0,1065353216\r");
    }

    #[test]
    fn test_pcmd_clamps_axes() {
        let line = encode(AtCommandKind::progressive(-3.0, 2.0, 0.0, 0.0));
        assert_eq!(line, "AT*PCMD=3,1,-1082130432,1065353216,0,0\r");
    }

    #[test]
    fn test_hover() {
        assert_eq!(encode(AtCommandKind::hover()), "AT*PCMD=3,0,0,0,0,0\r");
    }

    #[test]
    fn test_config_lines() {
        assert_eq!(
            encode(AtCommandKind::Config {
                key: "control:outdoor".to_string(),
                value: "TRUE".to_string()
            }),
            "AT*CONFIG=3,\"control:outdoor\",\"TRUE\"\r"
        );
        assert_eq!(
            encode(AtCommandKind::ConfigIds {
                session: "000abcde".to_string(),
                profile: "00000000".to_string(),
                application: "cbf43926".to_string()
            }),
            "AT*CONFIG_IDS=3,\"000abcde\",\"00000000\",\"cbf43926\"\r"
        );
    }

    #[test]
    fn test_short_commands() {
        assert_eq!(encode(AtCommandKind::Ctrl { mode: ControlMode::Acknowledge }), "AT*CTRL=3,5,0\r");
        assert_eq!(encode(AtCommandKind::Ctrl { mode: ControlMode::GetConfiguration }), "AT*CTRL=3,4,0\r");
        assert_eq!(encode(AtCommandKind::ComWdg), "AT*COMWDG=3\r");
        assert_eq!(encode(AtCommandKind::FTrim), "AT*FTRIM=3\r");
    }

    #[test]
    fn test_animations() {
        assert_eq!(
            encode(AtCommandKind::Led { animation: 1, frequency: 2.0, seconds: 3 }),
            "AT*LED=3,1,1073741824,3\r"
        );
        assert_eq!(encode(AtCommandKind::Anim { animation: 6, seconds: 5 }), "AT*ANIM=3,6,5\r");
    }

    #[test]
    fn test_animation_seconds() {
        use std::time::Duration;

        assert_eq!(animation_seconds(Duration::ZERO), 1);
        assert_eq!(animation_seconds(Duration::from_millis(2500)), 2);
        assert_eq!(animation_seconds(Duration::from_millis(3500)), 4);
        assert_eq!(animation_seconds(Duration::from_secs(60)), 10);
        assert_eq!(LedAnimation::DoubleMissile as u32, 13);
        assert_eq!(FlightAnimation::DoublePhiThetaMixed as u32, 15);
    }

    #[test]
    fn test_encode_batch() {
        let commands = [
            AtCommand::new(1, AtCommandKind::Ref { input: 0 }),
            AtCommand::new(2, AtCommandKind::ComWdg),
        ];
        assert_eq!(encode_batch(&commands), "AT*REF=1,0\rAT*COMWDG=2\r");
        assert_eq!(encode_batch(&[]), "");
    }
}
