//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values take the defaults of
//! a stock drone access point.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::at::command::COMMAND_PORT;
use crate::error::{DroneError, Result};
use crate::navdata::protocol::NAVDATA_PORT;
use crate::transport::ChannelKind;
use crate::video::protocol::VIDEO_PORT;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub video: VideoConfig,
}

/// Addresses, ports and channel timeouts
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_command_port")]
    pub command_port: u16,

    #[serde(default = "default_navdata_port")]
    pub navdata_port: u16,

    #[serde(default = "default_video_port")]
    pub video_port: u16,

    #[serde(default = "default_control_port")]
    pub control_port: u16,

    /// Link is considered lost when no telemetry arrives within this time
    #[serde(default = "default_navdata_timeout_ms")]
    pub navdata_timeout_ms: u64,

    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

/// Command loop configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ControlConfig {
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Telemetry arriving faster than this after the last accepted datagram is dropped
    #[serde(default = "default_burst_window_ms")]
    pub burst_window_ms: u64,

    /// Open the TCP configuration channel
    #[serde(default = "default_enable_control_channel")]
    pub enable_control_channel: bool,
}

/// Video stream configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VideoConfig {
    /// Start the video stream on connect
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub transport: VideoTransport,

    #[serde(default = "default_video_timeout_ms")]
    pub timeout_ms: u64,
}

/// Video stream transport
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoTransport {
    /// Raw UVLC pictures, one per datagram
    #[default]
    Udp,
    /// PaVE-framed pictures on a byte stream
    Tcp,
}

impl From<VideoTransport> for ChannelKind {
    fn from(transport: VideoTransport) -> Self {
        match transport {
            VideoTransport::Udp => ChannelKind::Udp,
            VideoTransport::Tcp => ChannelKind::Tcp,
        }
    }
}

// Default value functions
fn default_host() -> String { "192.168.1.1".to_string() }
fn default_command_port() -> u16 { COMMAND_PORT }
fn default_navdata_port() -> u16 { NAVDATA_PORT }
fn default_video_port() -> u16 { VIDEO_PORT }
fn default_control_port() -> u16 { 5559 }
fn default_navdata_timeout_ms() -> u64 { 2500 }
fn default_send_timeout_ms() -> u64 { 500 }

fn default_send_interval_ms() -> u64 { 30 }
fn default_burst_window_ms() -> u64 { 10 }
fn default_enable_control_channel() -> bool { true }

fn default_video_timeout_ms() -> u64 { 2000 }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            command_port: default_command_port(),
            navdata_port: default_navdata_port(),
            video_port: default_video_port(),
            control_port: default_control_port(),
            navdata_timeout_ms: default_navdata_timeout_ms(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: default_send_interval_ms(),
            burst_window_ms: default_burst_window_ms(),
            enable_control_channel: default_enable_control_channel(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            transport: VideoTransport::default(),
            timeout_ms: default_video_timeout_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn navdata_timeout(&self) -> Duration {
        Duration::from_millis(self.navdata_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl ControlConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn burst_window(&self) -> Duration {
        Duration::from_millis(self.burst_window_ms)
    }
}

impl VideoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ardrone_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.network.host.trim().is_empty() {
            return Err(invalid("host cannot be empty"));
        }

        let ports = [
            ("command_port", self.network.command_port),
            ("navdata_port", self.network.navdata_port),
            ("video_port", self.network.video_port),
            ("control_port", self.network.control_port),
        ];
        for (name, port) in ports {
            if port == 0 {
                return Err(invalid(&format!("{} cannot be 0", name)));
            }
        }

        check_range("navdata_timeout_ms", self.network.navdata_timeout_ms, 1, 60000)?;
        check_range("send_timeout_ms", self.network.send_timeout_ms, 1, 60000)?;
        check_range("send_interval_ms", self.control.send_interval_ms, 1, 1000)?;
        check_range("burst_window_ms", self.control.burst_window_ms, 0, 1000)?;
        check_range("video timeout_ms", self.video.timeout_ms, 1, 60000)?;

        Ok(())
    }
}

fn invalid(message: &str) -> DroneError {
    DroneError::Config(toml::de::Error::custom(message))
}

fn check_range(name: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(&format!("{} must be between {} and {}", name, min, max)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.network.host, "192.168.1.1");
        assert_eq!(config.network.command_port, 5556);
        assert_eq!(config.network.navdata_port, 5554);
        assert_eq!(config.network.video_port, 5555);
        assert_eq!(config.network.control_port, 5559);
        assert_eq!(config.network.navdata_timeout(), Duration::from_millis(2500));
        assert_eq!(config.network.send_timeout(), Duration::from_millis(500));
        assert_eq!(config.control.send_interval(), Duration::from_millis(30));
        assert_eq!(config.control.burst_window(), Duration::from_millis(10));
        assert!(config.control.enable_control_channel);
        assert!(!config.video.enabled);
        assert_eq!(config.video.transport, VideoTransport::Udp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_matches_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[network]
host = "10.0.0.5"
navdata_timeout_ms = 1000

[control]
send_interval_ms = 20
enable_control_channel = false

[video]
enabled = true
transport = "tcp"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.network.host, "10.0.0.5");
        assert_eq!(config.network.navdata_timeout_ms, 1000);
        assert_eq!(config.network.command_port, 5556);
        assert_eq!(config.control.send_interval_ms, 20);
        assert!(!config.control.enable_control_channel);
        assert!(config.video.enabled);
        assert_eq!(config.video.transport, VideoTransport::Tcp);
        assert_eq!(ChannelKind::from(config.video.transport), ChannelKind::Tcp);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/ardrone.toml");
        assert!(matches!(result, Err(DroneError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[network\nhost = 1");
        assert!(matches!(result, Err(DroneError::Config(_))));
    }

    #[test]
    fn test_unknown_transport() {
        let result = Config::from_toml("[video]\ntransport = \"serial\"");
        assert!(matches!(result, Err(DroneError::Config(_))));
    }

    #[test]
    fn test_empty_host() {
        let mut config = Config::default();
        config.network.host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_port() {
        let mut config = Config::default();
        config.network.navdata_port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("navdata_port"));
    }

    #[test]
    fn test_navdata_timeout_zero() {
        let mut config = Config::default();
        config.network.navdata_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_send_timeout_too_high() {
        let mut config = Config::default();
        config.network.send_timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_send_interval_bounds() {
        let mut config = Config::default();
        config.control.send_interval_ms = 0;
        assert!(config.validate().is_err());

        config.control.send_interval_ms = 1000;
        assert!(config.validate().is_ok());

        config.control.send_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_burst_window_zero_allowed() {
        let mut config = Config::default();
        config.control.burst_window_ms = 0;
        assert!(config.validate().is_ok());

        config.control.burst_window_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_video_timeout_zero() {
        let mut config = Config::default();
        config.video.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
