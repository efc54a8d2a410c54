//! # Command Protocol Engine
//!
//! Synchronous core of the command link. The engine owns the command and
//! configuration queues, the `AT*REF` input bitmask, the command sequence
//! counter and the emergency state machine. It performs no I/O: the link
//! driver feeds it telemetry status words and sends whatever `tick` returns.
//!
//! ## Per-telemetry behaviour
//!
//! For every accepted telemetry sample, in order:
//!
//! 1. Connection bookkeeping (first sample connects, `COM_LOST` disconnects)
//! 2. `AT*COMWDG` when the communication watchdog flag is set
//! 3. Configuration queue handshake on the command-received flag
//! 4. `AT*CTRL` acknowledge when the command-received flag is set
//! 5. Emergency state machine
//! 6. Status edge events
//!
//! ## Modules
//!
//! - `state` - Connection and emergency command states
//! - `input` - Flight input source and input bitmask

pub mod input;
pub mod state;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::at::command::{
    animation_seconds, encode_batch, AtCommand, AtCommandKind, ControlMode, FlightAnimation,
    LedAnimation,
};
use crate::at::config::{hex_id, ConfigEntry, ConfigIds};
use crate::error::{DroneError, Result};
use crate::navdata::{StatusFlags, StatusTransition};

pub use input::{FlightInput, StaticInput, INPUT_BASE, INPUT_EMERGENCY, INPUT_TAKEOFF};
pub use state::{next_command_state, CommandState, ConnectionState, EmergencyAction};

/// First sequence number after (re)connecting
pub const FIRST_SEQUENCE: u32 = 1;

/// Notification produced while processing telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// First telemetry accepted after connecting
    ConnectionEstablished,
    /// Device reported a lost link; the engine is now disconnected
    CommunicationLost,
    /// The configuration queue drained
    ConfigurationComplete,
    /// A status flag changed
    Transition(StatusTransition),
}

/// AT command/config protocol state
pub struct CommandProtocolEngine {
    connection: ConnectionState,
    command_state: CommandState,
    input: u32,
    sequence: u32,
    commands: VecDeque<AtCommand>,
    configs: VecDeque<ConfigEntry>,
    config_ids: ConfigIds,
    flight_input: Option<Arc<dyn FlightInput>>,
    last_status: Option<StatusFlags>,
}

impl CommandProtocolEngine {
    pub fn new() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            command_state: CommandState::Idle,
            input: INPUT_BASE,
            sequence: FIRST_SEQUENCE,
            commands: VecDeque::new(),
            configs: VecDeque::new(),
            config_ids: ConfigIds::default(),
            flight_input: None,
            last_status: None,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn command_state(&self) -> CommandState {
        self.command_state
    }

    /// True unless disconnected
    pub fn is_connected(&self) -> bool {
        self.connection != ConnectionState::Disconnected
    }

    /// Current `AT*REF` input bitmask
    pub fn input(&self) -> u32 {
        self.input
    }

    /// Sequence number the next command will get
    pub fn next_sequence(&self) -> u32 {
        self.sequence
    }

    pub fn config_ids(&self) -> ConfigIds {
        self.config_ids
    }

    /// Commands waiting for the next tick, oldest first
    pub fn pending_commands(&self) -> impl Iterator<Item = &AtCommand> {
        self.commands.iter()
    }

    /// Configuration entries waiting for acknowledgement, head first
    pub fn pending_configs(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.configs.iter()
    }

    /// Start a new session
    ///
    /// Resets the sequence counter, queues, input bitmask and emergency
    /// state. The engine stays in `Bootstrapping` until the first telemetry
    /// sample arrives.
    pub fn connect(&mut self) {
        self.reset();
        self.connection = ConnectionState::Bootstrapping;
        info!("Command engine bootstrapping");
    }

    /// End the session, dropping everything queued
    pub fn disconnect(&mut self) {
        if self.connection != ConnectionState::Disconnected {
            info!("Command engine disconnected");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.command_state = CommandState::Idle;
        self.input = INPUT_BASE;
        self.sequence = FIRST_SEQUENCE;
        self.commands.clear();
        self.configs.clear();
        self.last_status = None;
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DroneError::NotConnected)
        }
    }

    /// Queue a command with the next sequence number
    ///
    /// # Returns
    ///
    /// The sequence number assigned to the command
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when disconnected
    pub fn enqueue_command(&mut self, kind: AtCommandKind) -> Result<u32> {
        self.ensure_connected()?;

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        self.commands.push_back(AtCommand::new(sequence, kind));
        Ok(sequence)
    }

    /// Queue a configuration entry
    ///
    /// Entries are sent one at a time: the head is resent on every
    /// telemetry sample until the device acknowledges it.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when disconnected, since `connect` would
    /// discard the entry anyway
    pub fn enqueue_config(&mut self, entry: ConfigEntry) -> Result<()> {
        self.ensure_connected()?;

        debug!("Queued config {}={}", entry.key, entry.value);
        self.configs.push_back(entry);
        Ok(())
    }

    /// Activate a multi-configuration for `application` and `user`
    ///
    /// Stores the derived ids and queues the session, profile and
    /// application entries.
    pub fn configure_multi(&mut self, application: &str, user: &str) -> Result<()> {
        self.ensure_connected()?;

        self.config_ids = ConfigIds::from_names(application, user);
        info!(
            "Multi configuration session={} profile={} application={}",
            hex_id(self.config_ids.session),
            hex_id(self.config_ids.profile),
            hex_id(self.config_ids.application)
        );

        for entry in ConfigEntry::multi_configuration(&self.config_ids) {
            self.configs.push_back(entry);
        }
        Ok(())
    }

    /// Set the takeoff bit
    pub fn takeoff(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.input |= INPUT_TAKEOFF;
        info!("Takeoff requested");
        Ok(())
    }

    /// Clear the takeoff bit
    pub fn land(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.input &= !INPUT_TAKEOFF;
        info!("Landing requested");
        Ok(())
    }

    /// Queue a zero-input non-progressive `AT*PCMD`
    pub fn hover(&mut self) -> Result<()> {
        self.enqueue_command(AtCommandKind::hover()).map(|_| ())
    }

    /// Queue `AT*FTRIM`; the device must be on flat ground
    pub fn flat_trim(&mut self) -> Result<()> {
        self.enqueue_command(AtCommandKind::FTrim).map(|_| ())
    }

    /// Ask the device to send its configuration on the control channel
    pub fn request_configuration(&mut self) -> Result<()> {
        self.enqueue_command(AtCommandKind::Ctrl {
            mode: ControlMode::GetConfiguration,
        })
        .map(|_| ())
    }

    /// Queue a flight animation, duration rounded and clamped to 1..=10 s
    pub fn play_animation(&mut self, animation: FlightAnimation, duration: Duration) -> Result<()> {
        self.enqueue_command(AtCommandKind::Anim {
            animation: animation as u32,
            seconds: animation_seconds(duration),
        })
        .map(|_| ())
    }

    /// Queue an LED animation, duration rounded and clamped to 1..=10 s
    pub fn play_led_animation(
        &mut self,
        animation: LedAnimation,
        frequency: f32,
        duration: Duration,
    ) -> Result<()> {
        self.enqueue_command(AtCommandKind::Led {
            animation: animation as u32,
            frequency,
            seconds: animation_seconds(duration),
        })
        .map(|_| ())
    }

    /// Attach or detach the progressive input source
    pub fn set_flight_input(&mut self, input: Option<Arc<dyn FlightInput>>) {
        self.flight_input = input;
    }

    /// Request an emergency stop
    ///
    /// # Errors
    ///
    /// - `NotConnected` unless connected
    /// - `CommandInProgress` while another emergency request is running
    pub fn set_emergency(&mut self) -> Result<()> {
        self.start_emergency_request(CommandState::InitiateEmergency)
    }

    /// Request leaving the emergency state
    ///
    /// # Errors
    ///
    /// Same as [`set_emergency`](Self::set_emergency)
    pub fn reset_emergency(&mut self) -> Result<()> {
        self.start_emergency_request(CommandState::InitiateReset)
    }

    fn start_emergency_request(&mut self, request: CommandState) -> Result<()> {
        if self.connection != ConnectionState::Connected {
            return Err(DroneError::NotConnected);
        }
        if self.command_state != CommandState::Idle {
            return Err(DroneError::CommandInProgress);
        }

        info!("Emergency request: {:?}", request);
        self.command_state = request;
        Ok(())
    }

    /// Process one accepted telemetry status word
    ///
    /// # Returns
    ///
    /// Events raised by the sample, in the order they occurred
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when disconnected (late datagram)
    pub fn on_telemetry(&mut self, status: StatusFlags) -> Result<Vec<EngineEvent>> {
        self.ensure_connected()?;

        let mut events = Vec::new();

        match self.connection {
            ConnectionState::Bootstrapping => {
                self.connection = ConnectionState::Connected;
                info!("Connected to drone");
                events.push(EngineEvent::ConnectionEstablished);
            }
            ConnectionState::Connected if status.communication_lost() => {
                warn!("Drone reported lost communication");
                self.disconnect();
                events.push(EngineEvent::CommunicationLost);
                return Ok(events);
            }
            _ => {}
        }

        if status.com_watchdog() {
            debug!("Communication watchdog set, resetting");
            self.enqueue_command(AtCommandKind::ComWdg)?;
        }

        if self.process_config_queue(status)? {
            events.push(EngineEvent::ConfigurationComplete);
        }

        if status.command_received() {
            self.enqueue_command(AtCommandKind::Ctrl {
                mode: ControlMode::Acknowledge,
            })?;
        }

        self.advance_command_state(status.has_emergency())?;

        let previous = self.last_status.unwrap_or(status);
        events.extend(status.transitions(&previous).into_iter().map(EngineEvent::Transition));
        self.last_status = Some(status);

        Ok(events)
    }

    /// Resend the head entry until acknowledged; returns true when the
    /// queue just drained
    fn process_config_queue(&mut self, status: StatusFlags) -> Result<bool> {
        if status.command_received() {
            if self.configs.pop_front().is_some() && self.configs.is_empty() {
                info!("Configuration complete");
                return Ok(true);
            }
            return Ok(false);
        }

        if let Some(entry) = self.configs.front().cloned() {
            if entry.multi && self.config_ids.is_active() {
                self.enqueue_command(AtCommandKind::ConfigIds {
                    session: hex_id(self.config_ids.session),
                    profile: hex_id(self.config_ids.profile),
                    application: hex_id(self.config_ids.application),
                })?;
            }
            self.enqueue_command(AtCommandKind::Config {
                key: entry.key,
                value: entry.value,
            })?;
        }
        Ok(false)
    }

    fn advance_command_state(&mut self, has_emergency: bool) -> Result<()> {
        let (next, action) = next_command_state(self.command_state, has_emergency);
        if next != self.command_state {
            debug!("Command state {:?} -> {:?}", self.command_state, next);
        }
        self.command_state = next;

        if let Some(action) = action {
            self.input &= !INPUT_TAKEOFF;
            match action {
                EmergencyAction::Raise => self.input |= INPUT_EMERGENCY,
                EmergencyAction::Clear => self.input &= !INPUT_EMERGENCY,
            }
            self.enqueue_command(AtCommandKind::Ref { input: self.input })?;
        }
        Ok(())
    }

    /// Build the next datagram payload
    ///
    /// Queues `AT*REF` with the current input bitmask, then a progressive
    /// `AT*PCMD` when an input source is attached and the takeoff bit is
    /// set, and drains the whole queue in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when disconnected; the sender loop exits on it
    pub fn tick(&mut self) -> Result<String> {
        self.enqueue_command(AtCommandKind::Ref { input: self.input })?;

        if self.input & INPUT_TAKEOFF != 0 {
            if let Some(source) = self.flight_input.clone() {
                self.enqueue_command(AtCommandKind::progressive(
                    source.roll(),
                    source.pitch(),
                    source.gaz(),
                    source.yaw(),
                ))?;
            }
        }

        let batch = encode_batch(self.commands.iter());
        self.commands.clear();
        Ok(batch)
    }
}

impl Default for CommandProtocolEngine {
    fn default() -> Self {
        Self::new()
    }
}
