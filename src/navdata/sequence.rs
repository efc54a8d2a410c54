//! # Telemetry Replay Control
//!
//! Drops burst duplicates and stale sequence numbers. The device restarts
//! its counter at 1, which is always accepted.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{DroneError, Result};

/// Default burst window
pub const DEFAULT_BURST_WINDOW: Duration = Duration::from_millis(10);

/// Tracks the last accepted telemetry datagram
#[derive(Debug, Clone)]
pub struct SequenceGuard {
    burst_window: Duration,
    last_sequence: u32,
    last_accepted: Option<Instant>,
}

impl SequenceGuard {
    pub fn new(burst_window: Duration) -> Self {
        Self {
            burst_window,
            last_sequence: 0,
            last_accepted: None,
        }
    }

    /// Decide whether the datagram with `sequence`, received at `now`, is accepted
    ///
    /// # Errors
    ///
    /// * `BurstPacket` - received within the burst window of the last accepted one
    /// * `DuplicatePacket` - sequence not newer than the last accepted one
    pub fn accept(&mut self, sequence: u32, now: Instant) -> Result<()> {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.burst_window {
                warn!("Burst telemetry packet dropped (sequence {})", sequence);
                return Err(DroneError::BurstPacket);
            }
        }

        if sequence == 1 {
            info!("Telemetry sequence restarted");
        } else if sequence <= self.last_sequence {
            warn!(
                "Duplicate telemetry packet dropped (sequence {}, last {})",
                sequence, self.last_sequence
            );
            return Err(DroneError::DuplicatePacket(sequence));
        }

        self.last_sequence = sequence;
        self.last_accepted = Some(now);
        Ok(())
    }

    /// Last accepted sequence number (0 before the first datagram)
    pub fn last_sequence(&self) -> u32 {
        self.last_sequence
    }

    /// Forget all history, used on (re)connect
    pub fn reset(&mut self) {
        self.last_sequence = 0;
        self.last_accepted = None;
    }
}

impl Default for SequenceGuard {
    fn default() -> Self {
        Self::new(DEFAULT_BURST_WINDOW)
    }
}
