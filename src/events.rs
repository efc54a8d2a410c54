//! # Link Events
//!
//! Notifications raised by the link driver. Listeners are registered on an
//! [`EventBus`] and invoked synchronously, in registration order, on the task
//! that produced the event. Listeners must not block.

use std::sync::{Arc, PoisonError, RwLock};

use crate::navdata::{StatusFlags, StatusTransition, TelemetrySample, VisionTag};
use crate::video::PixelFrame;

/// Event delivered to listeners
///
/// Payloads borrow from the producing task; clone what must outlive the call.
#[derive(Debug, Clone, Copy)]
pub enum DroneEvent<'a> {
    /// First telemetry accepted after connecting
    Connected,
    /// Status word of every accepted telemetry sample
    Status(StatusFlags),
    /// Demo record of an accepted telemetry sample
    Telemetry(&'a TelemetrySample),
    /// Detected vision tags, scaled to the viewport
    VisionDetect(&'a [VisionTag]),
    /// Edge-triggered status change
    Transition(StatusTransition),
    /// Configuration queue drained
    ConfigurationComplete,
    /// One line received on the configuration channel
    ConfigLine(&'a str),
    /// A video picture finished decoding
    Frame(&'a PixelFrame),
    /// The link went down; raised once per connection
    CommunicationFailure,
}

type Listener = Arc<dyn Fn(&DroneEvent<'_>) + Send + Sync>;

/// Ordered listener registry
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it is called after all earlier ones
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&DroneEvent<'_>) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Deliver `event` to every listener in registration order
    ///
    /// Listeners run on a snapshot of the registry; one subscribed during
    /// delivery first sees the next event.
    pub fn emit(&self, event: &DroneEvent<'_>) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners.iter() {
            listener(event);
        }
    }

    /// Convenience for decoded frames
    pub fn emit_frame(&self, frame: &PixelFrame) {
        self.emit(&DroneEvent::Frame(frame));
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
