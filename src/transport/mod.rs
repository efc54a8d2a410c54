//! # Transport Module
//!
//! Network channels to the drone.
//!
//! This module handles:
//! - Connected UDP sockets for commands, telemetry and video
//! - TCP streams for the configuration channel and the PaVE video variant
//! - A `Connector` seam so the link driver can run against mocks

pub mod channel;

use async_trait::async_trait;
use std::fmt;
use std::io;
use tracing::debug;

pub use channel::{Channel, StreamChannel, TcpChannel, UdpChannel};

/// Channel transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Udp,
    Tcp,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Udp => write!(f, "udp"),
            ChannelKind::Tcp => write!(f, "tcp"),
        }
    }
}

/// Opens channels to the drone
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, kind: ChannelKind, host: &str, port: u16) -> io::Result<Box<dyn Channel>>;
}

/// Connector backed by tokio sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioConnector;

#[async_trait]
impl Connector for TokioConnector {
    async fn connect(&self, kind: ChannelKind, host: &str, port: u16) -> io::Result<Box<dyn Channel>> {
        debug!("Opening {} channel to {}:{}", kind, host, port);

        let channel: Box<dyn Channel> = match kind {
            ChannelKind::Udp => Box::new(UdpChannel::connect(host, port).await?),
            ChannelKind::Tcp => Box::new(TcpChannel::connect(host, port).await?),
        };
        Ok(channel)
    }
}
