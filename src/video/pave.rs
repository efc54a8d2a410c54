//! # PaVE Framing
//!
//! The TCP video transport prefixes every encoded picture with a
//! little-endian encapsulation header:
//!
//! ```text
//! +--------+---------+-------+-------------+--------------+-----+---------+
//! | "PaVE" | version | codec | header_size | payload_size | ... | payload |
//! | 4      | u8      | u8    | u16         | u32          |     |         |
//! +--------+---------+-------+-------------+--------------+-----+---------+
//! ```
//!
//! `header_size` covers the whole header including fields not parsed here.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::error::{DroneError, Result};

/// Frame start marker
pub const PAVE_SIGNATURE: &[u8; 4] = b"PaVE";

/// Bytes needed to read the parsed header fields
pub const PAVE_MIN_HEADER_SIZE: usize = 12;

/// Largest payload accepted
pub const PAVE_MAX_PAYLOAD_SIZE: usize = 0x10_0000;

/// Parsed encapsulation header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaveHeader {
    pub version: u8,
    pub codec: u8,
    pub header_size: u16,
    pub payload_size: u32,
}

impl PaveHeader {
    /// Parse the fixed fields following the signature
    ///
    /// # Errors
    ///
    /// Returns `MalformedPacket` if the data is shorter than the fixed
    /// fields, the signature is wrong, or the sizes are out of range
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < PAVE_MIN_HEADER_SIZE {
            return Err(DroneError::MalformedPacket(format!(
                "PaVE header too short: {} bytes",
                data.len()
            )));
        }
        if &data[..4] != PAVE_SIGNATURE {
            return Err(DroneError::MalformedPacket("Missing PaVE signature".to_string()));
        }

        let mut buf = &data[4..PAVE_MIN_HEADER_SIZE];
        let header = Self {
            version: buf.get_u8(),
            codec: buf.get_u8(),
            header_size: buf.get_u16_le(),
            payload_size: buf.get_u32_le(),
        };

        if (header.header_size as usize) < PAVE_MIN_HEADER_SIZE {
            return Err(DroneError::MalformedPacket(format!(
                "PaVE header size {} below minimum",
                header.header_size
            )));
        }
        if header.payload_size as usize > PAVE_MAX_PAYLOAD_SIZE {
            return Err(DroneError::MalformedPacket(format!(
                "PaVE payload size {} exceeds {}",
                header.payload_size, PAVE_MAX_PAYLOAD_SIZE
            )));
        }

        Ok(header)
    }

    fn frame_size(&self) -> usize {
        self.header_size as usize + self.payload_size as usize
    }
}

/// One reassembled picture payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaveFrame {
    pub header: PaveHeader,
    pub payload: Bytes,
}

/// Reassembles PaVE frames from arbitrary TCP reads
#[derive(Debug, Default)]
pub struct PaveDepacketizer {
    buffer: BytesMut,
}

impl PaveDepacketizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes buffered but not yet emitted
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Extract the next complete frame
    ///
    /// Bytes before a signature are discarded.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(frame))` - A complete frame was removed from the buffer
    /// * `Ok(None)` - More data is needed
    ///
    /// # Errors
    ///
    /// Returns `MalformedPacket` on a corrupt header. The signature is
    /// skipped so the next call resynchronizes.
    pub fn next_frame(&mut self) -> Result<Option<PaveFrame>> {
        match find_signature(&self.buffer) {
            Some(0) => {}
            Some(start) => {
                debug!("Discarding {} bytes before PaVE signature", start);
                self.buffer.advance(start);
            }
            None => {
                // Keep a possible partial signature at the tail
                let keep = self.buffer.len().min(PAVE_SIGNATURE.len() - 1);
                let discard = self.buffer.len() - keep;
                self.buffer.advance(discard);
                return Ok(None);
            }
        }

        if self.buffer.len() < PAVE_MIN_HEADER_SIZE {
            return Ok(None);
        }

        let header = match PaveHeader::parse(&self.buffer) {
            Ok(header) => header,
            Err(e) => {
                warn!("Dropping corrupt PaVE header: {}", e);
                self.buffer.advance(PAVE_SIGNATURE.len());
                return Err(e);
            }
        };

        if self.buffer.len() < header.frame_size() {
            return Ok(None);
        }

        let mut frame = self.buffer.split_to(header.frame_size());
        frame.advance(header.header_size as usize);

        Ok(Some(PaveFrame {
            header,
            payload: frame.freeze(),
        }))
    }
}

fn find_signature(data: &[u8]) -> Option<usize> {
    data.windows(PAVE_SIGNATURE.len())
        .position(|window| window == PAVE_SIGNATURE)
}
