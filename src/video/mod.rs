//! # Video Module
//!
//! UVLC video decoding.
//!
//! ## Modules
//!
//! - `protocol` - Slice codes, picture formats, frame and macroblock types
//! - `uvlc` - Run/level entropy decoding and dequantization
//! - `idct` - Fixed-point 8×8 inverse DCT
//! - `decoder` - Picture state machine and YCbCr→RGB composition
//! - `pave` - PaVE frame reassembly for the TCP transport

pub mod decoder;
pub mod idct;
pub mod pave;
pub mod protocol;
pub mod uvlc;

pub use decoder::UvlcDecoder;
pub use pave::{PaveDepacketizer, PaveFrame};
pub use protocol::PixelFrame;
