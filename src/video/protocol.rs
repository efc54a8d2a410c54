//! # UVLC Video Protocol Constants and Types
//!
//! A picture is a sequence of slices, each one macroblock (16 pixel rows)
//! high. Every slice starts byte-aligned with a 22-bit code:
//!
//! ```text
//! +--------------------------+-----------+
//! | start code (17 bits = 1) | block (5) |   block == 0x1F: end of picture
//! +--------------------------+-----------+
//! ```
//!
//! The first slice carries the picture header (format, resolution, type,
//! quantizer, frame index); later slices carry only a new quantizer.

use crate::error::{DroneError, Result};

/// Device video port
pub const VIDEO_PORT: u16 = 5555;

/// Datagram sent to the video port to start the stream
pub const VIDEO_WAKE_UP: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Width of one coefficient block
pub const MCU_WIDTH: usize = 8;

/// Coefficients per block
pub const BLOCK_SIZE: usize = MCU_WIDTH * MCU_WIDTH;

/// Four luma quadrants, Cb, Cr
pub const BLOCKS_PER_MACROBLOCK: usize = 6;

/// Pixel size of a macroblock edge
pub const MACROBLOCK_SIZE: usize = 16;

/// Width of the 22-bit slice code
pub const SLICE_CODE_BITS: u32 = 22;

/// Slice code with the block bits masked off
pub const PICTURE_START_CODE: u32 = 32;

/// Block bits marking the end of a picture
pub const END_OF_PICTURE: u32 = 0x1F;

/// Quantizer value that selects the fixed table quantizer
pub const TABLE_QUANTIZATION: i32 = 31;

/// Quantizer used when the table quantizer is selected
pub const TABLE_QUANTIZER_VALUE: i32 = 2;

/// Base dimensions at resolution 1
pub const QQCIF_WIDTH: usize = 88;
pub const QQCIF_HEIGHT: usize = 72;
pub const QQVGA_WIDTH: usize = 160;
pub const QQVGA_HEIGHT: usize = 120;

/// Zig-zag scan order: scan position to row-major coefficient index
pub const ZIGZAG: [usize; BLOCK_SIZE] = [
    0, 1, 8, 16, 9, 2, 3, 10,
    17, 24, 32, 25, 18, 11, 4, 5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13, 6, 7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Largest resolution shift the device encodes
pub const MAX_RESOLUTION: u32 = 2;

/// Picture format field of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureFormat {
    /// 176×144 at resolution 2
    Cif = 1,
    /// 320×240 at resolution 2
    Vga = 2,
}

impl PictureFormat {
    /// Parse the 2-bit format field
    ///
    /// # Errors
    ///
    /// Returns `Video` for the unused values 0 and 3
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            1 => Ok(PictureFormat::Cif),
            2 => Ok(PictureFormat::Vga),
            other => Err(DroneError::Video(format!("Unknown picture format: {}", other))),
        }
    }

    /// Picture dimensions for a resolution shift
    ///
    /// # Errors
    ///
    /// Returns `Video` if `resolution` is 0 or above [`MAX_RESOLUTION`]
    pub fn dimensions(self, resolution: u32) -> Result<(usize, usize)> {
        if resolution == 0 || resolution > MAX_RESOLUTION {
            return Err(DroneError::Video(format!("Picture resolution {}", resolution)));
        }

        let (width, height) = match self {
            PictureFormat::Cif => (QQCIF_WIDTH, QQCIF_HEIGHT),
            PictureFormat::Vga => (QQVGA_WIDTH, QQVGA_HEIGHT),
        };
        let shift = resolution - 1;

        Ok((width << shift, height << shift))
    }
}

/// Decoded picture header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureHeader {
    pub format: PictureFormat,
    pub resolution: u32,
    pub picture_type: u32,
    pub quantizer: i32,
    pub frame_index: u32,
}

/// One decoded picture in `0x00RRGGBB` pixels, row-major
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelFrame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
    pub frame_index: u32,
    pub picture_type: u32,
}

impl PixelFrame {
    /// Reallocate the buffer for new dimensions, keeping it when unchanged
    ///
    /// # Returns
    ///
    /// * `bool` - True if the buffer was reallocated
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        if self.width == width && self.height == height && self.pixels.len() == width * height {
            return false;
        }

        self.width = width;
        self.height = height;
        self.pixels = vec![0; width * height];
        true
    }

    /// Pixel at column `x`, row `y`
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

/// 16×16 coding unit: blocks Y0 Y1 Y2 Y3 Cb Cr, each 8×8 row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroBlock {
    pub blocks: [[i16; BLOCK_SIZE]; BLOCKS_PER_MACROBLOCK],
}

impl Default for MacroBlock {
    fn default() -> Self {
        Self {
            blocks: [[0; BLOCK_SIZE]; BLOCKS_PER_MACROBLOCK],
        }
    }
}
