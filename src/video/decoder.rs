//! # UVLC Picture Decoder
//!
//! Turns one video datagram into a [`PixelFrame`]:
//!
//! 1. Read a slice header (the first one carries the picture header)
//! 2. Decode every macroblock of the slice into six 8×8 sample blocks
//! 3. Compose the slice: upsample chroma and convert YCbCr to RGB
//!
//! Macroblocks flagged empty keep the samples of the previous picture.
//! The pixel buffer is reused between pictures of the same size.

use tracing::{debug, trace};

use super::idct::inverse_dct;
use super::protocol::*;
use super::uvlc::{quantizer_delta, read_block};
use crate::bitstream::BitReader;
use crate::error::{DroneError, Result};

/// Chroma sample offsets of the four luma quadrants within an 8×8 chroma block
const CHROMA_QUADRANT_OFFSETS: [usize; 4] = [0, 4, 32, 36];

/// Bit 6 of the coefficient-presence byte signals a quantizer delta
const QUANTIZER_DELTA_BIT: u32 = 6;

/// Stateful picture decoder
///
/// # Examples
///
/// ```
/// use ardrone_link::video::decoder::UvlcDecoder;
///
/// let mut decoder = UvlcDecoder::new();
/// assert!(decoder.decode(&[]).is_err());
/// ```
#[derive(Debug, Default)]
pub struct UvlcDecoder {
    frame: PixelFrame,
    macroblocks: Vec<MacroBlock>,
    quantizer: i32,
    slice_count: usize,
}

impl UvlcDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last decoded picture
    pub fn frame(&self) -> &PixelFrame {
        &self.frame
    }

    /// Decode one picture
    ///
    /// Decoding stops at the end-of-picture code or when the data runs out.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw video datagram
    ///
    /// # Returns
    ///
    /// * `Result<&PixelFrame>` - The assembled picture
    ///
    /// # Errors
    ///
    /// Returns `Video` on a bad slice code, an invalid picture header, more
    /// slices than the picture height allows, a corrupt block, a truncated
    /// datagram, or when no picture header was found at all
    pub fn decode(&mut self, data: &[u8]) -> Result<&PixelFrame> {
        let mut reader = BitReader::new(data);
        let mut slice_index = 0usize;

        loop {
            reader.align_to_byte();
            if !reader.has_remaining() {
                break;
            }

            let code = reader.read_bits(SLICE_CODE_BITS);
            // Word padding after the last slice of a picture without end code
            if code == 0 && slice_index > 0 {
                break;
            }
            if code & !END_OF_PICTURE != PICTURE_START_CODE {
                return Err(DroneError::Video(format!(
                    "Invalid slice start code 0x{:06X} at bit {}",
                    code,
                    reader.bits_consumed() - SLICE_CODE_BITS as usize
                )));
            }
            if code & END_OF_PICTURE == END_OF_PICTURE {
                break;
            }

            if slice_index == 0 {
                let header = self.read_picture_header(&mut reader)?;
                trace!("Picture header: {:?}", header);
            } else {
                self.quantizer = reader.read_bits(5) as i32;
            }

            slice_index += 1;
            if slice_index > self.slice_count {
                return Err(DroneError::Video(format!(
                    "Slice {} exceeds picture height ({} slices)",
                    slice_index, self.slice_count
                )));
            }

            self.decode_slice(&mut reader)?;

            if reader.is_overrun() {
                return Err(DroneError::Video(format!(
                    "Datagram truncated in slice {}",
                    slice_index
                )));
            }

            self.compose_slice(slice_index);
        }

        if slice_index == 0 {
            return Err(DroneError::Video("No picture header in datagram".to_string()));
        }

        debug!(
            "Decoded frame {} ({}x{}, {} slices)",
            self.frame.frame_index, self.frame.width, self.frame.height, slice_index
        );

        Ok(&self.frame)
    }

    fn read_picture_header(&mut self, reader: &mut BitReader<'_>) -> Result<PictureHeader> {
        let format_bits = reader.read_bits(2);
        let resolution = reader.read_bits(3);
        let picture_type = reader.read_bits(3);
        let quantizer = reader.read_bits(5) as i32;
        let frame_index = reader.read_bits(32);

        let format = PictureFormat::from_bits(format_bits)?;
        let (width, height) = format.dimensions(resolution)?;

        self.quantizer = quantizer;
        self.slice_count = height >> 4;

        let blocks_per_slice = width >> 4;
        if self.frame.resize(width, height) || self.macroblocks.len() != blocks_per_slice {
            debug!("Video resolution changed to {}x{}", width, height);
            self.macroblocks = vec![MacroBlock::default(); blocks_per_slice];
        }

        self.frame.frame_index = frame_index;
        self.frame.picture_type = picture_type;

        Ok(PictureHeader {
            format,
            resolution,
            picture_type,
            quantizer,
            frame_index,
        })
    }

    fn decode_slice(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let mut coefficients = [0i16; BLOCK_SIZE];

        for macroblock in self.macroblocks.iter_mut() {
            if reader.read_bits(1) == 1 {
                continue;
            }

            let presence = reader.read_bits(8);
            if (presence >> QUANTIZER_DELTA_BIT) & 1 == 1 {
                let delta = quantizer_delta(reader.read_bits(2));
                self.quantizer = self.quantizer.wrapping_add(delta);
            }

            for (i, block) in macroblock.blocks.iter_mut().enumerate() {
                read_block(reader, (presence >> i) & 1 == 1, self.quantizer, &mut coefficients)?;
                inverse_dct(&coefficients, block);
            }
        }

        Ok(())
    }

    /// Write the current macroblock row into the pixel buffer
    fn compose_slice(&mut self, slice_index: usize) {
        let width = self.frame.width;
        let pixels = &mut self.frame.pixels;
        let quadrant_offsets = [
            0,
            MCU_WIDTH,
            width * MCU_WIDTH,
            width * MCU_WIDTH + MCU_WIDTH,
        ];

        let mut offset = (slice_index - 1) * width * MACROBLOCK_SIZE;

        for macroblock in &self.macroblocks {
            let [y0, y1, y2, y3, cb, cr] = &macroblock.blocks;
            let luma_blocks = [y0, y1, y2, y3];

            for vertical in 0..MCU_WIDTH / 2 {
                let chroma_row = vertical * MCU_WIDTH;
                let luma_upper = vertical * MCU_WIDTH * 2;
                let luma_lower = luma_upper + MCU_WIDTH;
                let upper_row = offset + 2 * vertical * width;
                let lower_row = upper_row + width;

                for horizontal in 0..MCU_WIDTH / 2 {
                    for (quadrant, luma) in luma_blocks.iter().enumerate() {
                        let chroma_index = chroma_row + CHROMA_QUADRANT_OFFSETS[quadrant] + horizontal;
                        let chroma = Chroma::new(cb[chroma_index], cr[chroma_index]);

                        for dx in [2 * horizontal, 2 * horizontal + 1] {
                            let base = quadrant_offsets[quadrant] + dx;
                            pixels[upper_row + base] = chroma.to_rgb(luma[luma_upper + dx]);
                            pixels[lower_row + base] = chroma.to_rgb(luma[luma_lower + dx]);
                        }
                    }
                }
            }

            offset += MACROBLOCK_SIZE;
        }
    }
}

/// Precomputed chroma terms shared by a 2×2 luma group
struct Chroma {
    red: i32,
    green: i32,
    blue: i32,
}

impl Chroma {
    fn new(cb: i16, cr: i16) -> Self {
        let u = cb as i32 - 128;
        let v = cr as i32 - 128;

        Self {
            red: 359 * v,
            green: 88 * u + 183 * v,
            blue: 454 * u,
        }
    }

    /// Convert one luma sample to `0x00RRGGBB`
    fn to_rgb(&self, y: i16) -> u32 {
        let y = (y as i32) << 8;

        (saturate(y + self.red) << 16) | (saturate(y - self.green) << 8) | saturate(y + self.blue)
    }
}

/// Clamp an 8.8 fixed-point channel to 0..=255
fn saturate(value: i32) -> u32 {
    if value < 0 {
        0
    } else if value > 0xFFFF {
        0xFF
    } else {
        (value >> 8) as u32
    }
}
