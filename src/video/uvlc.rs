//! # UVLC Coefficient Decoding
//!
//! Run/level entropy decoding and dequantization of one 8×8 block.
//!
//! Both fields use the same prefix scheme: a run of `n` zeros terminated by
//! a one, followed by extra bits. Lookahead is a 32-bit peek; all shifts
//! wrap modulo 32, matching the device encoder on degenerate codes.
//!
//! | Field | Prefix    | Extra bits          | Value                       |
//! |-------|-----------|---------------------|-----------------------------|
//! | run   | `1`       | none                | 0                           |
//! | run   | `01`      | none                | 1                           |
//! | run   | `0^n 1`   | `n-1`               | `extra + 2^(n-1)`           |
//! | level | `1`       | sign                | ±1                          |
//! | level | `01`      | none                | end of block                |
//! | level | `0^n 1`   | `n-1` value + sign  | ±(`value + 2^(n-1)`)        |

use super::protocol::{BLOCK_SIZE, TABLE_QUANTIZATION, TABLE_QUANTIZER_VALUE, ZIGZAG};
use crate::bitstream::BitReader;
use crate::error::{DroneError, Result};

/// One decoded run/level code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLevel {
    /// `run` zero coefficients followed by `level`
    Coefficient { run: u32, level: i32 },
    EndOfBlock,
}

/// Decode the next run/level code and consume exactly its bits
pub fn decode_run_level(reader: &mut BitReader<'_>) -> RunLevel {
    let mut code = reader.peek_bits(32);
    let mut length = 0u32;

    // Run field
    let zeros = code.leading_zeros();
    code = code.wrapping_shl(zeros + 1);
    length += zeros + 1;

    let run = if zeros > 1 {
        let extra = code.wrapping_shr(32 - (zeros - 1));
        code = code.wrapping_shl(zeros - 1);
        length += zeros - 1;
        extra.wrapping_add(1u32.wrapping_shl(zeros - 1))
    } else {
        zeros
    };

    // Level field
    let mut zeros = code.leading_zeros();
    code = code.wrapping_shl(zeros + 1);
    length += zeros + 1;

    let result = if zeros == 1 {
        RunLevel::EndOfBlock
    } else {
        if zeros == 0 {
            zeros = 1;
        }
        length += zeros;
        code = code.wrapping_shr(32 - zeros);

        let negative = code & 1 == 1;
        let magnitude = ((code >> 1) as i32).wrapping_add(1i32.wrapping_shl(zeros - 1));
        let level = if negative { magnitude.wrapping_neg() } else { magnitude };

        RunLevel::Coefficient { run, level }
    };

    reader.skip_bits(length);
    result
}

/// Quantizer step used for dequantization
pub fn effective_quantizer(quantizer: i32) -> i32 {
    if quantizer == TABLE_QUANTIZATION {
        TABLE_QUANTIZER_VALUE
    } else {
        quantizer
    }
}

/// Decode the 2-bit macroblock quantizer delta: 0 → -1, 1 → -2, 2 → 2, 3 → 3
pub fn quantizer_delta(mode: u32) -> i32 {
    if mode < 2 {
        !(mode as i32)
    } else {
        mode as i32
    }
}

/// Decode one coefficient block and dequantize it in place
///
/// # Arguments
///
/// * `reader` - Bit reader positioned at the block's DC coefficient
/// * `coded` - Presence bit: AC coefficients follow the DC term
/// * `quantizer` - Running quantizer of the slice
/// * `block` - Output coefficients, row-major
///
/// # Errors
///
/// Returns `Video` if the zig-zag position leaves the block or the
/// bitstream runs out before the end-of-block code
pub fn read_block(
    reader: &mut BitReader<'_>,
    coded: bool,
    quantizer: i32,
    block: &mut [i16; BLOCK_SIZE],
) -> Result<()> {
    block.fill(0);
    block[0] = reader.read_bits(10) as i16;

    if coded {
        let mut position = 0usize;

        loop {
            match decode_run_level(reader) {
                RunLevel::EndOfBlock => break,
                RunLevel::Coefficient { run, level } => {
                    let index = position
                        .checked_add(run as usize + 1)
                        .and_then(|p| ZIGZAG.get(p).map(|&index| (p, index)));

                    match index {
                        Some((p, index)) => {
                            position = p;
                            block[index] = level as i16;
                        }
                        None => {
                            return Err(DroneError::Video(format!(
                                "Zig-zag position overflow (run {} at {})",
                                run, position
                            )));
                        }
                    }
                }
            }

            if reader.is_overrun() {
                return Err(DroneError::Video("Bitstream ended inside a block".to_string()));
            }
        }
    }

    let quant = effective_quantizer(quantizer);
    for (i, coefficient) in block.iter_mut().enumerate() {
        let step = 1 + (1 + (i >> 3) as i32 + (i & 7) as i32).wrapping_mul(quant);
        *coefficient = (*coefficient as i32).wrapping_mul(step) as i16;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::writer::BitWriter;

    fn reader_for(bits: &str) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer.write_str(bits);
        writer.finish()
    }

    #[test]
    fn test_end_of_block_code() {
        let data = reader_for("101");
        let mut reader = BitReader::new(&data);

        assert_eq!(decode_run_level(&mut reader), RunLevel::EndOfBlock);
        assert_eq!(reader.bits_consumed(), 3);
    }

    #[test]
    fn test_unit_levels() {
        let data = reader_for("110 111");
        let mut reader = BitReader::new(&data);

        assert_eq!(decode_run_level(&mut reader), RunLevel::Coefficient { run: 0, level: 1 });
        assert_eq!(decode_run_level(&mut reader), RunLevel::Coefficient { run: 0, level: -1 });
        assert_eq!(reader.bits_consumed(), 6);
    }

    #[test]
    fn test_run_of_one() {
        // run "01", level "1" + sign "0"
        let data = reader_for("01 10");
        let mut reader = BitReader::new(&data);

        assert_eq!(decode_run_level(&mut reader), RunLevel::Coefficient { run: 1, level: 1 });
        assert_eq!(reader.bits_consumed(), 4);
    }

    #[test]
    fn test_escaped_run() {
        // run "001" + "1" = 3, run "0001" + "01" = 5
        let data = reader_for("0011 10 000101 11");
        let mut reader = BitReader::new(&data);

        assert_eq!(decode_run_level(&mut reader), RunLevel::Coefficient { run: 3, level: 1 });
        assert_eq!(decode_run_level(&mut reader), RunLevel::Coefficient { run: 5, level: -1 });
        assert_eq!(reader.bits_consumed(), 14);
    }

    #[test]
    fn test_escaped_level() {
        // level "001" + value "1" + sign "0" = +3
        // level "0001" + value "10" + sign "1" = -(2 + 4) = -6
        let data = reader_for("1 00110 1 0001101");
        let mut reader = BitReader::new(&data);

        assert_eq!(decode_run_level(&mut reader), RunLevel::Coefficient { run: 0, level: 3 });
        assert_eq!(decode_run_level(&mut reader), RunLevel::Coefficient { run: 0, level: -6 });
        assert_eq!(reader.bits_consumed(), 14);
    }

    #[test]
    fn test_quantizer_delta() {
        assert_eq!(quantizer_delta(0), -1);
        assert_eq!(quantizer_delta(1), -2);
        assert_eq!(quantizer_delta(2), 2);
        assert_eq!(quantizer_delta(3), 3);
    }

    #[test]
    fn test_effective_quantizer() {
        assert_eq!(effective_quantizer(31), 2);
        assert_eq!(effective_quantizer(7), 7);
    }

    #[test]
    fn test_read_block_dc_only() {
        let mut writer = BitWriter::new();
        writer.write_bits(100, 10);
        let data = writer.finish();
        let mut reader = BitReader::new(&data);
        let mut block = [0i16; BLOCK_SIZE];

        read_block(&mut reader, false, 7, &mut block).unwrap();

        assert_eq!(block[0], 800);
        assert!(block[1..].iter().all(|&c| c == 0));
        assert_eq!(reader.bits_consumed(), 10);
    }

    #[test]
    fn test_read_block_scatters_in_zigzag_order() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 10);
        // run 0, +1 → scan 1 (index 1)
        writer.write_str("110");
        // run 1, -1 → scan 3 (index 16)
        writer.write_str("0111");
        writer.write_str("101");
        let data = writer.finish();
        let mut reader = BitReader::new(&data);
        let mut block = [0i16; BLOCK_SIZE];

        read_block(&mut reader, true, 1, &mut block).unwrap();

        // step = 1 + (1 + row + col) * quant
        assert_eq!(block[1], 3);
        assert_eq!(block[16], -4);
        assert_eq!(block.iter().filter(|&&c| c != 0).count(), 2);
        assert_eq!(reader.bits_consumed(), 20);
    }

    #[test]
    fn test_read_block_zigzag_overflow() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 10);
        // run 63 via "0000001" + 5 bits of 31 (32 + 31), then +1
        writer.write_str("0000001 11111 110");
        let data = writer.finish();
        let mut reader = BitReader::new(&data);
        let mut block = [0i16; BLOCK_SIZE];

        let result = read_block(&mut reader, true, 1, &mut block);
        assert!(matches!(result, Err(DroneError::Video(_))));
    }

    #[test]
    fn test_read_block_truncated() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 10);
        writer.write_str("110");
        let data = writer.finish();
        let mut reader = BitReader::new(&data);
        let mut block = [0i16; BLOCK_SIZE];

        assert!(read_block(&mut reader, true, 1, &mut block).is_err());
    }
}
