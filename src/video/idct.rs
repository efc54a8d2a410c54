//! # Inverse DCT
//!
//! Separable 8×8 fixed-point inverse DCT: columns first into a workspace
//! scaled by `2^PASS1_BITS`, then rows with the final descale. Constants are
//! `cos`/`sqrt` terms scaled by `2^13`. Arithmetic wraps on overflow so
//! that out-of-range coefficients produce the same samples as the device.

use std::num::Wrapping;

use super::protocol::{BLOCK_SIZE, MCU_WIDTH};

type Fixed = Wrapping<i32>;

const FIX_0_298631336: Fixed = Wrapping(2446);
const FIX_0_390180644: Fixed = Wrapping(3196);
const FIX_0_541196100: Fixed = Wrapping(4433);
const FIX_0_765366865: Fixed = Wrapping(6270);
const FIX_0_899976223: Fixed = Wrapping(7373);
const FIX_1_175875602: Fixed = Wrapping(9633);
const FIX_1_501321110: Fixed = Wrapping(12299);
const FIX_1_847759065: Fixed = Wrapping(15137);
const FIX_1_961570560: Fixed = Wrapping(16069);
const FIX_2_053119869: Fixed = Wrapping(16819);
const FIX_2_562915447: Fixed = Wrapping(20995);
const FIX_3_072711026: Fixed = Wrapping(25172);

const CONST_BITS: usize = 13;
const PASS1_BITS: usize = 1;

/// Rounding bit position of the first pass
const F1: usize = CONST_BITS - PASS1_BITS - 1;
/// Descale of the first pass
const F2: usize = CONST_BITS - PASS1_BITS;
/// Descale of the second pass
const F3: usize = CONST_BITS + PASS1_BITS + 3;

/// Transform dequantized coefficients into pixel-domain samples
///
/// # Arguments
///
/// * `input` - Coefficients, row-major
/// * `output` - Samples, row-major
pub fn inverse_dct(input: &[i16; BLOCK_SIZE], output: &mut [i16; BLOCK_SIZE]) {
    let mut workspace = [Wrapping(0i32); BLOCK_SIZE];

    for column in 0..MCU_WIDTH {
        let sample = |row: usize| Wrapping(input[column + row * MCU_WIDTH] as i32);

        if (1..MCU_WIDTH).all(|row| input[column + row * MCU_WIDTH] == 0) {
            let dc = sample(0) << PASS1_BITS;
            for row in 0..MCU_WIDTH {
                workspace[column + row * MCU_WIDTH] = dc;
            }
            continue;
        }

        let values = butterfly([
            sample(0),
            sample(1),
            sample(2),
            sample(3),
            sample(4),
            sample(5),
            sample(6),
            sample(7),
        ]);

        for (row, value) in values.into_iter().enumerate() {
            workspace[column + row * MCU_WIDTH] = (value + Wrapping(1 << F1)) >> F2;
        }
    }

    for (row, line) in workspace.chunks_exact(MCU_WIDTH).enumerate() {
        let values = butterfly([
            line[0], line[1], line[2], line[3], line[4], line[5], line[6], line[7],
        ]);

        for (column, value) in values.into_iter().enumerate() {
            output[row * MCU_WIDTH + column] = (value >> F3).0 as i16;
        }
    }
}

/// One-dimensional 8-point transform, outputs not yet descaled
fn butterfly(v: [Fixed; MCU_WIDTH]) -> [Fixed; MCU_WIDTH] {
    // Even part
    let z2 = v[2];
    let z3 = v[6];

    let z1 = (z2 + z3) * FIX_0_541196100;
    let tmp2 = z1 - z3 * FIX_1_847759065;
    let tmp3 = z1 + z2 * FIX_0_765366865;

    let tmp0 = (v[0] + v[4]) << CONST_BITS;
    let tmp1 = (v[0] - v[4]) << CONST_BITS;

    let tmp10 = tmp0 + tmp3;
    let tmp13 = tmp0 - tmp3;
    let tmp11 = tmp1 + tmp2;
    let tmp12 = tmp1 - tmp2;

    // Odd part
    let (tmp0, tmp1, tmp2, tmp3) = (v[7], v[5], v[3], v[1]);

    let z1 = tmp0 + tmp3;
    let z2 = tmp1 + tmp2;
    let z3 = tmp0 + tmp2;
    let z4 = tmp1 + tmp3;
    let z5 = (z3 + z4) * FIX_1_175875602;

    let tmp0 = tmp0 * FIX_0_298631336;
    let tmp1 = tmp1 * FIX_2_053119869;
    let tmp2 = tmp2 * FIX_3_072711026;
    let tmp3 = tmp3 * FIX_1_501321110;
    let z1 = -(z1 * FIX_0_899976223);
    let z2 = -(z2 * FIX_2_562915447);
    let z3 = -(z3 * FIX_1_961570560) + z5;
    let z4 = -(z4 * FIX_0_390180644) + z5;

    let tmp0 = tmp0 + z1 + z3;
    let tmp1 = tmp1 + z2 + z4;
    let tmp2 = tmp2 + z2 + z3;
    let tmp3 = tmp3 + z1 + z4;

    [
        tmp10 + tmp3,
        tmp11 + tmp2,
        tmp12 + tmp1,
        tmp13 + tmp0,
        tmp13 - tmp0,
        tmp12 - tmp1,
        tmp11 - tmp2,
        tmp10 - tmp3,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_block() {
        let input = [0i16; BLOCK_SIZE];
        let mut output = [1i16; BLOCK_SIZE];

        inverse_dct(&input, &mut output);
        assert!(output.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_dc_only_block_is_uniform() {
        for dc in [8i16, 80, 800, 1024, -160] {
            let mut input = [0i16; BLOCK_SIZE];
            input[0] = dc;
            let mut output = [0i16; BLOCK_SIZE];

            inverse_dct(&input, &mut output);

            assert!(output.iter().all(|&s| s == output[0]), "dc {}", dc);
            assert_eq!(output[0], dc >> 3, "dc {}", dc);
        }
    }

    #[test]
    fn test_horizontal_ac_varies_across_columns_only() {
        let mut input = [0i16; BLOCK_SIZE];
        input[0] = 256;
        input[1] = 64;
        let mut output = [0i16; BLOCK_SIZE];

        inverse_dct(&input, &mut output);

        let first_row = &output[..MCU_WIDTH];
        for row in output.chunks_exact(MCU_WIDTH) {
            assert_eq!(row, first_row);
        }
        // Cosine half-period: decreasing left to right
        assert!(first_row[0] > first_row[7]);
    }

    #[test]
    fn test_vertical_ac_varies_across_rows_only() {
        let mut input = [0i16; BLOCK_SIZE];
        input[0] = 256;
        input[8] = 64;
        let mut output = [0i16; BLOCK_SIZE];

        inverse_dct(&input, &mut output);

        for row in output.chunks_exact(MCU_WIDTH) {
            assert!(row.iter().all(|&s| s == row[0]));
        }
        assert!(output[0] > output[56]);
    }

    #[test]
    fn test_extreme_coefficients_do_not_panic() {
        let input = [i16::MAX; BLOCK_SIZE];
        let mut output = [0i16; BLOCK_SIZE];
        inverse_dct(&input, &mut output);

        let input = [i16::MIN; BLOCK_SIZE];
        inverse_dct(&input, &mut output);
    }
}
