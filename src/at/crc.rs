//! # CRC-32 Implementation
//!
//! CRC-32 (IEEE 802.3) used to derive multi-configuration profile and
//! application identifiers from their names.
//!
//! **Polynomial**: 0xEDB88320 (reflected 0x04C11DB7)
//! **Initial Value**: 0xFFFFFFFF, final XOR 0xFFFFFFFF

/// Reflected CRC-32 polynomial
const CRC32_POLY: u32 = 0xEDB8_8320;

/// Precomputed CRC32 lookup table
const CRC32_TABLE: [u32; 256] = generate_crc32_table();

/// Generate CRC32 lookup table at compile time
const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;

        while j < 8 {
            if (crc & 1) != 0 {
                crc = (crc >> 1) ^ CRC32_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the CRC-32 checksum of `data`
///
/// # Examples
///
/// ```
/// use ardrone_link::at::crc::crc32;
///
/// assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
/// ```
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = u32::MAX;

    for &byte in data {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize];
    }

    !crc
}

/// Identifier for a multi-configuration name, 0 for an empty name
pub fn name_id(name: &str) -> u32 {
    if name.is_empty() {
        0
    } else {
        crc32(name.as_bytes())
    }
}
