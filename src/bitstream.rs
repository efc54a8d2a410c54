//! # Bit Reader
//!
//! MSB-first bit extraction over an immutable byte buffer.
//!
//! The reader keeps a 32-bit lookahead register that is refilled from the
//! buffer in 4-byte little-endian words. Bits are then taken from the top of
//! the register, so the first bit returned is bit 31 of the first word:
//!
//! ```text
//! bytes:     b0       b1       b2       b3
//! register:  b3 b2 b1 b0  (u32::from_le_bytes)
//! read order ---------> (bit 31 first)
//! ```
//!
//! Reads beyond the end of the buffer yield zero bits. Callers bound their
//! iteration with [`BitReader::has_remaining`] or [`BitReader::is_overrun`].

/// Width of the lookahead register in bits
const REGISTER_BITS: u32 = 32;

/// MSB-first bit reader with a 32-bit lookahead register
///
/// # Examples
///
/// ```
/// use ardrone_link::bitstream::BitReader;
///
/// // One little-endian word: 0xA0000000
/// let data = [0x00, 0x00, 0x00, 0xA0];
/// let mut reader = BitReader::new(&data);
/// assert_eq!(reader.read_bits(3), 0b101);
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Lookahead register, unread bits are left-aligned
    register: u32,
    /// Number of bits already consumed from the register
    register_index: u32,
    /// Byte offset of the next word to load
    index: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the first bit of `data`
    pub fn new(data: &'a [u8]) -> Self {
        // An exhausted register forces the first read to load a word
        Self {
            data,
            register: 0,
            register_index: REGISTER_BITS,
            index: 0,
        }
    }

    /// Consume and return the next `count` bits, most significant first
    ///
    /// # Arguments
    ///
    /// * `count` - Number of bits to read (1-32)
    pub fn read_bits(&mut self, count: u32) -> u32 {
        debug_assert!((1..=REGISTER_BITS).contains(&count));

        let mut count = count;
        let mut data = 0u32;

        if count > REGISTER_BITS - self.register_index {
            data = shr(self.register, self.register_index);
            count -= REGISTER_BITS - self.register_index;

            self.register = self.load_word(self.index);
            self.register_index = 0;
            self.index += 4;
        }

        if count > 0 {
            data = shl(data, count) | shr(self.register, REGISTER_BITS - count);
            self.register = shl(self.register, count);
            self.register_index += count;
        }

        data
    }

    /// Return the next `count` bits without advancing
    ///
    /// # Arguments
    ///
    /// * `count` - Number of bits to inspect (1-32)
    pub fn peek_bits(&self, count: u32) -> u32 {
        debug_assert!((1..=REGISTER_BITS).contains(&count));

        let mut count = count;
        let mut data = 0u32;
        let mut register = self.register;

        if count > REGISTER_BITS - self.register_index && self.index < self.data.len() {
            data = shr(register, self.register_index);
            count -= REGISTER_BITS - self.register_index;
            register = self.load_word(self.index);
        }

        if count > 0 {
            data = shl(data, count) | shr(register, REGISTER_BITS - count);
        }

        data
    }

    /// Consume `count` bits, any width
    pub fn skip_bits(&mut self, count: u32) {
        let mut remaining = count;
        while remaining > 0 {
            let step = remaining.min(REGISTER_BITS);
            self.read_bits(step);
            remaining -= step;
        }
    }

    /// Advance to the next byte boundary
    pub fn align_to_byte(&mut self) {
        if self.register_index > 0 {
            let aligned = self.register_index & !7;
            if aligned != self.register_index {
                let aligned = aligned + 8;
                self.register = shl(self.register, aligned - self.register_index);
                self.register_index = aligned;
            }
        }
    }

    /// True while unread bits remain in the buffer
    pub fn has_remaining(&self) -> bool {
        self.bits_consumed() < self.data.len() * 8
    }

    /// Number of bits consumed so far
    pub fn bits_consumed(&self) -> usize {
        (self.index * 8 + self.register_index as usize).saturating_sub(REGISTER_BITS as usize)
    }

    /// True once more bits were consumed than the buffer holds
    pub fn is_overrun(&self) -> bool {
        self.bits_consumed() > self.data.len() * 8
    }

    /// Load a little-endian word, zero-padding past the end of the buffer
    fn load_word(&self, at: usize) -> u32 {
        let mut word = [0u8; 4];
        if at < self.data.len() {
            let end = (at + 4).min(self.data.len());
            word[..end - at].copy_from_slice(&self.data[at..end]);
        }
        u32::from_le_bytes(word)
    }
}

/// Left shift that yields 0 for shifts of 32 or more
#[inline]
fn shl(value: u32, shift: u32) -> u32 {
    value.checked_shl(shift).unwrap_or(0)
}

/// Right shift that yields 0 for shifts of 32 or more
#[inline]
fn shr(value: u32, shift: u32) -> u32 {
    value.checked_shr(shift).unwrap_or(0)
}
