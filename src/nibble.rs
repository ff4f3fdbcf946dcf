//! Complemented nibble codec.
//!
//! Every payload byte goes out as two wire bytes. A wire byte carries one
//! nibble in its high half and the bitwise complement of that nibble in its
//! low half, so each byte can be checked on its own and the framing markers
//! never show up inside a frame.

use core::fmt;

use bilge::prelude::*;

/// Every wire byte the codec can produce, indexed by nibble value.
pub const ALPHABET: [u8; 16] = [
    0x0F, 0x1E, 0x2D, 0x3C, 0x4B, 0x5A, 0x69, 0x78, 0x87, 0x96, 0xA5, 0xB4, 0xC3, 0xD2, 0xE1, 0xF0,
];

/// One wire byte. Bits are laid out LSB first, so `check` is the low half.
#[bitsize(8)]
#[derive(DebugBits, Clone, Copy, PartialEq, FromBits)]
pub struct WireNibble {
    pub check: u4,
    pub nibble: u4,
}

impl WireNibble {
    /// Wire form of the low 4 bits of `nibble`.
    pub fn from_nibble(nibble: u8) -> WireNibble {
        let n = nibble & 0x0F;
        WireNibble::new(u4::new(n ^ 0x0F), u4::new(n))
    }

    pub fn is_valid(&self) -> bool {
        self.nibble().value() == self.check().value() ^ 0x0F
    }

    pub fn byte(&self) -> u8 {
        self.value
    }
}

/// A byte that is not one of the 16 [`ALPHABET`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NibbleError {
    pub found: u8,
}

impl fmt::Display for NibbleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} is not a complemented nibble", self.found)
    }
}

impl core::error::Error for NibbleError {}

pub fn encode_nibble(nibble: u8) -> u8 {
    WireNibble::from_nibble(nibble).byte()
}

/// High nibble first, then low nibble.
pub fn encode(byte: u8) -> [u8; 2] {
    [encode_nibble(byte >> 4), encode_nibble(byte & 0x0F)]
}

pub fn decode(wire: u8) -> Result<u8, NibbleError> {
    let w = WireNibble::from(wire);
    if !w.is_valid() {
        return Err(NibbleError { found: wire });
    }
    Ok(w.nibble().value())
}

/// Join two decoded nibbles back into the byte they came from.
pub fn combine(high: u8, low: u8) -> u8 {
    (high << 4) | (low & 0x0F)
}
