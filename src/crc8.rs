//! 8-bit checksum appended to every frame.
//!
//! The frame checksum is the Dallas/Maxim 1-Wire CRC: polynomial 0x31
//! processed LSB first (feedback 0x8C), zero initial value, no final xor.

use crc::{CRC_8_MAXIM_DOW, Crc};

pub const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

pub fn checksum(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}
