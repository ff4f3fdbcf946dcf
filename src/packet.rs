use core::fmt;
use core::ops::Deref;

use crate::{Decode, clock::NoClock, frame::MAX_PAYLOAD, receiver::Receiver};

/// Storage for one payload, never more than a frame can carry.
pub type PacketBuffer = heapless::Vec<u8, MAX_PAYLOAD>;

/// A checksum-verified payload taken off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    data: PacketBuffer,
}

impl Packet {
    pub(crate) fn new(data: PacketBuffer) -> Packet {
        Packet { data }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> PacketBuffer {
        self.data
    }
}

impl Deref for Packet {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No frame finished inside the given bytes.
    Incomplete,
    /// Frames were present but none survived the protocol checks.
    Rejected { errors: u32 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Incomplete => write!(f, "no complete frame"),
            DecodeError::Rejected { errors } => {
                write!(f, "frame rejected after {errors} protocol errors")
            }
        }
    }
}

impl core::error::Error for DecodeError {}

impl<'a> Decode<'a> for Packet {
    type Error = DecodeError;

    /// Decode the first complete frame found in `data`. Anything after it is
    /// ignored.
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let mut rx = Receiver::new(NoClock);
        for &b in data {
            rx.feed(b);
            if let Some(p) = rx.take_packet() {
                return Ok(p);
            }
        }
        match rx.error_count() {
            0 => Err(DecodeError::Incomplete),
            errors => Err(DecodeError::Rejected { errors }),
        }
    }
}
