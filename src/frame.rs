use core::fmt;
use core::iter;

use crate::{Encode, crc8, nibble, serial::ByteSink};

/// Start of a frame. Sent raw.
pub const STX: u8 = 0x02;
/// End of the payload, the checksum follows. Sent raw.
pub const ETX: u8 = 0x03;
/// A payload is at most u8::MAX bytes
pub const MAX_PAYLOAD: usize = u8::MAX as usize;
/// STX: 1, Data: 2 * MAX_PAYLOAD, ETX: 1, CRC: 2
pub const MAX_FRAME_SIZE: usize = encoded_len(MAX_PAYLOAD);

/// Wire length of a frame carrying `payload_len` bytes.
pub const fn encoded_len(payload_len: usize) -> usize {
    1 + 2 * payload_len + 1 + 2
}

/// The wire bytes of one frame:
/// `STX, data nibbles..., ETX, crc nibbles`
pub fn wire_bytes(payload: &[u8]) -> impl Iterator<Item = u8> + '_ {
    let crc = crc8::checksum(payload);
    iter::once(STX)
        .chain(payload.iter().flat_map(|b| nibble::encode(*b)))
        .chain(iter::once(ETX))
        .chain(nibble::encode(crc))
}

#[derive(Debug)]
pub enum SendError<E> {
    PayloadTooLong { len: usize },
    Write(E),
}

impl<E: fmt::Debug> fmt::Display for SendError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::PayloadTooLong { len } => {
                write!(f, "payload of {len} bytes exceeds {MAX_PAYLOAD}")
            }
            SendError::Write(e) => write!(f, "byte sink failed: {e:?}"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for SendError<E> {}

/// Write one frame to `sink`.
///
/// Oversized payloads are refused before anything is written. A failing
/// sink stops the frame where it is; the receiving end drops the partial
/// frame and picks up again at the next STX.
pub fn send<S: ByteSink + ?Sized>(sink: &mut S, payload: &[u8]) -> Result<(), SendError<S::Error>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(SendError::PayloadTooLong { len: payload.len() });
    }
    for b in wire_bytes(payload) {
        sink.write(b).map_err(SendError::Write)?;
    }
    log::trace!("sent frame with {} byte payload", payload.len());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    PayloadTooLong { len: usize },
    BufferTooSmall { expected: usize, found: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::PayloadTooLong { len } => {
                write!(f, "payload of {len} bytes exceeds {MAX_PAYLOAD}")
            }
            EncodeError::BufferTooSmall { expected, found } => {
                write!(f, "frame needs {expected} bytes, buffer has {found}")
            }
        }
    }
}

impl core::error::Error for EncodeError {}

impl Encode for [u8] {
    type Error = EncodeError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        if self.len() > MAX_PAYLOAD {
            return Err(EncodeError::PayloadTooLong { len: self.len() });
        }
        let size = encoded_len(self.len());
        if buffer.len() < size {
            return Err(EncodeError::BufferTooSmall {
                expected: size,
                found: buffer.len(),
            });
        }
        for (slot, b) in buffer.iter_mut().zip(wire_bytes(self)) {
            *slot = b;
        }
        Ok(size)
    }
}
