#![cfg_attr(not(any(test, feature = "std")), no_std)]
//! Framing for half-duplex serial links such as RS-485.
//!
//! A payload of up to 255 bytes goes on the wire as
//!
//! ```text
//! STX, hi(b0), lo(b0), ..., hi(bn), lo(bn), ETX, hi(crc), lo(crc)
//! ```
//!
//! where every data and checksum byte is split into nibbles and each nibble
//! is sent together with its complement (see [`nibble`]). The checksum is
//! the Dallas/Maxim CRC-8 of the payload (see [`crc8`]).
//!
//! [`send`] writes a frame to a [`ByteSink`]. A [`Receiver`] is polled with
//! a [`ByteSource`] and queues every packet that arrives intact; damaged
//! packets are dropped and counted. [`Link`] bundles both directions.

mod clock;
mod config;
pub mod crc8;
mod frame;
mod link;
pub mod nibble;
mod packet;
mod receiver;
mod serial;

pub trait Encode {
    type Error;

    /// Encode into `buffer`, returning the number of bytes used.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

#[cfg(feature = "std")]
pub use clock::StdClock;
pub use clock::{Clock, MillisClock, NoClock};
pub use config::Config;
pub use frame::{
    ETX, EncodeError, MAX_FRAME_SIZE, MAX_PAYLOAD, STX, SendError, encoded_len, send, wire_bytes,
};
pub use link::{Link, LinkError};
pub use packet::{DecodeError, Packet, PacketBuffer};
pub use receiver::{Receiver, State};
pub use serial::{BufferedRx, BufferedTx, ByteSink, ByteSource, Detached, ErrorShim};
