//! Incremental frame receiver.
//!
//! [`Receiver`] eats wire bytes one at a time and queues every payload whose
//! checksum verifies. Anything malformed bumps the error counter and throws
//! the partial packet away; the next STX starts a fresh one, so a burst of
//! line noise costs at most the packet it landed in.

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::collections::vec_deque::Drain;

use crate::{
    clock::{Clock, NoClock},
    config::Config,
    crc8,
    frame::{ETX, STX},
    nibble,
    packet::{Packet, PacketBuffer},
    serial::ByteSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Between packets. Everything except the markers is ignored.
    #[default]
    Waiting,
    /// After STX, collecting payload bytes.
    ReceivingData,
    /// After ETX, the next byte is the checksum.
    ReceivingCrc,
}

/// Why a packet got dropped. Only used for logging, callers just see the
/// counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// STX in the middle of a packet.
    Resync,
    /// ETX between the two halves of a byte.
    SplitByte,
    BadNibble(u8),
    Overflow { limit: u8 },
    Checksum { calculated: u8, found: u8 },
}

#[derive(Debug)]
pub struct Receiver<C: Clock> {
    clock: C,
    config: Config,
    state: State,
    data: PacketBuffer,
    /// High nibble waiting for its low half.
    pending: Option<u8>,
    errors: u32,
    started_at: Option<C::Instant>,
    completed: VecDeque<Packet>,
}

impl Default for Receiver<NoClock> {
    fn default() -> Self {
        Receiver::new(NoClock)
    }
}

impl<C: Clock> Receiver<C> {
    pub fn new(clock: C) -> Receiver<C> {
        Receiver::with_config(clock, Config::default())
    }

    pub fn with_config(clock: C, config: Config) -> Receiver<C> {
        Receiver {
            clock,
            config,
            state: State::Waiting,
            data: PacketBuffer::new(),
            pending: None,
            errors: 0,
            started_at: None,
            completed: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Applies from the next byte on. A packet already longer than a new,
    /// smaller `max_payload` overflows on its next byte.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Process the bytes `source` has right now, without waiting for more.
    /// Bytes that turn up while this runs are left for the next call.
    ///
    /// Returns true if at least one packet is ready to take.
    pub fn poll<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> bool {
        self.expire_stale();
        for _ in 0..source.available() {
            match source.read() {
                Some(byte) => self.feed(byte),
                None => break,
            }
        }
        self.has_packet()
    }

    /// Run one wire byte through the state machine.
    pub fn feed(&mut self, byte: u8) {
        match byte {
            STX => {
                self.started_at = Some(self.clock.now());
                if self.state != State::Waiting {
                    self.fault(Fault::Resync);
                }
                self.reset();
                self.state = State::ReceivingData;
            }
            // ETX is honoured in every state, even before any STX
            ETX => match self.pending {
                None => self.state = State::ReceivingCrc,
                Some(_) => self.fault(Fault::SplitByte),
            },
            _ if self.state == State::Waiting => {
                log::trace!("ignoring 0x{byte:02X} while waiting for STX");
            }
            _ => match nibble::decode(byte) {
                Err(e) => self.fault(Fault::BadNibble(e.found)),
                Ok(low) => match self.pending.take() {
                    None => self.pending = Some(low),
                    Some(high) => self.accept(nibble::combine(high, low)),
                },
            },
        }
    }

    /// A whole byte has been decoded.
    fn accept(&mut self, byte: u8) {
        match self.state {
            State::ReceivingData => {
                let limit = self.config.max_payload;
                if self.data.len() >= usize::from(limit) || self.data.push(byte).is_err() {
                    self.fault(Fault::Overflow { limit });
                }
            }
            State::ReceivingCrc => {
                let calculated = crc8::checksum(&self.data);
                if calculated != byte {
                    self.fault(Fault::Checksum {
                        calculated,
                        found: byte,
                    });
                    return;
                }
                let packet = Packet::new(core::mem::take(&mut self.data));
                log::debug!("received {} byte packet", packet.len());
                self.completed.push_back(packet);
                self.reset();
            }
            // bytes are dropped before decoding while waiting
            State::Waiting => {}
        }
    }

    fn fault(&mut self, fault: Fault) {
        self.errors = self.errors.saturating_add(1);
        log::warn!(
            "dropping packet: {fault:?} ({} errors so far)",
            self.errors
        );
        self.reset();
    }

    /// Drop the packet in progress, if any, and wait for the next STX.
    /// Completed packets, the error count and the last start time are kept.
    pub fn reset(&mut self) {
        self.data.clear();
        self.pending = None;
        self.state = State::Waiting;
    }

    /// Abandon the packet in progress if it has been open longer than
    /// [`Config::packet_timeout`]. This is a cancellation, it doesn't count
    /// as an error. Returns true if a packet was dropped.
    pub fn expire_stale(&mut self) -> bool {
        let (Some(timeout), Some(started)) = (self.config.packet_timeout, self.started_at) else {
            return false;
        };
        if self.state == State::Waiting || self.clock.elapsed(started) <= timeout {
            return false;
        }
        log::debug!("abandoning packet started at {started:?}, older than {timeout:?}");
        self.reset();
        true
    }

    pub fn has_packet(&self) -> bool {
        !self.completed.is_empty()
    }

    /// Oldest completed packet.
    pub fn take_packet(&mut self) -> Option<Packet> {
        self.completed.pop_front()
    }

    /// Take every completed packet, oldest first.
    pub fn packets(&mut self) -> Drain<'_, Packet> {
        self.completed.drain(..)
    }

    /// Number of completed packets waiting to be taken.
    pub fn queued(&self) -> usize {
        self.completed.len()
    }

    /// Protocol errors since this receiver was created.
    pub fn error_count(&self) -> u32 {
        self.errors
    }

    /// When the most recent STX arrived, whether or not that packet made it.
    pub fn last_packet_start(&self) -> Option<C::Instant> {
        self.started_at
    }

    pub fn is_packet_in_progress(&self) -> bool {
        self.state != State::Waiting
    }

    pub fn state(&self) -> State {
        self.state
    }
}
