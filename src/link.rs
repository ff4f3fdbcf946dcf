use core::convert::Infallible;
use core::fmt;

use crate::{
    clock::Clock,
    config::Config,
    frame::{self, MAX_PAYLOAD, SendError},
    packet::Packet,
    receiver::Receiver,
    serial::{ByteSink, ByteSource, Detached},
};

#[derive(Debug)]
pub enum LinkError<WriteError> {
    /// `send` on a link without a byte sink.
    NoSink,
    /// `poll` on a link without a byte source.
    NoSource,
    PayloadTooLong { len: usize },
    Write(WriteError),
}

impl<E> From<SendError<E>> for LinkError<E> {
    fn from(value: SendError<E>) -> Self {
        match value {
            SendError::PayloadTooLong { len } => LinkError::PayloadTooLong { len },
            SendError::Write(e) => LinkError::Write(e),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for LinkError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::NoSink => write!(f, "link has no byte sink to send with"),
            LinkError::NoSource => write!(f, "link has no byte source to poll"),
            LinkError::PayloadTooLong { len } => {
                write!(f, "payload of {len} bytes exceeds {MAX_PAYLOAD}")
            }
            LinkError::Write(e) => write!(f, "byte sink failed: {e:?}"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for LinkError<E> {}

/// One end of a point to point link: a transmitter, a receiver, or both.
///
/// A direction without a transport reports a configuration error when it is
/// used instead of silently doing nothing.
#[derive(Debug)]
pub struct Link<Tx, Rx, C: Clock> {
    tx: Option<Tx>,
    rx: Option<Rx>,
    receiver: Receiver<C>,
}

impl<Tx, Rx, C: Clock> Link<Tx, Rx, C> {
    pub fn new(tx: Tx, rx: Rx, clock: C) -> Link<Tx, Rx, C> {
        Link {
            tx: Some(tx),
            rx: Some(rx),
            receiver: Receiver::new(clock),
        }
    }

    pub fn with_config(mut self, config: Config) -> Link<Tx, Rx, C> {
        self.receiver.set_config(config);
        self
    }

    pub fn receiver(&self) -> &Receiver<C> {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut Receiver<C> {
        &mut self.receiver
    }

    pub fn sink_mut(&mut self) -> Option<&mut Tx> {
        self.tx.as_mut()
    }

    pub fn source_mut(&mut self) -> Option<&mut Rx> {
        self.rx.as_mut()
    }

    /// Swap in a new sink, handing back the old one.
    pub fn attach_sink(&mut self, tx: Tx) -> Option<Tx> {
        self.tx.replace(tx)
    }

    pub fn attach_source(&mut self, rx: Rx) -> Option<Rx> {
        self.rx.replace(rx)
    }

    /// Give the transports back. Queued packets are dropped with the link.
    pub fn detach(self) -> (Option<Tx>, Option<Rx>) {
        (self.tx, self.rx)
    }

    pub fn has_packet(&self) -> bool {
        self.receiver.has_packet()
    }

    pub fn take_packet(&mut self) -> Option<Packet> {
        self.receiver.take_packet()
    }

    pub fn error_count(&self) -> u32 {
        self.receiver.error_count()
    }

    pub fn last_packet_start(&self) -> Option<C::Instant> {
        self.receiver.last_packet_start()
    }

    pub fn is_packet_in_progress(&self) -> bool {
        self.receiver.is_packet_in_progress()
    }

    pub fn reset(&mut self) {
        self.receiver.reset()
    }
}

impl<Tx, C: Clock> Link<Tx, Detached, C> {
    pub fn transmit_only(tx: Tx, clock: C) -> Link<Tx, Detached, C> {
        Link {
            tx: Some(tx),
            rx: None,
            receiver: Receiver::new(clock),
        }
    }
}

impl<Rx, C: Clock> Link<Detached, Rx, C> {
    pub fn receive_only(rx: Rx, clock: C) -> Link<Detached, Rx, C> {
        Link {
            tx: None,
            rx: Some(rx),
            receiver: Receiver::new(clock),
        }
    }
}

impl<Tx: ByteSink, Rx, C: Clock> Link<Tx, Rx, C> {
    pub fn send(&mut self, payload: &[u8]) -> Result<(), LinkError<Tx::Error>> {
        let Some(tx) = self.tx.as_mut() else {
            return Err(LinkError::NoSink);
        };
        frame::send(tx, payload)?;
        Ok(())
    }
}

impl<Tx, Rx: ByteSource, C: Clock> Link<Tx, Rx, C> {
    /// See [`Receiver::poll`].
    pub fn poll(&mut self) -> Result<bool, LinkError<Infallible>> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(LinkError::NoSource);
        };
        Ok(self.receiver.poll(rx))
    }
}
