extern crate alloc;

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_hal_nb::serial::{Error, Read, Write};

use crate::frame::MAX_FRAME_SIZE;

/// Where outgoing wire bytes go. Must not block.
pub trait ByteSink {
    type Error;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;
}

/// Where incoming wire bytes come from. Must not block.
pub trait ByteSource {
    /// Number of bytes that can be read right now.
    fn available(&mut self) -> usize;

    /// Next byte, or `None` if nothing is available.
    fn read(&mut self) -> Option<u8>;
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    type Error = T::Error;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        (**self).write(byte)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }
}

impl ByteSink for Vec<u8> {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.push(byte);
        Ok(())
    }
}

impl ByteSink for VecDeque<u8> {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.push_back(byte);
        Ok(())
    }
}

impl ByteSource for VecDeque<u8> {
    fn available(&mut self) -> usize {
        self.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

/// Stands in for a direction of a link that has no transport attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Detached;

impl ByteSink for Detached {
    type Error = Infallible;

    fn write(&mut self, _byte: u8) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl ByteSource for Detached {
    fn available(&mut self) -> usize {
        0
    }

    fn read(&mut self) -> Option<u8> {
        None
    }
}

/// Buffers bytes from a non-blocking UART so they can be counted before
/// they are read.
#[derive(Debug)]
pub struct BufferedRx<Rx: Read> {
    rx: Rx,
    buf: VecDeque<u8>,
    faults: u32,
}

impl<Rx: Read> BufferedRx<Rx> {
    pub fn new(rx: Rx) -> BufferedRx<Rx> {
        BufferedRx {
            rx,
            buf: VecDeque::new(),
            faults: 0,
        }
    }

    /// Load what the UART has into the internal buffer. Stops after one
    /// maximum sized frame worth of bytes so a flooded line can't keep us
    /// here forever; `Ok` means the limit was hit.
    pub fn buffer(&mut self) -> nb::Result<(), Rx::Error> {
        for _ in 0..MAX_FRAME_SIZE {
            let c = self.rx.read()?;
            self.buf.push_back(c);
        }
        Ok(())
    }

    /// Hardware read errors seen so far (overrun, noise, parity, ...).
    pub fn faults(&self) -> u32 {
        self.faults
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn get_mut(&mut self) -> &mut Rx {
        &mut self.rx
    }

    pub fn into_inner(self) -> Rx {
        self.rx
    }
}

impl<Rx: Read> ByteSource for BufferedRx<Rx> {
    fn available(&mut self) -> usize {
        if let Err(nb::Error::Other(e)) = self.buffer() {
            self.faults = self.faults.saturating_add(1);
            log::warn!("serial read error: {:?}", e.kind());
        }
        self.buf.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.buf.pop_front()
    }
}

/// Queues outgoing bytes and hands them to a non-blocking UART as fast as
/// it will take them.
#[derive(Debug)]
pub struct BufferedTx<Tx: Write> {
    tx: Tx,
    buf: VecDeque<u8>,
}

impl<Tx: Write> BufferedTx<Tx> {
    pub fn new(tx: Tx) -> BufferedTx<Tx> {
        BufferedTx {
            tx,
            buf: VecDeque::new(),
        }
    }

    /// Bytes accepted but not yet taken by the UART.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Move queued bytes into the UART until it would block.
    fn drain(&mut self) -> nb::Result<(), Tx::Error> {
        while let Some(&x) = self.buf.front() {
            self.tx.write(x)?;
            self.buf.pop_front();
        }
        Ok(())
    }

    /// Drain the queue and wait for the UART to finish, `nb` style.
    /// Call again on `WouldBlock`.
    pub fn flush(&mut self) -> nb::Result<(), Tx::Error> {
        self.drain()?;
        self.tx.flush()
    }

    pub fn get_mut(&mut self) -> &mut Tx {
        &mut self.tx
    }

    pub fn into_inner(self) -> Tx {
        self.tx
    }
}

/// `WouldBlock` just means the bytes stay queued.
fn queued<E>(r: nb::Result<(), E>) -> Result<(), E> {
    match r {
        Ok(()) | Err(nb::Error::WouldBlock) => Ok(()),
        Err(nb::Error::Other(e)) => Err(e),
    }
}

impl<Tx: Write> ByteSink for BufferedTx<Tx> {
    type Error = Tx::Error;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.buf.push_back(byte);
        queued(self.drain())
    }
}

#[derive(Debug)]
pub struct ErrorShim<T: Error>(pub T);

impl<T: Error> embedded_io::Error for ErrorShim<T> {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_hal_nb::serial::ErrorKind::*;
        match self.0.kind() {
            Overrun => embedded_io::ErrorKind::OutOfMemory,
            FrameFormat | Parity => embedded_io::ErrorKind::InvalidData,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl<T: Error> From<T> for ErrorShim<T> {
    fn from(value: T) -> Self {
        ErrorShim(value)
    }
}

impl<Tx: Write> embedded_io::ErrorType for BufferedTx<Tx> {
    type Error = ErrorShim<Tx::Error>;
}

/// `write` queues the whole slice and never waits; `flush` blocks until the
/// UART has sent everything.
impl<Tx: Write> embedded_io::Write for BufferedTx<Tx> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.buf.extend(buf.iter().copied());
        queued(self.drain()).map_err(ErrorShim)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        nb::block!(BufferedTx::flush(self)).map_err(ErrorShim)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embedded_hal_nb::serial::{ErrorKind, ErrorType};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FakeError(pub ErrorKind);

    impl Error for FakeError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    /// A UART with a receive FIFO and a transmit FIFO of limited depth.
    #[derive(Debug, Default)]
    pub struct FakeUart {
        pub incoming: VecDeque<Result<u8, FakeError>>,
        pub fifo: Vec<u8>,
        pub fifo_depth: usize,
        pub wire: Vec<u8>,
        /// Each blocked write or flush sends the FIFO out, like a real UART
        /// making progress between busy polls.
        pub shifting: bool,
    }

    impl FakeUart {
        pub fn with_depth(fifo_depth: usize) -> FakeUart {
            FakeUart {
                fifo_depth,
                ..FakeUart::default()
            }
        }

        pub fn receive(&mut self, bytes: &[u8]) {
            self.incoming.extend(bytes.iter().map(|b| Ok(*b)));
        }

        /// Pretend the shift register sent everything in the FIFO.
        pub fn shift_out(&mut self) {
            self.wire.append(&mut self.fifo);
        }
    }

    impl ErrorType for FakeUart {
        type Error = FakeError;
    }

    impl Read for FakeUart {
        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            match self.incoming.pop_front() {
                Some(Ok(b)) => Ok(b),
                Some(Err(e)) => Err(nb::Error::Other(e)),
                None => Err(nb::Error::WouldBlock),
            }
        }
    }

    impl Write for FakeUart {
        fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            if self.fifo.len() >= self.fifo_depth {
                if self.shifting {
                    self.shift_out();
                }
                return Err(nb::Error::WouldBlock);
            }
            self.fifo.push(word);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            if self.fifo.is_empty() {
                return Ok(());
            }
            if self.shifting {
                self.shift_out();
            }
            Err(nb::Error::WouldBlock)
        }
    }

    #[test]
    fn vecdeque_is_a_loopback() {
        let mut q = VecDeque::<u8>::new();
        ByteSink::write(&mut q, 0x02).unwrap();
        ByteSink::write(&mut q, 0x0F).unwrap();
        assert_eq!(q.available(), 2);
        assert_eq!(ByteSource::read(&mut q), Some(0x02));
        assert_eq!(ByteSource::read(&mut q), Some(0x0F));
        assert_eq!(ByteSource::read(&mut q), None);
    }

    #[test]
    fn detached_has_nothing() {
        let mut d = Detached;
        assert_eq!(d.available(), 0);
        assert_eq!(d.read(), None);
    }

    #[test]
    fn buffered_rx_counts_what_the_uart_holds() {
        let mut uart = FakeUart::default();
        uart.receive(&[1, 2, 3]);
        let mut rx = BufferedRx::new(uart);
        assert_eq!(rx.buffered(), 0);
        assert_eq!(rx.available(), 3);
        assert_eq!(rx.buffered(), 3);
        assert_eq!(rx.read(), Some(1));
        assert_eq!(rx.available(), 2);
        assert_eq!(rx.faults(), 0);
    }

    #[test]
    fn buffered_rx_counts_faults_and_keeps_going() {
        let mut uart = FakeUart::default();
        uart.receive(&[1]);
        uart.incoming.push_back(Err(FakeError(ErrorKind::Overrun)));
        uart.receive(&[2]);
        let mut rx = BufferedRx::new(uart);
        assert_eq!(rx.available(), 1);
        assert_eq!(rx.faults(), 1);
        assert_eq!(rx.available(), 2);
        assert_eq!(rx.read(), Some(1));
        assert_eq!(rx.read(), Some(2));
    }

    #[test]
    fn buffered_rx_stops_at_one_frame_per_call() {
        let mut uart = FakeUart::default();
        uart.receive(&[0x0F; MAX_FRAME_SIZE + 10]);
        let mut rx = BufferedRx::new(uart);
        assert_eq!(rx.available(), MAX_FRAME_SIZE);
        assert_eq!(rx.available(), MAX_FRAME_SIZE + 10);
    }

    #[test]
    fn buffered_tx_queues_when_fifo_is_full() {
        let mut tx = BufferedTx::new(FakeUart::with_depth(2));
        for b in [1, 2, 3, 4, 5] {
            ByteSink::write(&mut tx, b).unwrap();
        }
        assert_eq!(tx.pending(), 3);
        assert!(matches!(tx.flush(), Err(nb::Error::WouldBlock)));

        let mut uart = tx.into_inner();
        uart.shift_out();
        assert_eq!(uart.wire, [1, 2]);
    }

    #[test]
    fn buffered_tx_flush_drains_everything() {
        let mut tx = BufferedTx::new(FakeUart::with_depth(usize::MAX));
        for b in [1, 2, 3] {
            ByteSink::write(&mut tx, b).unwrap();
        }
        assert_eq!(tx.pending(), 0);
        let mut uart = tx.into_inner();
        uart.shift_out();
        assert_eq!(uart.wire, [1, 2, 3]);
    }

    #[test]
    fn buffered_tx_as_embedded_io() {
        let mut uart = FakeUart::with_depth(4);
        uart.shifting = true;
        let mut tx = BufferedTx::new(uart);
        let n = embedded_io::Write::write(&mut tx, &[9, 8, 7, 6, 5, 4]).unwrap();
        assert_eq!(n, 6);
        assert_eq!(tx.pending(), 2);

        embedded_io::Write::flush(&mut tx).unwrap();
        assert_eq!(tx.pending(), 0);
        let uart = tx.into_inner();
        assert!(uart.fifo.is_empty());
        assert_eq!(uart.wire, [9, 8, 7, 6, 5, 4]);
    }

    #[test]
    fn error_shim_maps_kinds() {
        use embedded_io::Error as _;
        assert_eq!(
            ErrorShim(FakeError(ErrorKind::Overrun)).kind(),
            embedded_io::ErrorKind::OutOfMemory
        );
        assert_eq!(
            ErrorShim(FakeError(ErrorKind::Parity)).kind(),
            embedded_io::ErrorKind::InvalidData
        );
        assert_eq!(
            ErrorShim(FakeError(ErrorKind::Noise)).kind(),
            embedded_io::ErrorKind::Other
        );
    }
}
