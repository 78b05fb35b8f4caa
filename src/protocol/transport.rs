//! Byte transports for deck links.
//!
//! A [`Transport`] moves raw bytes between the protocol engine and a
//! physical (or simulated) deck. Framing lives above in
//! [`crate::protocol::codec`]; transports never inspect payloads.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::time::Duration;

use crate::error::TransportError;

/// A bidirectional byte stream to a deck.
///
/// `read` is non-blocking in spirit: it returns `Ok(0)` when no bytes
/// are available rather than waiting, so a poll loop can interleave
/// reads with other work.
pub trait Transport: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;
    fn flush(&mut self) -> Result<(), TransportError>;

    /// True while the link is believed usable.
    fn is_connected(&self) -> bool;
}

/// Transport that goes nowhere: reads nothing, discards writes. Stands
/// in for a deck link when running without hardware attached.
pub struct NullTransport;

impl Transport for NullTransport {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(0)
    }

    fn write(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// TCP-backed transport (networked decks, or a serial-over-TCP bridge).
pub struct TcpTransport {
    stream: TcpStream,
    connected: bool,
}

impl TcpTransport {
    /// Connect with a bounded timeout and a short read timeout so the
    /// poll loop never parks indefinitely.
    pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, TransportError> {
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(TransportError::from)?;
        stream
            .set_read_timeout(Some(Duration::from_millis(5)))
            .map_err(TransportError::from)?;
        stream.set_nodelay(true).map_err(TransportError::from)?;
        Ok(Self {
            stream,
            connected: true,
        })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        match self.stream.read(buf) {
            // Orderly shutdown by the peer.
            Ok(0) => {
                self.connected = false;
                Err(TransportError::NotConnected)
            }
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(0),
            Err(e) => {
                self.connected = false;
                Err(TransportError::from(e))
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.stream.write_all(data).map_err(|e| {
            self.connected = false;
            TransportError::from(e)
        })
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.stream.flush().map_err(TransportError::from)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// In-memory transport pair for tests: bytes written to one end become
/// readable on the other.
pub struct LoopbackTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    carry: Vec<u8>,
    connected: bool,
}

impl LoopbackTransport {
    /// Create two connected endpoints.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = channel();
        let (b_tx, b_rx) = channel();
        (
            Self {
                tx: a_tx,
                rx: b_rx,
                carry: Vec::new(),
                connected: true,
            },
            Self {
                tx: b_tx,
                rx: a_rx,
                carry: Vec::new(),
                connected: true,
            },
        )
    }
}

impl Transport for LoopbackTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.carry.is_empty() {
            match self.rx.try_recv() {
                Ok(chunk) => self.carry = chunk,
                Err(TryRecvError::Empty) => return Ok(0),
                Err(TryRecvError::Disconnected) => {
                    self.connected = false;
                    return Err(TransportError::NotConnected);
                }
            }
        }
        let n = self.carry.len().min(buf.len());
        buf[..n].copy_from_slice(&self.carry[..n]);
        self.carry.drain(..n);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(data.to_vec())
            .map_err(|_| TransportError::NotConnected)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
