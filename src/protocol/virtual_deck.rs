//! Socket client for on-screen (virtual) decks.
//!
//! A virtual deck renders in a separate UI process; we push finished
//! key images to it over TCP. Each update opens a fresh connection, so
//! the UI process can restart without any session state here.
//!
//! Wire format, all fields little-endian u32:
//! `[key][width][height][content_len][content bytes]`

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use log::{debug, warn};

/// Pushes rendered key images to a virtual deck UI.
pub struct VirtualDeckClient {
    addr: SocketAddr,
    connect_timeout: Duration,
}

impl VirtualDeckClient {
    pub fn new(addr: SocketAddr, connect_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
        }
    }

    /// Send one key image. Failures are logged, not propagated: a
    /// closed or absent UI must never stall the render path.
    pub fn send_key_image(&self, key: u32, width: u32, height: u32, content: &[u8]) {
        match self.try_send(key, width, height, content) {
            Ok(()) => debug!("virtual deck: key {key} updated ({width}x{height})"),
            Err(e) => warn!("virtual deck at {} unreachable: {e}", self.addr),
        }
    }

    fn try_send(&self, key: u32, width: u32, height: u32, content: &[u8]) -> std::io::Result<()> {
        let mut stream = TcpStream::connect_timeout(&self.addr, self.connect_timeout)?;
        let mut message = Vec::with_capacity(16 + content.len());
        for field in [key, width, height, content.len() as u32] {
            message.extend_from_slice(&field.to_le_bytes());
        }
        message.extend_from_slice(content);
        stream.write_all(&message)?;
        stream.flush()
    }
}
