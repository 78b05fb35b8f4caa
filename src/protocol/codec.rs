//! Magic-byte length-delimited frame codec.
//!
//! Inbound wire format:
//! ```text
//! ┌────────────┬────────────┬───────────────────────┐
//! │ Magic (1B) │ Length (1B)│ Payload (Length bytes)│
//! │ 0x82       │            │                       │
//! └────────────┴────────────┴───────────────────────┘
//! ```
//!
//! The decoder accumulates incoming bytes and re-scans the cumulative
//! buffer for the magic byte, so it tolerates any interleaving of reads:
//! partial frames, several frames in one read, garbage between frames.
//! Complete payloads queue in arrival (FIFO) order.
//!
//! Outbound frames carry a 6-byte prefix for small payloads and a
//! 14-byte prefix with a 32-bit big-endian length for large ones.

use std::collections::VecDeque;

use crate::error::{ProtocolError, Result};

/// Frame delimiter byte.
pub const MAGIC_BYTE: u8 = 0x82;

/// Largest payload the small outbound prefix can express. At exactly
/// 0x80 the `0x80 + len` length byte would overflow, so 0x80-byte
/// payloads already use the large form.
pub const MAX_SMALL_PAYLOAD: usize = 0x7F;

/// Largest inbound payload (the length field is one byte).
pub const MAX_FRAME_SIZE: usize = 0xFF;

/// One reconstructed frame payload (magic and length bytes stripped).
pub type FramePayload = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// Streaming frame decoder.
pub struct FrameDecoder {
    buf: Vec<u8>,
    frames: VecDeque<FramePayload>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            frames: VecDeque::new(),
        }
    }

    /// Feed newly read bytes and scan for complete frames.
    ///
    /// Every complete frame moves to the internal queue; partial frames
    /// stay buffered awaiting more input. Returns the number of frames
    /// completed by this chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        self.buf.extend_from_slice(chunk);
        let mut completed = 0;

        loop {
            let Some(position) = self.buf.iter().position(|b| *b == MAGIC_BYTE) else {
                // No frame can start in a buffer without the magic byte.
                self.buf.clear();
                break;
            };
            // Need the length byte after the magic byte.
            if self.buf.len() < position + 2 {
                break;
            }
            let length = self.buf[position + 1] as usize;
            let expected_end = position + length + 2;
            if self.buf.len() < expected_end {
                break;
            }
            let mut payload = FramePayload::new();
            // Length is at most 0xFF, within the payload capacity.
            let _ = payload.extend_from_slice(&self.buf[position + 2..expected_end]);
            self.frames.push_back(payload);
            completed += 1;
            // Drop the consumed bytes, garbage prefix included.
            self.buf.drain(..expected_end);
        }
        completed
    }

    /// Dequeue the next complete frame payload, FIFO.
    pub fn next_frame(&mut self) -> Option<FramePayload> {
        self.frames.pop_front()
    }

    /// Number of complete frames waiting for dispatch.
    pub fn queued(&self) -> usize {
        self.frames.len()
    }

    /// Bytes buffered but not yet forming a complete frame.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    /// Reset decoder state (e.g. after a transport reconnect).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.frames.clear();
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode the outbound prefix for a payload of `len` bytes.
///
/// Small form (< 0x80 bytes): `[0x82, 0x80+len, 0, 0, 0, 0]`.
/// Large form: `[0x82, 0xFF, 0×4, len as u32 BE, 0×4]`.
pub fn encode_prefix(len: usize) -> Result<Vec<u8>> {
    if len <= MAX_SMALL_PAYLOAD {
        let mut prefix = vec![0u8; 6];
        prefix[0] = MAGIC_BYTE;
        prefix[1] = 0x80 + len as u8;
        Ok(prefix)
    } else {
        let len32 =
            u32::try_from(len).map_err(|_| ProtocolError::PayloadTooLarge(len))?;
        let mut prefix = vec![0u8; 14];
        prefix[0] = MAGIC_BYTE;
        prefix[1] = 0xFF;
        prefix[6..10].copy_from_slice(&len32.to_be_bytes());
        Ok(prefix)
    }
}

/// Encode a full outbound frame: prefix followed by the payload.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let mut frame = encode_prefix(payload.len())?;
    frame.extend_from_slice(payload);
    Ok(frame)
}
