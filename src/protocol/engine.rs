//! Deck protocol engine: message construction, transaction tracking and
//! inbound frame dispatch.
//!
//! The engine is transport-agnostic. Command builders return the full
//! encoded frame for the caller to write; [`ProtocolEngine::dispatch`]
//! consumes reconstructed frame payloads and yields the events that no
//! pending request claimed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{ProtocolError, Result};
use crate::events::{self, DeckEvent};
use crate::protocol::codec::{self, FramePayload};

/// Inbound/outbound message headers (big-endian u16 on the wire).
pub mod headers {
    pub const CONFIRM: u16 = 0x0302;
    pub const SERIAL_OUT: u16 = 0x0303;
    pub const VERSION_OUT: u16 = 0x0307;
    pub const TICK: u16 = 0x0400;
    pub const SET_BRIGHTNESS: u16 = 0x0409;
    pub const SET_VIBRATION: u16 = 0x041B;
    pub const BUTTON_PRESS: u16 = 0x0500;
    pub const KNOB_ROTATE: u16 = 0x0501;
    pub const RESET: u16 = 0x0506;
    pub const DRAW: u16 = 0x050F;
    pub const SET_COLOR: u16 = 0x0702;
    pub const TOUCH: u16 = 0x094D;
    pub const TOUCH_END: u16 = 0x096D;
    pub const VERSION_IN: u16 = 0x0C07;
    pub const SERIAL_IN: u16 = 0x1F03;
    pub const WRITE_FRAMEBUFF: u16 = 0xFF10;
}

/// Haptic feedback patterns accepted by `SET_VIBRATION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Haptic {
    Short = 0x01,
    Medium = 0x0A,
    Long = 0x0F,
    Low = 0x31,
}

/// Addressable display regions with their two-byte wire ids and pixel
/// dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayId {
    Left,
    Center,
    Right,
}

impl DisplayId {
    pub fn wire_id(self) -> [u8; 2] {
        match self {
            Self::Left => [0x00, 0x4C],
            Self::Center => [0x00, 0x41],
            Self::Right => [0x00, 0x52],
        }
    }

    /// (width, height) in pixels.
    pub fn dimensions(self) -> (u16, u16) {
        match self {
            Self::Left | Self::Right => (60, 270),
            Self::Center => (360, 270),
        }
    }
}

/// Center display key grid geometry.
pub const KEY_SIZE: u16 = 90;
pub const KEYS_PER_ROW: u16 = 4;

struct Pending {
    action: u16,
    sent_at: Instant,
    resolver: Option<Box<dyn FnOnce(u8, &DeckEvent) + Send>>,
}

/// Outcome of routing one inbound frame.
///
/// Resolvers are handed back rather than invoked inside
/// [`ProtocolEngine::dispatch`]: the engine usually sits behind a
/// mutex, and a resolver is allowed to issue follow-up commands through
/// that same handle, so it must only run once the caller has released
/// its lock.
pub enum Dispatch {
    /// Unsolicited event, for the caller's sink.
    Event(DeckEvent),
    /// Reply to a tracked request. Run `resolver` after releasing any
    /// engine lock.
    Resolved {
        txid: u8,
        event: DeckEvent,
        resolver: Box<dyn FnOnce(u8, &DeckEvent) + Send>,
    },
    /// Confirmation of an untracked command, or a dropped runt frame.
    None,
}

/// Builds outbound messages and routes inbound frames.
pub struct ProtocolEngine {
    next_txid: u8,
    pending: HashMap<u8, Pending>,
    pending_timeout: Duration,
}

impl ProtocolEngine {
    pub fn new(pending_timeout: Duration) -> Self {
        Self {
            next_txid: 0,
            pending: HashMap::new(),
            pending_timeout,
        }
    }

    /// Allocate the next transaction id, cycling through 1..=255 and
    /// skipping ids still awaiting a response. Id 0 is reserved for
    /// unsolicited deck messages.
    fn alloc_txid(&mut self) -> Result<u8> {
        for _ in 0..255 {
            self.next_txid = self.next_txid.wrapping_add(1);
            if self.next_txid == 0 {
                self.next_txid = 1;
            }
            if !self.pending.contains_key(&self.next_txid) {
                return Ok(self.next_txid);
            }
        }
        Err(ProtocolError::TransactionSpaceExhausted.into())
    }

    /// Number of requests still awaiting a deck response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Build `[action:u16 BE][txid][data...]` and frame it for the wire.
    fn build_frame(&self, action: u16, txid: u8, data: &[u8]) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(3 + data.len());
        payload.extend_from_slice(&action.to_be_bytes());
        payload.push(txid);
        payload.extend_from_slice(data);
        codec::encode_frame(&payload)
    }

    /// Send an untracked command: the eventual `CONFIRM` (if any) is
    /// dropped silently at dispatch.
    pub fn do_action(&mut self, action: u16, data: &[u8]) -> Result<Vec<u8>> {
        let txid = self.alloc_txid()?;
        self.pending.insert(
            txid,
            Pending {
                action,
                sent_at: Instant::now(),
                resolver: None,
            },
        );
        self.build_frame(action, txid, data)
    }

    /// Send a tracked request; `resolver` runs once when the deck
    /// responds with the same transaction id.
    pub fn do_tracked_action(
        &mut self,
        action: u16,
        data: &[u8],
        resolver: Box<dyn FnOnce(u8, &DeckEvent) + Send>,
    ) -> Result<Vec<u8>> {
        let txid = self.alloc_txid()?;
        self.pending.insert(
            txid,
            Pending {
                action,
                sent_at: Instant::now(),
                resolver: Some(resolver),
            },
        );
        self.build_frame(action, txid, data)
    }

    /// Route one reconstructed frame payload.
    ///
    /// Frames answering a tracked request yield their resolver for the
    /// caller to run; unsolicited frames decode into a [`DeckEvent`]
    /// for the caller's sink. Unknown headers pass through as
    /// [`DeckEvent::Raw`] so callers can log or inspect them.
    pub fn dispatch(&mut self, frame: &FramePayload) -> Dispatch {
        if frame.len() < 3 {
            warn!("dispatch: runt frame ({} bytes), dropped", frame.len());
            return Dispatch::None;
        }
        let header = u16::from_be_bytes([frame[0], frame[1]]);
        let txid = frame[2];
        let body = &frame[3..];

        let Some(event) = self.decode(header, body) else {
            return Dispatch::None;
        };

        if txid != 0 {
            if let Some(pending) = self.pending.remove(&txid) {
                if let Some(resolver) = pending.resolver {
                    return Dispatch::Resolved {
                        txid,
                        event,
                        resolver,
                    };
                }
                debug!("confirmed action 0x{:04X} (txid {txid})", pending.action);
                return Dispatch::None;
            }
            // A txid we never issued: treat as unsolicited.
            debug!("response for unknown txid {txid}, forwarding as event");
        }
        Dispatch::Event(event)
    }

    fn decode(&self, header: u16, body: &[u8]) -> Option<DeckEvent> {
        match header {
            headers::CONFIRM => Some(DeckEvent::Tick),
            headers::BUTTON_PRESS => events::decode_button(body),
            headers::KNOB_ROTATE => events::decode_knob(body),
            headers::TOUCH => events::decode_touch(body, false),
            headers::TOUCH_END => events::decode_touch(body, true),
            headers::SERIAL_OUT | headers::SERIAL_IN => events::decode_serial(body),
            headers::VERSION_OUT | headers::VERSION_IN => events::decode_version(body),
            headers::TICK => Some(DeckEvent::Tick),
            other => Some(DeckEvent::Raw {
                header: other,
                body: body.to_vec(),
            }),
        }
    }

    /// Drop pending requests older than the configured timeout, warning
    /// for each so a silent deck is visible in the logs.
    pub fn expire_stale(&mut self) {
        let timeout = self.pending_timeout;
        let now = Instant::now();
        self.pending.retain(|txid, p| {
            let alive = now.duration_since(p.sent_at) < timeout;
            if !alive {
                warn!(
                    "no response to action 0x{:04X} (txid {txid}) within {timeout:?}, dropping",
                    p.action
                );
            }
            alive
        });
    }

    // -- deck commands ------------------------------------------------------

    /// Backlight level 0..=10 (clamped).
    pub fn set_brightness(&mut self, level: u8) -> Result<Vec<u8>> {
        self.do_action(headers::SET_BRIGHTNESS, &[level.min(10)])
    }

    /// Set a button's RGB backlight color.
    pub fn set_button_color(&mut self, button: u8, r: u8, g: u8, b: u8) -> Result<Vec<u8>> {
        self.do_action(headers::SET_COLOR, &[button, r, g, b])
    }

    pub fn vibrate(&mut self, pattern: Haptic) -> Result<Vec<u8>> {
        self.do_action(headers::SET_VIBRATION, &[pattern as u8])
    }

    /// Flush a display's framebuffer to the panel.
    pub fn refresh(&mut self, display: DisplayId) -> Result<Vec<u8>> {
        self.do_action(headers::DRAW, &display.wire_id())
    }

    pub fn reset(&mut self) -> Result<Vec<u8>> {
        self.do_action(headers::RESET, &[])
    }

    /// Write RGB565 pixel data to a rectangle of a display.
    ///
    /// `pixels` must hold exactly `width * height * 2` bytes.
    pub fn write_framebuffer(
        &mut self,
        display: DisplayId,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        pixels: &[u8],
    ) -> Result<Vec<u8>> {
        let expected = usize::from(width) * usize::from(height) * 2;
        if pixels.len() != expected {
            return Err(ProtocolError::BadFramebufferLength {
                expected,
                got: pixels.len(),
            }
            .into());
        }
        let mut data = Vec::with_capacity(10 + pixels.len());
        data.extend_from_slice(&display.wire_id());
        data.extend_from_slice(&x.to_be_bytes());
        data.extend_from_slice(&y.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(pixels);
        self.do_action(headers::WRITE_FRAMEBUFF, &data)
    }

    /// Write one key image on the center display. Keys tile a 4×3 grid
    /// of 90×90 cells, numbered row-major from the top left.
    pub fn set_key_image(&mut self, key: u8, pixels: &[u8]) -> Result<Vec<u8>> {
        let x = u16::from(key) % KEYS_PER_ROW * KEY_SIZE;
        let y = u16::from(key) / KEYS_PER_ROW * KEY_SIZE;
        self.write_framebuffer(DisplayId::Center, x, y, KEY_SIZE, KEY_SIZE, pixels)
    }

    /// Ask the deck for its serial number and firmware version; each
    /// answer runs the matching resolver.
    pub fn request_info(
        &mut self,
        on_serial: Box<dyn FnOnce(u8, &DeckEvent) + Send>,
        on_version: Box<dyn FnOnce(u8, &DeckEvent) + Send>,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let serial = self.do_tracked_action(headers::SERIAL_IN, &[], on_serial)?;
        let version = self.do_tracked_action(headers::VERSION_IN, &[], on_version)?;
        Ok((serial, version))
    }
}
