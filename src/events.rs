//! Deck input events.
//!
//! Complete frames dispatched by the protocol engine decode into these
//! events: button pushes, knob rotations, touchscreen contact with the
//! 4×3 key grid mapping, and device identification replies. Decoders are
//! total over the body bytes — a short body yields a logged warning and
//! no event, never a panic.

use log::warn;

/// Touchscreen region of a Loupedeck-style deck: two side strips and a
/// center 4×3 key grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckScreen {
    Left,
    Center,
    Right,
}

/// One decoded input or reply from the deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckEvent {
    /// Physical button push or release.
    Button { id: u8, pressed: bool },
    /// Knob rotation by one detent.
    Knob { id: u8, clockwise: bool },
    /// Touchscreen contact. `key` is set only for the center grid.
    Touch {
        id: u8,
        x: u16,
        y: u16,
        screen: DeckScreen,
        key: Option<u8>,
        ended: bool,
    },
    /// Device serial number reply.
    Serial(String),
    /// Firmware version reply.
    Version(String),
    /// Keep-alive tick from the device.
    Tick,
    /// Message with no dedicated decoder; raw payload preserved.
    Raw { header: u16, body: Vec<u8> },
}

/// Consumer of decoded deck events (a deck driver, a page, a test probe).
pub trait DeckEventSink: Send {
    fn on_event(&mut self, event: DeckEvent);
}

// ── Screen geometry (LoupedeckLive) ──────────────────────────

const LEFT_STRIP_MAX_X: u16 = 60;
const RIGHT_STRIP_MIN_X: u16 = 420;
const KEY_SIZE: u16 = 90;
const KEY_COLUMNS: u16 = 4;

// ── Body decoders ────────────────────────────────────────────

pub fn decode_button(body: &[u8]) -> Option<DeckEvent> {
    if body.len() < 2 {
        warn!("button event body too short ({} bytes)", body.len());
        return None;
    }
    Some(DeckEvent::Button {
        id: body[0],
        pressed: body[1] == 0x00,
    })
}

pub fn decode_knob(body: &[u8]) -> Option<DeckEvent> {
    if body.len() < 2 {
        warn!("knob event body too short ({} bytes)", body.len());
        return None;
    }
    Some(DeckEvent::Knob {
        id: body[0],
        clockwise: body[1] == 0x01,
    })
}

pub fn decode_touch(body: &[u8], ended: bool) -> Option<DeckEvent> {
    if body.len() < 6 {
        warn!("touch event body too short ({} bytes)", body.len());
        return None;
    }
    let x = u16::from_be_bytes([body[1], body[2]]);
    let y = u16::from_be_bytes([body[3], body[4]]);
    let id = body[5];

    let screen = if x < LEFT_STRIP_MAX_X {
        DeckScreen::Left
    } else if x > RIGHT_STRIP_MIN_X {
        DeckScreen::Right
    } else {
        DeckScreen::Center
    };
    let key = (screen == DeckScreen::Center).then(|| {
        let column = (x - LEFT_STRIP_MAX_X) / KEY_SIZE;
        let row = y / KEY_SIZE;
        (row * KEY_COLUMNS + column) as u8
    });

    Some(DeckEvent::Touch {
        id,
        x,
        y,
        screen,
        key,
        ended,
    })
}

pub fn decode_serial(body: &[u8]) -> Option<DeckEvent> {
    let text = String::from_utf8_lossy(body);
    Some(DeckEvent::Serial(
        text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_owned(),
    ))
}

pub fn decode_version(body: &[u8]) -> Option<DeckEvent> {
    if body.len() < 3 {
        warn!("version reply body too short ({} bytes)", body.len());
        return None;
    }
    Some(DeckEvent::Version(format!(
        "{}.{}.{}",
        body[0], body[1], body[2]
    )))
}
