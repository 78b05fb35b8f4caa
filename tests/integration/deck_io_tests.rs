//! Deck I/O pump over an in-memory transport: frames written by the
//! fake deck must come out of the sink as events, and commands must
//! reach the fake deck's end of the link.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use simdeck::events::DeckEvent;
use simdeck::protocol::codec::MAGIC_BYTE;
use simdeck::protocol::engine::{ProtocolEngine, headers};
use simdeck::protocol::io_task::DeckIo;
use simdeck::protocol::transport::{LoopbackTransport, Transport};

use crate::mock::CollectSink;

const POLL: Duration = Duration::from_millis(1);

fn start_io(deck_side: LoopbackTransport) -> (DeckIo<LoopbackTransport>, CollectSink) {
    let sink = CollectSink::new();
    let engine = ProtocolEngine::new(Duration::from_secs(5));
    let io = DeckIo::start(deck_side, engine, Box::new(sink.clone()), POLL);
    (io, sink)
}

/// Frame a deck-originated message: magic, length, header, txid, body.
fn deck_frame(header: u16, txid: u8, body: &[u8]) -> Vec<u8> {
    let mut payload = header.to_be_bytes().to_vec();
    payload.push(txid);
    payload.extend_from_slice(body);
    let mut wire = vec![MAGIC_BYTE, payload.len() as u8];
    wire.extend_from_slice(&payload);
    wire
}

fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn button_press_reaches_the_sink() {
    let (host, mut deck) = LoopbackTransport::pair();
    let (mut io, sink) = start_io(host);

    deck.write(&deck_frame(headers::BUTTON_PRESS, 0, &[3, 0x00]))
        .unwrap();

    wait_for("button event", || !sink.snapshot().is_empty());
    match &sink.snapshot()[0] {
        DeckEvent::Button { id, pressed } => {
            assert_eq!(*id, 3);
            assert!(*pressed);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    io.stop();
}

#[test]
fn garbage_between_frames_is_survived() {
    let (host, mut deck) = LoopbackTransport::pair();
    let (mut io, sink) = start_io(host);

    deck.write(&[0xDE, 0xAD, 0xBE]).unwrap();
    deck.write(&deck_frame(headers::KNOB_ROTATE, 0, &[1, 0x01]))
        .unwrap();
    // Split a second frame across two writes.
    let frame = deck_frame(headers::KNOB_ROTATE, 0, &[1, 0xFF]);
    deck.write(&frame[..3]).unwrap();
    deck.write(&frame[3..]).unwrap();

    wait_for("both knob events", || sink.snapshot().len() >= 2);
    let events = sink.snapshot();
    assert!(matches!(
        events[0],
        DeckEvent::Knob {
            id: 1,
            clockwise: true
        }
    ));
    assert!(matches!(
        events[1],
        DeckEvent::Knob {
            id: 1,
            clockwise: false
        }
    ));
    io.stop();
}

#[test]
fn tracked_request_resolves_without_sink_event() {
    let (host, mut deck) = LoopbackTransport::pair();
    let (mut io, sink) = start_io(host);

    let resolved = Arc::new(AtomicBool::new(false));
    let request = {
        let resolved = Arc::clone(&resolved);
        let engine = io.engine();
        let mut engine = engine.lock().unwrap();
        engine
            .do_tracked_action(
                headers::SERIAL_IN,
                &[],
                Box::new(move |_txid, event| {
                    assert!(matches!(event, DeckEvent::Serial(_)));
                    resolved.store(true, Ordering::SeqCst);
                }),
            )
            .unwrap()
    };
    io.send(&request).unwrap();

    // The fake deck reads the request and answers with the same txid.
    let mut buf = [0u8; 64];
    let n = deck.read(&mut buf).unwrap();
    assert!(n >= 9);
    let txid = buf[8]; // 6-byte prefix, header, then txid
    deck.write(&deck_frame(headers::SERIAL_OUT, txid, b"LDL1-XY42"))
        .unwrap();

    wait_for("resolver", || resolved.load(Ordering::SeqCst));
    // The response was consumed by the resolver, not forwarded.
    assert!(sink.snapshot().is_empty());
    io.stop();
}

#[test]
fn resolver_can_issue_follow_up_commands() {
    let (host, mut deck) = LoopbackTransport::pair();
    let (mut io, _sink) = start_io(host);

    // A resolver that locks the shared engine handle to fire the next
    // command: the dispatcher must run it with the engine lock released.
    let followed_up = Arc::new(AtomicBool::new(false));
    let request = {
        let engine = io.engine();
        let handle = Arc::clone(&engine);
        let followed_up = Arc::clone(&followed_up);
        let mut engine = engine.lock().unwrap();
        engine
            .do_tracked_action(
                headers::SERIAL_IN,
                &[],
                Box::new(move |_txid, _event| {
                    let mut engine = handle.lock().unwrap();
                    engine.set_brightness(3).unwrap();
                    followed_up.store(true, Ordering::SeqCst);
                }),
            )
            .unwrap()
    };
    io.send(&request).unwrap();

    let mut buf = [0u8; 64];
    let n = deck.read(&mut buf).unwrap();
    assert!(n >= 9);
    let txid = buf[8];
    deck.write(&deck_frame(headers::SERIAL_OUT, txid, b"LDL1-XY42"))
        .unwrap();

    wait_for("follow-up command from resolver", || {
        followed_up.load(Ordering::SeqCst)
    });
    io.stop();
}

#[test]
fn stale_requests_expire_during_busy_stream() {
    let (host, mut deck) = LoopbackTransport::pair();
    let sink = CollectSink::new();
    let engine = ProtocolEngine::new(Duration::from_millis(10));
    let mut io = DeckIo::start(host, engine, Box::new(sink.clone()), POLL);

    {
        let engine = io.engine();
        let mut engine = engine.lock().unwrap();
        engine.do_action(headers::SET_BRIGHTNESS, &[1]).unwrap();
        assert_eq!(engine.pending_count(), 1);
    }

    // Saturate the inbound stream so the dispatcher never goes idle.
    let busy_window = Duration::from_millis(600);
    let writer = std::thread::spawn(move || {
        let start = Instant::now();
        while start.elapsed() < busy_window {
            if deck
                .write(&deck_frame(headers::KNOB_ROTATE, 0, &[1, 0x01]))
                .is_err()
            {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        deck
    });

    // Expiry must happen while frames are still flowing, well inside
    // the busy window.
    let engine = io.engine();
    let deadline = Instant::now() + Duration::from_millis(400);
    loop {
        if engine.lock().unwrap().pending_count() == 0 {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "pending request not expired while the stream was busy"
        );
        std::thread::sleep(Duration::from_millis(5));
    }

    let _deck = writer.join().unwrap();
    io.stop();
}

#[test]
fn send_reaches_the_deck() {
    let (host, mut deck) = LoopbackTransport::pair();
    let (mut io, _sink) = start_io(host);

    let bytes = {
        let engine = io.engine();
        let mut engine = engine.lock().unwrap();
        engine.set_brightness(5).unwrap()
    };
    io.send(&bytes).unwrap();

    let mut buf = [0u8; 64];
    let mut got = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(2);
    while got.len() < bytes.len() && Instant::now() < deadline {
        let n = deck.read(&mut buf).unwrap();
        got.extend_from_slice(&buf[..n]);
        if n == 0 {
            std::thread::sleep(Duration::from_millis(2));
        }
    }
    assert_eq!(got, bytes);
    io.stop();
}

#[test]
fn stop_is_idempotent_and_joins() {
    let (host, _deck) = LoopbackTransport::pair();
    let (mut io, _sink) = start_io(host);
    assert!(io.is_running());
    io.stop();
    io.stop();
    assert!(!io.is_running());
}
