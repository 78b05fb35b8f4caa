//! Deck bridge binary: connects to a deck over TCP, pumps its events
//! and mirrors basic state into the dataref registry.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use simdeck::config::SimdeckConfig;
use simdeck::events::{DeckEvent, DeckEventSink};
use simdeck::protocol::engine::ProtocolEngine;
use simdeck::protocol::io_task::DeckIo;
use simdeck::protocol::transport::TcpTransport;
use simdeck::value::{DatarefRegistry, INTERNAL_PREFIX, RawValue};

/// Feeds deck input back into the registry as internal datarefs, so
/// pages and annunciators can observe deck state like any other value.
struct RegistrySink {
    registry: Arc<Mutex<DatarefRegistry>>,
}

impl DeckEventSink for RegistrySink {
    fn on_event(&mut self, event: DeckEvent) {
        let (path, value) = match &event {
            DeckEvent::Button { id, pressed } => (
                format!("{INTERNAL_PREFIX}deck/button/{id}"),
                RawValue::Number(f64::from(u8::from(*pressed))),
            ),
            DeckEvent::Knob { id, clockwise } => (
                format!("{INTERNAL_PREFIX}deck/knob/{id}"),
                RawValue::Number(if *clockwise { 1.0 } else { -1.0 }),
            ),
            _ => {
                info!("deck event: {event:?}");
                return;
            }
        };
        let mut registry = match self.registry.lock() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.register(&path);
        registry.ingest(std::iter::once((path, value)));
        registry.detect_changed();
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let addr: SocketAddr = args
        .next()
        .context("usage: simdeck <deck-address> [config.json]")?
        .parse()
        .context("invalid deck address")?;
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {path}"))?;
            SimdeckConfig::from_json(&json)?
        }
        None => SimdeckConfig::default(),
    };

    let mut registry = DatarefRegistry::new();
    registry.set_roundings(config.roundings.clone());
    registry.set_frequencies(config.frequencies.clone());
    registry.end_startup();
    let registry = Arc::new(Mutex::new(registry));

    // A deck we cannot reach is fatal; there is nothing to bridge.
    let transport = TcpTransport::connect(addr, Duration::from_secs(5))
        .with_context(|| format!("connecting to deck at {addr}"))?;
    info!("connected to deck at {addr}");

    let engine = ProtocolEngine::new(Duration::from_millis(config.pending_request_timeout_ms));
    let mut io = DeckIo::start(
        transport,
        engine,
        Box::new(RegistrySink {
            registry: Arc::clone(&registry),
        }),
        Duration::from_millis(config.read_poll_interval_ms),
    );

    {
        let engine = io.engine();
        let mut engine = match engine.lock() {
            Ok(e) => e,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (serial, version) = engine.request_info(
            Box::new(|_, event| info!("deck serial: {event:?}")),
            Box::new(|_, event| info!("deck firmware: {event:?}")),
        )?;
        drop(engine);
        io.send(&serial)?;
        io.send(&version)?;
    }

    // Run until the link drops or stdin closes (foreground bridge
    // process; EOF or a blank line means quit).
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("stdin-watch".into())
            .spawn(move || {
                let mut line = String::new();
                let _ = std::io::stdin().read_line(&mut line);
                stop.store(true, Ordering::SeqCst);
            })
            .ok();
    }

    while !stop.load(Ordering::SeqCst) && io.is_running() {
        std::thread::sleep(Duration::from_millis(100));
    }

    io.stop();
    info!("bye");
    Ok(())
}
