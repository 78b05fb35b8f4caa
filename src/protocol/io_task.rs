//! Deck I/O pump: a reader thread that drains the transport into the
//! frame decoder, and a dispatcher thread that routes complete frames
//! through the protocol engine to the event sink.
//!
//! Splitting read from dispatch keeps slow event handlers from backing
//! up the transport; the bounded channel between them applies gentle
//! backpressure instead of unbounded buffering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::error::{Result, TransportError};
use crate::events::DeckEventSink;
use crate::protocol::codec::{FrameDecoder, FramePayload};
use crate::protocol::engine::{Dispatch, ProtocolEngine};
use crate::protocol::transport::Transport;

/// Frames buffered between reader and dispatcher before backpressure.
const FRAME_QUEUE_DEPTH: usize = 64;

/// How long the dispatcher waits for a frame before housekeeping.
const DISPATCH_IDLE: Duration = Duration::from_millis(50);

/// Running deck connection: owns the reader and dispatcher threads.
pub struct DeckIo<T: Transport + 'static> {
    transport: Arc<Mutex<T>>,
    engine: Arc<Mutex<ProtocolEngine>>,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl<T: Transport + 'static> DeckIo<T> {
    /// Spawn both worker threads and begin pumping the transport.
    pub fn start(
        transport: T,
        engine: ProtocolEngine,
        sink: Box<dyn DeckEventSink>,
        read_poll_interval: Duration,
    ) -> Self {
        let transport = Arc::new(Mutex::new(transport));
        let engine = Arc::new(Mutex::new(engine));
        let running = Arc::new(AtomicBool::new(true));
        let (frame_tx, frame_rx) = mpsc::sync_channel::<FramePayload>(FRAME_QUEUE_DEPTH);

        let reader = {
            let transport = Arc::clone(&transport);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("deck::reader".into())
                .spawn(move || reader_loop(&transport, &running, &frame_tx, read_poll_interval))
        };
        let dispatcher = {
            let engine = Arc::clone(&engine);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("deck::dispatch".into())
                .spawn(move || dispatcher_loop(&engine, &running, &frame_rx, sink))
        };

        let reader = match reader {
            Ok(h) => Some(h),
            Err(e) => {
                error!("failed to spawn reader thread: {e}");
                running.store(false, Ordering::SeqCst);
                None
            }
        };
        let dispatcher = match dispatcher {
            Ok(h) => Some(h),
            Err(e) => {
                error!("failed to spawn dispatcher thread: {e}");
                running.store(false, Ordering::SeqCst);
                None
            }
        };

        Self {
            transport,
            engine,
            running,
            reader,
            dispatcher,
        }
    }

    /// Shared handle to the protocol engine, for issuing commands.
    pub fn engine(&self) -> Arc<Mutex<ProtocolEngine>> {
        Arc::clone(&self.engine)
    }

    /// Write pre-encoded frame bytes to the deck.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut transport = match self.transport.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        };
        transport.write(bytes)?;
        transport.flush()?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal both threads and join them. Idempotent.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("stopping deck I/O");
        }
        if let Some(h) = self.reader.take() {
            if h.join().is_err() {
                warn!("reader thread panicked");
            }
        }
        if let Some(h) = self.dispatcher.take() {
            if h.join().is_err() {
                warn!("dispatcher thread panicked");
            }
        }
    }
}

impl<T: Transport + 'static> Drop for DeckIo<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reader_loop<T: Transport>(
    transport: &Mutex<T>,
    running: &AtomicBool,
    frame_tx: &SyncSender<FramePayload>,
    poll_interval: Duration,
) {
    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; 512];

    while running.load(Ordering::SeqCst) {
        let read = {
            let mut transport = match transport.lock() {
                Ok(t) => t,
                Err(poisoned) => poisoned.into_inner(),
            };
            transport.read(&mut buf)
        };
        match read {
            Ok(0) => {
                thread::sleep(poll_interval);
            }
            Ok(n) => {
                decoder.feed(&buf[..n]);
                while let Some(frame) = decoder.next_frame() {
                    match frame_tx.try_send(frame) {
                        Ok(()) => {}
                        Err(TrySendError::Full(frame)) => {
                            // Dispatcher is behind; block until it drains.
                            debug!("frame queue full, blocking reader");
                            if frame_tx.send(frame).is_err() {
                                return;
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => return,
                    }
                }
            }
            Err(TransportError::NotConnected) => {
                error!("deck link lost, reader exiting");
                running.store(false, Ordering::SeqCst);
                return;
            }
            Err(e) => {
                // Transient errors: log and keep polling.
                warn!("deck read error: {e}");
                thread::sleep(poll_interval);
            }
        }
    }
    debug!("reader loop exit");
}

fn dispatcher_loop(
    engine: &Mutex<ProtocolEngine>,
    running: &AtomicBool,
    frame_rx: &mpsc::Receiver<FramePayload>,
    mut sink: Box<dyn DeckEventSink>,
) {
    let mut last_expiry = Instant::now();
    while running.load(Ordering::SeqCst) {
        match frame_rx.recv_timeout(DISPATCH_IDLE) {
            Ok(frame) => {
                // Route under the lock, deliver after releasing it:
                // resolvers and sinks may issue follow-up commands
                // through the shared engine handle.
                let outcome = {
                    let mut engine = match engine.lock() {
                        Ok(e) => e,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    engine.dispatch(&frame)
                };
                match outcome {
                    Dispatch::Event(event) => sink.on_event(event),
                    Dispatch::Resolved {
                        txid,
                        event,
                        resolver,
                    } => resolver(txid, &event),
                    Dispatch::None => {}
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        // Time-based, so a continuously busy inbound stream cannot
        // starve pending-request expiry.
        if last_expiry.elapsed() >= DISPATCH_IDLE {
            let mut engine = match engine.lock() {
                Ok(e) => e,
                Err(poisoned) => poisoned.into_inner(),
            };
            engine.expire_stale();
            last_expiry = Instant::now();
        }
    }
    debug!("dispatcher loop exit");
}
