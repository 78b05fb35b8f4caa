//! Shared test doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use simdeck::events::{DeckEvent, DeckEventSink};
use simdeck::value::{Dataref, DatarefListener, RawValue};

/// Listener that counts callbacks and remembers the last change.
pub struct CountingListener {
    pub updated: AtomicUsize,
    pub changed: AtomicUsize,
    pub last_change: Mutex<Option<(String, Option<RawValue>)>>,
}

impl CountingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            updated: AtomicUsize::new(0),
            changed: AtomicUsize::new(0),
            last_change: Mutex::new(None),
        })
    }

    pub fn changed_count(&self) -> usize {
        self.changed.load(Ordering::SeqCst)
    }

    pub fn updated_count(&self) -> usize {
        self.updated.load(Ordering::SeqCst)
    }
}

impl DatarefListener for CountingListener {
    fn name(&self) -> &str {
        "counting-listener"
    }

    fn on_value_updated(&self, _dataref: &Dataref) {
        self.updated.fetch_add(1, Ordering::SeqCst);
    }

    fn on_value_changed(&self, dataref: &Dataref) {
        self.changed.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.last_change.lock() {
            *slot = Some((dataref.path().to_owned(), dataref.value().cloned()));
        }
    }
}

/// Event sink that collects everything it receives.
#[derive(Clone)]
pub struct CollectSink {
    pub events: Arc<Mutex<Vec<DeckEvent>>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn snapshot(&self) -> Vec<DeckEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl DeckEventSink for CollectSink {
    fn on_event(&mut self, event: DeckEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
