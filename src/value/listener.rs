//! Listener contract and the identity-keyed listener arena.
//!
//! Consumers (buttons, annunciator parts, pages, animations) implement
//! [`DatarefListener`] and register with the registry, which hands back a
//! [`ListenerId`]. Datarefs store ids, never references: the arena owns
//! nothing beyond the registration, removal is explicit, and a stale id
//! (slot reused after unregistration) is detected by its generation
//! counter and skipped.

use std::sync::Arc;

use log::{debug, warn};

use super::dataref::Dataref;

/// Notification interface for dataref consumers.
///
/// `on_value_updated` fires on every update of a watched value;
/// `on_value_changed` fires only when the value actually transitioned
/// and the registry cascaded the update. Each implementor decides
/// independently what "changed" means for its own rendering.
pub trait DatarefListener: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// High-frequency freshness signal; default no-op.
    fn on_value_updated(&self, _dataref: &Dataref) {}

    /// Low-frequency value-transition signal.
    fn on_value_changed(&self, dataref: &Dataref);
}

/// Handle to a registered listener: slot index plus generation counter.
/// Identity-keyed — two registrations of the same object yield distinct
/// ids, and an id outlives its listener only as a harmless stale token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    listener: Option<Arc<dyn DatarefListener>>,
}

/// Slot arena holding all registered listeners.
pub struct ListenerArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Default for ListenerArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerArena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Register a listener and return its id.
    pub fn register(&mut self, listener: Arc<dyn DatarefListener>) -> ListenerId {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    listener: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.listener = Some(listener);
        debug!("listener registered in slot {index} gen {}", slot.generation);
        ListenerId {
            index,
            generation: slot.generation,
        }
    }

    /// Explicitly unregister. Returns false (with a warning) when the id
    /// is stale or was never registered.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.listener.is_some() => {
                slot.listener = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                true
            }
            _ => {
                warn!("unregister: stale or unknown listener id {id:?}");
                false
            }
        }
    }

    /// Resolve an id; `None` for stale ids.
    pub fn get(&self, id: ListenerId) -> Option<&Arc<dyn DatarefListener>> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.listener.as_ref())
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.listener.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
