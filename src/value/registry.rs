//! Dataref registry and change detector.
//!
//! Owns every known [`Dataref`], the reference-counted monitor set, the
//! listener arena, and the snapshot buffer that the transport thread
//! fills. [`DatarefRegistry::detect_changed`] is the single writer of
//! dataref values: it diffs the snapshot against the last-seen values and
//! fans out notifications, cascading only for actively monitored paths.
//!
//! ```text
//!  transport thread ──ingest()──▶ snapshot (Mutex)
//!                                     │ copy under lock
//!  poll thread ──detect_changed()─────┴──▶ update datarefs ──▶ listeners
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use super::dataref::Dataref;
use super::listener::{DatarefListener, ListenerArena, ListenerId};
use super::raw::RawValue;

pub struct DatarefRegistry {
    /// Every known dataref, monitored or not.
    all: HashMap<String, Dataref>,
    /// Actively monitored paths and how many consumers want each.
    monitored: HashMap<String, usize>,
    /// Freshly received values, written by the transport side.
    snapshot: Mutex<HashMap<String, RawValue>>,
    /// Values as of the previous detection pass.
    last_seen: HashMap<String, RawValue>,

    listeners: ListenerArena,

    /// Rounding overrides, keyed by exact path or `base[*]` wildcard.
    roundings: HashMap<String, i32>,
    /// Update-frequency overrides, same keying.
    frequencies: HashMap<String, f32>,

    /// During startup, removing a never-monitored path is expected
    /// (consumers tear down half-built pages) and not worth a warning.
    startup: bool,
}

impl DatarefRegistry {
    pub fn new() -> Self {
        Self {
            all: HashMap::new(),
            monitored: HashMap::new(),
            snapshot: Mutex::new(HashMap::new()),
            last_seen: HashMap::new(),
            listeners: ListenerArena::new(),
            roundings: HashMap::new(),
            frequencies: HashMap::new(),
            startup: true,
        }
    }

    pub fn set_roundings(&mut self, roundings: HashMap<String, i32>) {
        self.roundings = roundings;
    }

    pub fn set_frequencies(&mut self, frequencies: HashMap<String, f32>) {
        self.frequencies = frequencies;
    }

    /// End the startup grace period.
    pub fn end_startup(&mut self) {
        self.startup = false;
    }

    // ── Registration ──────────────────────────────────────────

    /// Parse and register a dataref if not already known. Returns the
    /// canonical path, or `None` (with a warning) for an empty spec.
    pub fn register(&mut self, spec: &str) -> Option<String> {
        if spec.is_empty() {
            warn!("register: invalid empty dataref path");
            return None;
        }
        let mut dataref = Dataref::new(spec);
        let path = dataref.path().to_owned();
        if let Some(existing) = self.all.get_mut(&path) {
            // Re-registration of an array element can only grow the
            // declared length.
            if let Some(len) = dataref.length() {
                existing.declare_length(len);
            }
            return Some(path);
        }

        self.apply_overrides(&mut dataref);
        // Propagate the new element's index to siblings of the same base
        // so the declared array length stays consistent.
        if let Some(len) = dataref.length() {
            let base = dataref.base().to_owned();
            for other in self.all.values_mut() {
                if other.base() == base && other.is_array() {
                    other.declare_length(len);
                }
            }
            for (other_path, other) in &self.all {
                if other.base() == base {
                    if let Some(other_len) = other.length() {
                        debug!("{other_path}: sibling length {other_len}");
                        dataref.declare_length(other_len);
                    }
                }
            }
        }
        self.all.insert(path.clone(), dataref);
        Some(path)
    }

    fn apply_overrides(&self, dataref: &mut Dataref) {
        let exact = dataref.path().to_owned();
        let wildcard = dataref.parsed().wildcard();

        let rounding = self
            .roundings
            .get(&exact)
            .or_else(|| wildcard.as_ref().and_then(|w| self.roundings.get(w)));
        if let Some(r) = rounding {
            dataref.set_rounding(Some(*r));
        }

        let frequency = self
            .frequencies
            .get(&exact)
            .or_else(|| wildcard.as_ref().and_then(|w| self.frequencies.get(w)));
        dataref.set_update_frequency(frequency.copied());
    }

    pub fn get(&self, path: &str) -> Option<&Dataref> {
        self.all.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.all.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Current value of a dataref; `None` (with a warning) for unknown
    /// paths — never an error.
    pub fn get_value(&self, path: &str) -> Option<RawValue> {
        match self.all.get(path) {
            Some(d) => d.value().cloned(),
            None => {
                warn!("{path} not found");
                None
            }
        }
    }

    // ── Listeners ─────────────────────────────────────────────

    pub fn register_listener(&mut self, listener: Arc<dyn DatarefListener>) -> ListenerId {
        self.listeners.register(listener)
    }

    /// Explicit unregistration; also detaches the id from every dataref
    /// so destroyed consumers are never notified.
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        for dataref in self.all.values_mut() {
            dataref.remove_listener(id);
        }
        self.listeners.unregister(id)
    }

    /// Attach a registered listener to a dataref. Unknown paths are a
    /// logged warning.
    pub fn add_listener(&mut self, path: &str, id: ListenerId) {
        match self.all.get_mut(path) {
            Some(d) => d.add_listener(id),
            None => warn!("add_listener: {path} not found"),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ── Monitor set ───────────────────────────────────────────

    /// Reference-count monitoring for each path. Internal (`data:`)
    /// paths are computed locally and never enter the monitor set.
    pub fn add_to_monitor<'a>(&mut self, paths: impl IntoIterator<Item = &'a str>) {
        let mut added = Vec::new();
        for path in paths {
            if let Some(d) = self.all.get(path) {
                if d.is_internal() {
                    debug!("local dataref {path} is not monitored");
                    continue;
                }
            }
            let count = self.monitored.entry(path.to_owned()).or_insert(0);
            *count += 1;
            if *count == 1 {
                added.push(path.to_owned());
            }
        }
        debug!("added {added:?}, currently monitoring {} paths", self.monitored.len());
    }

    pub fn remove_from_monitor<'a>(&mut self, paths: impl IntoIterator<Item = &'a str>) {
        let mut removed = Vec::new();
        for path in paths {
            if let Some(d) = self.all.get(path) {
                if d.is_internal() {
                    debug!("local dataref {path} is not monitored");
                    continue;
                }
            }
            match self.monitored.get_mut(path) {
                Some(count) => {
                    *count -= 1;
                    if *count == 0 {
                        self.monitored.remove(path);
                        removed.push(path.to_owned());
                    }
                }
                None => {
                    if !self.startup {
                        warn!("dataref {path} not monitored");
                    }
                }
            }
        }
        debug!("removed {removed:?}, currently monitoring {} paths", self.monitored.len());
    }

    pub fn monitor_count(&self, path: &str) -> usize {
        self.monitored.get(path).copied().unwrap_or(0)
    }

    pub fn monitored_paths(&self) -> impl Iterator<Item = &str> {
        self.monitored.keys().map(String::as_str)
    }

    // ── Snapshot ingest (transport side) ──────────────────────

    /// Merge freshly received values into the snapshot buffer. Called
    /// from the transport/update thread; serialized against
    /// [`detect_changed`] by the snapshot lock.
    pub fn ingest(&self, values: impl IntoIterator<Item = (String, RawValue)>) {
        let mut snapshot = match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("ingest: snapshot lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        snapshot.extend(values);
    }

    // ── Change detection ──────────────────────────────────────

    /// Diff the snapshot against last-seen values and update datarefs.
    ///
    /// Paths in the monitor set cascade (fire "changed" listeners);
    /// anything else — data we never asked for this run — is updated
    /// silently. Per-path update+notify is synchronous in iteration
    /// order; there is no cross-path ordering guarantee. The pass is
    /// fail-soft: a missing registry entry is logged and skipped, and
    /// state is always left consistent.
    pub fn detect_changed(&mut self) {
        let snapshot: Vec<(String, RawValue)> = {
            let guard = match self.snapshot.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("detect_changed: snapshot lock poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            guard.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        for (path, value) in snapshot {
            if self.last_seen.get(&path) == Some(&value) {
                continue;
            }
            let cascade = self.monitored.contains_key(&path);
            match self.all.get_mut(&path) {
                Some(dataref) => {
                    let changed = dataref.update_value(value.clone());
                    let mut stale = Vec::new();
                    for id in dataref.listeners() {
                        match self.listeners.get(*id) {
                            Some(listener) => {
                                listener.on_value_updated(dataref);
                                if changed && cascade {
                                    listener.on_value_changed(dataref);
                                }
                            }
                            None => {
                                debug!("{path}: dropping stale listener {id:?}");
                                stale.push(*id);
                            }
                        }
                    }
                    for id in stale {
                        dataref.remove_listener(id);
                    }
                }
                None => {
                    // A value we never registered — received but unknown.
                    debug!("{path}: received value for unregistered dataref");
                }
            }
            self.last_seen.insert(path, value);
        }
    }

    // ── Teardown ──────────────────────────────────────────────

    /// Full registry teardown (aircraft/profile switch).
    pub fn remove_all(&mut self) {
        debug!("removing all datarefs");
        self.all.clear();
        self.monitored.clear();
        self.last_seen.clear();
        match self.snapshot.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        self.startup = true;
    }
}

impl Default for DatarefRegistry {
    fn default() -> Self {
        Self::new()
    }
}
