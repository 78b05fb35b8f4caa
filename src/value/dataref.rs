//! A single observable simulator value.
//!
//! A `Dataref` carries the parsed path, the declared type, the raw and
//! rounded current/previous values, and bookkeeping counters. It records
//! whether an update changed the value; notification fan-out is driven
//! by the registry, which owns the listener arena.

use std::time::Instant;

use log::warn;

use super::listener::ListenerId;
use super::path::{DataType, DatarefPath};
use super::raw::{RawValue, TypedValue};
use crate::error::{Result, ValueError};

pub struct Dataref {
    path: DatarefPath,
    /// Known length of the underlying array, when array-valued.
    length: Option<usize>,
    is_array: bool,
    /// Decimal places applied to numeric updates. Doubles as a deadband:
    /// change detection compares rounded values.
    rounding: Option<i32>,
    /// Requested simulator send rate, times per second.
    update_frequency: f32,

    raw_current: Option<RawValue>,
    raw_previous: Option<RawValue>,
    current: Option<RawValue>,
    previous: Option<RawValue>,

    updated: u64,
    changed: u64,
    last_updated: Option<Instant>,
    last_changed: Option<Instant>,

    listeners: Vec<ListenerId>,
}

impl Dataref {
    pub fn new(spec: &str) -> Self {
        let path = DatarefPath::parse(spec);

        let mut length = None;
        let mut is_array = path.data_type == DataType::Str; // strings arrive as char arrays
        if let Some(index) = path.index {
            is_array = true;
            // The index establishes a minimum length.
            length = Some(index + 1);
        }

        Self {
            path,
            length,
            is_array,
            rounding: None,
            update_frequency: 1.0,
            raw_current: None,
            raw_previous: None,
            current: None,
            previous: None,
            updated: 0,
            changed: 0,
            last_updated: None,
            last_changed: None,
            listeners: Vec::new(),
        }
    }

    // ── Identity ──────────────────────────────────────────────

    pub fn path(&self) -> &str {
        &self.path.path
    }

    pub fn base(&self) -> &str {
        &self.path.base
    }

    pub fn index(&self) -> Option<usize> {
        self.path.index
    }

    pub fn parsed(&self) -> &DatarefPath {
        &self.path
    }

    pub fn data_type(&self) -> DataType {
        self.path.data_type
    }

    pub fn is_internal(&self) -> bool {
        self.path.is_internal()
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn exists(&self) -> bool {
        !self.path.path.is_empty()
    }

    // ── Array length ──────────────────────────────────────────

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    /// Declare the array length. Grow-only: a later, smaller declaration
    /// never shrinks what an earlier index established. An index at or
    /// past the declared length is a logged integrity warning.
    pub fn declare_length(&mut self, length: usize) {
        let grown = self.length.map_or(length, |l| l.max(length));
        if grown > 1 {
            self.is_array = true;
        }
        self.length = Some(grown);
        if let Some(index) = self.path.index {
            if index >= grown {
                warn!(
                    "{}: index {index} out of range [0,{}]",
                    self.path.path,
                    grown.saturating_sub(1)
                );
            }
        }
    }

    // ── Tuning ────────────────────────────────────────────────

    pub fn set_rounding(&mut self, rounding: Option<i32>) {
        self.rounding = rounding;
    }

    pub fn rounding(&self) -> Option<i32> {
        self.rounding
    }

    /// Requested update frequency; `None` resets to the 1 Hz default.
    pub fn set_update_frequency(&mut self, frequency: Option<f32>) {
        self.update_frequency = match frequency {
            Some(f) if f > 0.0 => f,
            _ => 1.0,
        };
    }

    pub fn update_frequency(&self) -> f32 {
        self.update_frequency
    }

    // ── Values ────────────────────────────────────────────────

    /// Current (rounded) value.
    pub fn value(&self) -> Option<&RawValue> {
        self.current.as_ref()
    }

    /// Previous (rounded) value.
    pub fn previous_value(&self) -> Option<&RawValue> {
        self.previous.as_ref()
    }

    /// Raw value as received, before rounding.
    pub fn raw_value(&self) -> Option<&RawValue> {
        self.raw_current.as_ref()
    }

    /// Current value coerced to the declared type. Malformed coercion is
    /// an explicit, caller-visible error — never silently swallowed.
    pub fn value_typed(&self) -> Result<Option<TypedValue>> {
        let Some(value) = &self.current else {
            return Ok(None);
        };
        let coerced = match self.path.data_type {
            DataType::Float => match value {
                RawValue::Number(n) => TypedValue::Float(*n),
                RawValue::Text(s) => TypedValue::Float(s.trim().parse::<f64>().map_err(|_| {
                    ValueError::Coercion {
                        path: self.path.path.clone(),
                        want: "float",
                    }
                })?),
                RawValue::Bytes(_) => {
                    return Err(ValueError::Coercion {
                        path: self.path.path.clone(),
                        want: "float",
                    }
                    .into());
                }
            },
            DataType::Int => match value {
                RawValue::Number(n) => TypedValue::Int(*n as i64),
                RawValue::Text(s) => TypedValue::Int(s.trim().parse::<i64>().map_err(|_| {
                    ValueError::Coercion {
                        path: self.path.path.clone(),
                        want: "int",
                    }
                })?),
                RawValue::Bytes(_) => {
                    return Err(ValueError::Coercion {
                        path: self.path.path.clone(),
                        want: "int",
                    }
                    .into());
                }
            },
            DataType::Str => TypedValue::Str(value.to_string()),
            DataType::Bytes => match value {
                RawValue::Bytes(b) => TypedValue::Bytes(b.clone()),
                _ => {
                    return Err(ValueError::Coercion {
                        path: self.path.path.clone(),
                        want: "bytes",
                    }
                    .into());
                }
            },
        };
        Ok(Some(coerced))
    }

    /// Whether the last update changed the value. A transition into or
    /// out of "no value" counts as a change; "no value" to "no value"
    /// does not.
    pub fn has_changed(&self) -> bool {
        match (&self.previous, &self.current) {
            (None, None) => false,
            (None, Some(_)) | (Some(_), None) => true,
            (Some(prev), Some(cur)) => prev != cur,
        }
    }

    /// Store a new value. Applies rounding to numbers, bumps counters
    /// and timestamps, and reports whether the (rounded) value changed.
    /// The registry decides whether the change cascades to listeners.
    pub fn update_value(&mut self, new_value: RawValue) -> bool {
        self.raw_previous = self.raw_current.take();
        self.previous = self.current.take();

        let rounded = match self.rounding {
            Some(digits) => new_value.rounded(digits),
            None => new_value.clone(),
        };
        self.raw_current = Some(new_value);
        self.current = Some(rounded);

        self.updated += 1;
        self.last_updated = Some(Instant::now());

        let changed = self.has_changed();
        if changed {
            self.changed += 1;
            self.last_changed = self.last_updated;
        }
        changed
    }

    /// True once the value has been updated at least once.
    pub fn was_updated(&self) -> bool {
        self.updated > 0
    }

    pub fn update_count(&self) -> u64 {
        self.updated
    }

    pub fn change_count(&self) -> u64 {
        self.changed
    }

    pub fn last_updated(&self) -> Option<Instant> {
        self.last_updated
    }

    pub fn last_changed(&self) -> Option<Instant> {
        self.last_changed
    }

    // ── Listeners ─────────────────────────────────────────────

    /// Append a listener id; duplicate registration is idempotent.
    pub fn add_listener(&mut self, id: ListenerId) {
        if !self.listeners.contains(&id) {
            self.listeners.push(id);
        }
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|l| *l != id);
    }

    pub fn listeners(&self) -> &[ListenerId] {
        &self.listeners
    }
}
