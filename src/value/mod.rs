//! Observable simulator values.
//!
//! The flow, leaf to root: a [`Dataref`] is a named, typed value with
//! change history; the [`DatarefRegistry`] owns all of them, tracks
//! which are actively monitored, and diffs incoming snapshots into
//! update/change notifications; consumers implement [`DatarefListener`]
//! and are addressed through arena [`ListenerId`]s, never by reference.

pub mod dataref;
pub mod format;
pub mod listener;
pub mod path;
pub mod raw;
pub mod registry;

pub use dataref::Dataref;
pub use format::substitute_values;
pub use listener::{DatarefListener, ListenerArena, ListenerId};
pub use path::{DataType, DatarefPath, INTERNAL_PREFIX};
pub use raw::{RawValue, TypedValue};
pub use registry::DatarefRegistry;
