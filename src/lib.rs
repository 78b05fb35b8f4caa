//! Simulator-to-deck core: dataref observation and deck I/O.
//!
//! Two halves, meeting at the event loop:
//!
//! * [`value`] — the dataref registry. Consumers register simulator
//!   variables, opt into monitoring, and receive change notifications
//!   through [`value::DatarefListener`] when fresh simulator data
//!   arrives.
//! * [`protocol`] — the deck link. A magic-byte framed codec over a
//!   byte [`protocol::Transport`], a dispatch engine with transaction
//!   tracking, and the reader/dispatcher thread pair that pumps it.
//!
//! [`animation`] drives periodic redraws between simulator updates, and
//! [`config`] carries the per-installation tuning for all of it.

pub mod animation;
pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod value;

pub use config::SimdeckConfig;
pub use error::{Error, Result};
