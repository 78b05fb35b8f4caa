//! Runtime configuration, loadable from JSON.
//!
//! Defaults mirror the timings the supported decks expect; per-path
//! rounding and refresh-frequency overrides feed straight into the
//! dataref registry at startup.

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimdeckConfig {
    /// Decimal-digit rounding per dataref path, exact or `base[*]`
    /// wildcard. Rounding acts as a change-detection deadband.
    pub roundings: HashMap<String, i32>,
    /// Requested simulator refresh frequency per path, in Hz.
    pub frequencies: HashMap<String, f32>,
    /// Default animation frame period.
    pub animation_period_ms: u64,
    /// How long a tracked deck request may wait for its response.
    pub pending_request_timeout_ms: u64,
    /// Reader thread poll interval when the transport is idle.
    pub read_poll_interval_ms: u64,
    /// Where the virtual deck UI listens, if one is used.
    pub virtual_deck_address: Option<String>,
    /// Serial link settings for hardware decks.
    pub serial_baudrate: u32,
    pub serial_read_timeout_ms: u64,
}

impl Default for SimdeckConfig {
    fn default() -> Self {
        Self {
            roundings: HashMap::new(),
            frequencies: HashMap::new(),
            animation_period_ms: 250,
            pending_request_timeout_ms: 5_000,
            read_poll_interval_ms: 1,
            virtual_deck_address: None,
            serial_baudrate: 256_000,
            serial_read_timeout_ms: 2_000,
        }
    }
}

impl SimdeckConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            // The serde error carries the line/column of the failure.
            warn!("configuration JSON rejected: {e}");
            Error::Config("malformed configuration JSON")
        })?;
        config.validate()?;
        info!(
            "configuration loaded ({} rounding, {} frequency overrides)",
            config.roundings.len(),
            config.frequencies.len()
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.animation_period_ms == 0 {
            return Err(Error::Config("animation_period_ms must be nonzero"));
        }
        if self.pending_request_timeout_ms == 0 {
            return Err(Error::Config("pending_request_timeout_ms must be nonzero"));
        }
        if self.frequencies.values().any(|f| *f <= 0.0 || !f.is_finite()) {
            return Err(Error::Config("frequencies must be positive and finite"));
        }
        Ok(())
    }
}
