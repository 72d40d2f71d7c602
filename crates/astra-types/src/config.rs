//! Engine configuration, loadable from TOML.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for the command executor and its subsystems.
///
/// All fields have working defaults; a config file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower bound of the artificial per-command latency, in milliseconds.
    pub latency_min_ms: u64,
    /// Upper bound of the artificial per-command latency, in milliseconds.
    /// A 0..=0 range disables the delay entirely.
    pub latency_max_ms: u64,
    /// Maximum in-memory execution history entries (oldest dropped first).
    pub history_cap: usize,
    /// Maximum persisted audit-log entries.
    pub audit_cap: usize,
    /// How long a virtual process runs before its scheduled completion.
    pub process_completion_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: 100,
            latency_max_ms: 400,
            history_cap: 100,
            audit_cap: 1000,
            process_completion_ms: 5000,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The latency range with the bounds in order.
    pub fn latency_range(&self) -> (u64, u64) {
        if self.latency_min_ms <= self.latency_max_ms {
            (self.latency_min_ms, self.latency_max_ms)
        } else {
            (self.latency_max_ms, self.latency_min_ms)
        }
    }
}
