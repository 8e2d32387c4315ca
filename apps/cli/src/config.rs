// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration from environment variables.
//!
//! Command-line flags win over these, and these win over the scene's own
//! `config` block.

use roofslope_engine::{DrainageConfig, FlushPolicy, Strategy};

/// Run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Routing strategy for corner points.
    pub strategy: Strategy,
    /// Updates per flush; 0 flushes the whole pass at once.
    pub batch_size: usize,
    /// Emit logs as JSON lines instead of the pretty format.
    pub log_json: bool,
    /// Pretty-print the JSON report.
    pub pretty: bool,
    /// Overrides for the scene's drainage configuration.
    pub slope_percent: Option<f64>,
    pub distance_threshold: Option<f64>,
    pub max_edge: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::Dijkstra,
            batch_size: FlushPolicy::DEFAULT_BATCH,
            log_json: false,
            pretty: false,
            slope_percent: None,
            distance_threshold: None,
            max_edge: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; unparsable values fall back to
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            strategy: lookup("ROOFSLOPE_STRATEGY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.strategy),
            batch_size: lookup("ROOFSLOPE_BATCH_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_size),
            log_json: lookup("ROOFSLOPE_LOG_JSON")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.log_json),
            pretty: lookup("ROOFSLOPE_PRETTY")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.pretty),
            slope_percent: lookup("ROOFSLOPE_SLOPE_PERCENT").and_then(|s| s.parse().ok()),
            distance_threshold: lookup("ROOFSLOPE_DISTANCE_THRESHOLD")
                .and_then(|s| s.parse().ok()),
            max_edge: lookup("ROOFSLOPE_MAX_EDGE").and_then(|s| s.parse().ok()),
        }
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        FlushPolicy::every(self.batch_size)
    }

    /// Applies the scalar overrides to a scene configuration.
    pub fn apply(&self, drainage: &mut DrainageConfig) {
        if let Some(v) = self.slope_percent {
            drainage.slope_percent = v;
        }
        if let Some(v) = self.distance_threshold {
            drainage.distance_threshold = v;
        }
        if let Some(v) = self.max_edge {
            drainage.max_edge = v;
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
