//! Configuration type definitions for alive.
//!
//! These types are serialized/deserialized from TOML config files. Every
//! tunable is optional so that layered files only override what they set;
//! accessors fall back to the defaults in [`super::defaults`].
//!
//! # Example Configuration
//!
//! ```toml
//! [liveness]
//! window_secs = 5
//! max_missed = 5
//! hard_ceiling_secs = 60
//!
//! [board]
//! anchors = ["root", "status-bar"]
//! history_limit = 30
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults;

/// Main configuration loaded from TOML config files.
///
/// Loaded from:
/// 1. User config: `~/.alive/config.toml`
/// 2. Project config: `./.alive/config.toml`
///
/// Project config values override user config values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AliveConfig {
    /// Connection liveness watchdog tuning
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Board registry settings
    #[serde(default)]
    pub board: BoardConfig,
}

/// Keepalive watchdog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LivenessConfig {
    /// Seconds without a keepalive before the banner shows a warning.
    /// Default: 5 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_secs: Option<u64>,

    /// Consecutive missed windows tolerated before forcing a resync.
    /// Default: 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_missed: Option<u32>,

    /// Seconds of total silence that always force a resync.
    /// Default: 60 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_ceiling_secs: Option<u64>,
}

/// Board registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BoardConfig {
    /// Display positions that are not boxes but may be used as `afterId`.
    /// Default: `["root", "status-bar"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<Vec<String>>,

    /// Number of history entries kept per box (newest first).
    /// Default: 30.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl LivenessConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs.unwrap_or(defaults::DEFAULT_WINDOW_SECS))
    }

    pub fn max_missed(&self) -> u32 {
        self.max_missed.unwrap_or(defaults::DEFAULT_MAX_MISSED)
    }

    pub fn hard_ceiling(&self) -> Duration {
        Duration::from_secs(
            self.hard_ceiling_secs
                .unwrap_or(defaults::DEFAULT_HARD_CEILING_SECS),
        )
    }
}

impl BoardConfig {
    pub fn anchors(&self) -> Vec<String> {
        self.anchors.clone().unwrap_or_else(defaults::default_anchors)
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
            .unwrap_or(defaults::DEFAULT_HISTORY_LIMIT)
    }
}

impl AliveConfig {
    /// Return a copy with every unset field filled from the defaults.
    ///
    /// Used when showing the effective configuration.
    pub fn resolved(&self) -> AliveConfig {
        AliveConfig {
            liveness: LivenessConfig {
                window_secs: Some(self.liveness.window().as_secs()),
                max_missed: Some(self.liveness.max_missed()),
                hard_ceiling_secs: Some(self.liveness.hard_ceiling().as_secs()),
            },
            board: BoardConfig {
                anchors: Some(self.board.anchors()),
                history_limit: Some(self.board.history_limit()),
            },
        }
    }
}
