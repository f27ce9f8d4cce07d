use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::BoxPayload;

/// Visual alert level of a box or of the connection banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Green,
    Amber,
    Red,
    #[default]
    Grey,
    Stale,
}

impl AlertLevel {
    /// Map a level string from the transport onto the fixed set.
    ///
    /// `gray` is `grey`, the server's `noUpdate` is `stale`, anything
    /// unrecognized is `grey`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "green" => AlertLevel::Green,
            "amber" => AlertLevel::Amber,
            "red" => AlertLevel::Red,
            "stale" | "noupdate" => AlertLevel::Stale,
            _ => AlertLevel::Grey,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Green => "green",
            AlertLevel::Amber => "amber",
            AlertLevel::Red => "red",
            AlertLevel::Grey => "grey",
            AlertLevel::Stale => "stale",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a box's message history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub level: AlertLevel,
    pub message: String,
}

/// Current state of one box as the board shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardBox {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub level: AlertLevel,
    pub last_message: String,
    pub last_update: DateTime<Utc>,
    /// Staleness threshold, zero when disabled.
    pub max_tbu: Duration,
    /// Time to live after the last update, zero when disabled.
    pub expire_after: Duration,
    /// Layout tag, passed through to the display untouched.
    pub size: String,
    /// Newest first.
    pub history: VecDeque<HistoryEntry>,
}

impl BoardBox {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            display_name: None,
            description: None,
            level: AlertLevel::Grey,
            last_message: String::new(),
            last_update: now,
            max_tbu: Duration::ZERO,
            expire_after: Duration::ZERO,
            size: String::new(),
            history: VecDeque::new(),
        }
    }

    /// Build board state from a server payload.
    ///
    /// `lastUpdate` is honoured when it parses and lies between the Unix
    /// epoch and `now`; otherwise the box counts as updated `now`.
    pub fn from_payload(payload: BoxPayload, now: DateTime<Utc>) -> Self {
        let last_update = payload
            .last_update
            .as_deref()
            .and_then(|raw| match DateTime::parse_from_rfc3339(raw) {
                Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                Err(e) => {
                    debug!(
                        event = "core.registry.last_update_unparsable",
                        box_id = payload.id,
                        value = raw,
                        error = %e,
                    );
                    None
                }
            })
            .filter(|t| t.timestamp() >= 0 && *t <= now)
            .unwrap_or(now);

        Self {
            level: payload
                .status
                .as_deref()
                .map(AlertLevel::normalize)
                .unwrap_or_default(),
            last_message: payload.last_message.unwrap_or_default(),
            last_update,
            max_tbu: payload.max_tbu.unwrap_or_default(),
            expire_after: payload.expire_after.unwrap_or_default(),
            size: payload.size.unwrap_or_default(),
            name: payload.name,
            display_name: payload.display_name,
            description: payload.description,
            history: VecDeque::new(),
            id: payload.id,
        }
    }

    /// Title shown on the board: display name, then name, then id.
    pub fn title(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(Some(self.name.as_str()).filter(|n| !n.is_empty()))
            .unwrap_or(&self.id)
    }

    /// Push the current level and message onto the history.
    pub fn record(&mut self, at: DateTime<Utc>, limit: usize) {
        self.history.push_front(HistoryEntry {
            at,
            level: self.level,
            message: self.last_message.clone(),
        });
        self.history.truncate(limit);
    }
}
