//! Default values for configuration types.

/// Keepalive window before the connection banner warns (seconds).
///
/// The server emits a keepalive every 3 seconds, so one late beat does not
/// trip the warning.
pub const DEFAULT_WINDOW_SECS: u64 = 5;

/// Missed keepalive windows tolerated before a forced resync.
pub const DEFAULT_MAX_MISSED: u32 = 5;

/// Silence (seconds) after which a resync is always forced.
pub const DEFAULT_HARD_CEILING_SECS: u64 = 60;

/// History entries retained per box.
pub const DEFAULT_HISTORY_LIMIT: usize = 30;

/// Returns the default display anchors.
///
/// `status-bar` is the element the board server places the first box after;
/// `root` is the generic top-of-board anchor.
pub fn default_anchors() -> Vec<String> {
    vec!["root".to_string(), "status-bar".to_string()]
}
