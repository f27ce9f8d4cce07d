//! Timers that watch boxes and the connection.

pub mod expiry;
pub mod liveness;
pub mod staleness;

pub use expiry::ExpiryScheduler;
pub use liveness::{
    Banner, LivenessOutcome, LivenessSettings, LivenessWatchdog, ResyncReason,
};
pub use staleness::{StalenessWatchdog, mark_stale, stale_message};
