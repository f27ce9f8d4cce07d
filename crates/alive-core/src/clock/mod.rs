//! Clock and timer service.
//!
//! Every timer in the engine lives in exactly one [`TimerSlot`]: a box's
//! staleness slot, a box's expiry slot, or the single liveness slot. The
//! owning entity stores its handle in a [`TimerCell`]; arming a cell always
//! cancels the handle it already holds before scheduling a new one.
//!
//! Expired timers come back to the engine as [`Fired`] values. A fired handle
//! that no longer matches its cell (re-armed or cancelled in the meantime) is
//! ignored by the owner.

pub mod manual;
pub mod tokio_clock;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use manual::ManualClock;
pub use tokio_clock::TokioClock;

/// Longest delay a clock will schedule. Longer requests are shortened to it.
pub const MAX_TIMER_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Identifier of the logical owner of a timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "slot", content = "box_id", rename_all = "snake_case")]
pub enum TimerSlot {
    Staleness(String),
    Expiry(String),
    Liveness,
}

/// Opaque handle for one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A timer that reached its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired {
    pub handle: TimerHandle,
    pub slot: TimerSlot,
}

/// Schedules and cancels delayed callbacks keyed by slot.
pub trait Clock {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Schedule a timer for `slot` that fires after `after`.
    fn schedule(&mut self, slot: TimerSlot, after: Duration) -> TimerHandle;

    /// Cancel a pending timer. Cancelling an unknown or already fired handle
    /// is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Storage for the single live handle of one timer slot.
#[derive(Debug, Default)]
pub struct TimerCell {
    handle: Option<TimerHandle>,
}

impl TimerCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any handle held by this cell, then schedule a new one.
    pub fn arm<C: Clock + ?Sized>(
        &mut self,
        clock: &mut C,
        slot: TimerSlot,
        after: Duration,
    ) -> TimerHandle {
        self.cancel(clock);
        let handle = clock.schedule(slot, after);
        self.handle = Some(handle);
        handle
    }

    pub fn cancel<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        if let Some(handle) = self.handle.take() {
            clock.cancel(handle);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        self.handle
    }

    /// Consume a fired handle.
    ///
    /// Returns true and clears the cell when `handle` is the one this cell
    /// holds; returns false for a superseded handle.
    pub fn take_fired(&mut self, handle: TimerHandle) -> bool {
        if self.handle == Some(handle) {
            self.handle = None;
            true
        } else {
            false
        }
    }
}

/// Convert a std duration to a chrono delta, saturating on overflow.
pub fn to_time_delta(duration: Duration) -> chrono::TimeDelta {
    chrono::TimeDelta::from_std(duration).unwrap_or(chrono::TimeDelta::MAX)
}

/// Time elapsed between two instants, zero if `later` is before `earlier`.
pub fn elapsed_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    later
        .signed_duration_since(earlier)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Format a timestamp the way the board displays it (RFC 3339, milliseconds, UTC).
pub fn display_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
