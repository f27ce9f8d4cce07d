use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::board::{AlertLevel, BoardBox};
use crate::clock::{Clock, TimerCell, TimerHandle, TimerSlot, elapsed_between};
use crate::protocol::format_duration;

/// Per-box timer that marks the box stale when no qualifying update arrives
/// within its threshold.
#[derive(Debug, Default)]
pub struct StalenessWatchdog {
    cell: TimerCell,
}

impl StalenessWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for whatever is left of `threshold` since `last_update`.
    ///
    /// A zero threshold cancels the timer and leaves it disarmed. A box whose
    /// threshold already ran out gets a timer that fires immediately.
    pub fn arm<C: Clock + ?Sized>(
        &mut self,
        clock: &mut C,
        box_id: &str,
        threshold: Duration,
        last_update: DateTime<Utc>,
    ) -> Option<TimerHandle> {
        if threshold.is_zero() {
            self.cancel(clock);
            return None;
        }

        let remaining = threshold.saturating_sub(elapsed_between(last_update, clock.now()));
        Some(
            self.cell
                .arm(clock, TimerSlot::Staleness(box_id.to_string()), remaining),
        )
    }

    pub fn cancel<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        self.cell.cancel(clock);
    }

    pub fn is_armed(&self) -> bool {
        self.cell.is_armed()
    }

    /// True when `handle` is the live staleness timer. Clears the slot.
    pub fn take_fired(&mut self, handle: TimerHandle) -> bool {
        self.cell.take_fired(handle)
    }
}

/// Message shown on a box that went stale.
///
/// Sub-second precision is dropped once at least a second has passed.
pub fn stale_message(elapsed: Duration) -> String {
    let shown = if elapsed >= Duration::from_secs(1) {
        Duration::from_secs(elapsed.as_secs())
    } else {
        elapsed
    };
    format!("No new updates for {}.", format_duration(shown))
}

/// Switch a box to `stale`, recording the change in its history.
pub fn mark_stale(state: &mut BoardBox, now: DateTime<Utc>, history_limit: usize) {
    state.level = AlertLevel::Stale;
    state.last_message = stale_message(elapsed_between(state.last_update, now));
    state.record(now, history_limit);
}
