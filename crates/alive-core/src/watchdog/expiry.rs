use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, TimerCell, TimerHandle, TimerSlot, elapsed_between};

/// Per-box time-to-live. When it fires the box is removed from the board.
#[derive(Debug, Default)]
pub struct ExpiryScheduler {
    cell: TimerCell,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for the rest of `ttl` counted from `last_update`; zero disables.
    pub fn arm<C: Clock + ?Sized>(
        &mut self,
        clock: &mut C,
        box_id: &str,
        ttl: Duration,
        last_update: DateTime<Utc>,
    ) -> Option<TimerHandle> {
        if ttl.is_zero() {
            self.cancel(clock);
            return None;
        }

        let remaining = ttl.saturating_sub(elapsed_between(last_update, clock.now()));
        Some(
            self.cell
                .arm(clock, TimerSlot::Expiry(box_id.to_string()), remaining),
        )
    }

    pub fn cancel<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        self.cell.cancel(clock);
    }

    pub fn is_armed(&self) -> bool {
        self.cell.is_armed()
    }

    pub fn take_fired(&mut self, handle: TimerHandle) -> bool {
        self.cell.take_fired(handle)
    }
}
