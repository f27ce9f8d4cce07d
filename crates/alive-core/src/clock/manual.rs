use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::{Clock, Fired, TimerHandle, TimerSlot, to_time_delta};

/// Virtual clock for deterministic tests and replays.
///
/// Time only moves when the owner calls [`ManualClock::pop_due`] or
/// [`ManualClock::set_now`]. The clock counts every schedule that lands on a
/// slot which already has a pending timer, so tests can assert that no slot
/// ever holds two live handles.
#[derive(Debug)]
pub struct ManualClock {
    now: DateTime<Utc>,
    next_handle: u64,
    queue: BTreeMap<(DateTime<Utc>, TimerHandle), TimerSlot>,
    deadlines: HashMap<TimerHandle, DateTime<Utc>>,
    overlapping_schedules: usize,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(DateTime::<Utc>::default())
    }
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            next_handle: 1,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
            overlapping_schedules: 0,
        }
    }

    /// Pop the earliest timer due at or before `limit`, moving the clock to
    /// its deadline.
    pub fn pop_due(&mut self, limit: DateTime<Utc>) -> Option<Fired> {
        let (&(deadline, handle), _) = self.queue.first_key_value()?;
        if deadline > limit {
            return None;
        }

        let slot = self.queue.remove(&(deadline, handle))?;
        self.deadlines.remove(&handle);
        if deadline > self.now {
            self.now = deadline;
        }
        Some(Fired { handle, slot })
    }

    /// Move the clock forward to `now`. Never moves backwards.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_for(&self, slot: &TimerSlot) -> usize {
        self.queue.values().filter(|s| *s == slot).count()
    }

    /// Number of schedules that found another live timer in the same slot.
    pub fn overlapping_schedules(&self) -> usize {
        self.overlapping_schedules
    }

    /// Deadline of a pending handle.
    pub fn deadline(&self, handle: TimerHandle) -> Option<DateTime<Utc>> {
        self.deadlines.get(&handle).copied()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn schedule(&mut self, slot: TimerSlot, after: Duration) -> TimerHandle {
        if self.queue.values().any(|s| *s == slot) {
            self.overlapping_schedules += 1;
            warn!(
                event = "core.clock.slot_overlap",
                slot = ?slot,
                "Scheduled a timer for a slot that already has one pending"
            );
        }

        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let deadline = self
            .now
            .checked_add_signed(to_time_delta(after))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.queue.insert((deadline, handle), slot);
        self.deadlines.insert(handle, deadline);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(deadline) = self.deadlines.remove(&handle) {
            self.queue.remove(&(deadline, handle));
        }
    }
}
