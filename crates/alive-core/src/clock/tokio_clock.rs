use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::time::{DelayQueue, delay_queue};
use tracing::debug;

use super::{Clock, Fired, MAX_TIMER_DELAY, TimerHandle, TimerSlot, to_time_delta};

/// Real-time clock backed by a tokio `DelayQueue`.
///
/// Expired timers are pulled with [`TokioClock::next_fired`], which the
/// stream runner polls next to the transport. Wall time is derived from the
/// tokio clock so that paused runtimes see time move with their timers.
#[derive(Debug)]
pub struct TokioClock {
    queue: DelayQueue<(TimerHandle, TimerSlot)>,
    keys: HashMap<TimerHandle, delay_queue::Key>,
    next_handle: u64,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Default for TokioClock {
    fn default() -> Self {
        Self {
            queue: DelayQueue::new(),
            keys: HashMap::new(),
            next_handle: 0,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }
}

impl TokioClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next timer to expire.
    ///
    /// Resolves to `None` immediately when nothing is scheduled.
    pub async fn next_fired(&mut self) -> Option<Fired> {
        let expired = std::future::poll_fn(|cx| self.queue.poll_expired(cx)).await?;
        let (handle, slot) = expired.into_inner();
        self.keys.remove(&handle);
        Some(Fired { handle, slot })
    }

    pub fn pending_count(&self) -> usize {
        self.keys.len()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.started_at
            .checked_add_signed(to_time_delta(self.started.elapsed()))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn schedule(&mut self, slot: TimerSlot, after: Duration) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        // The delay queue's timer wheel panics past roughly two years
        let after = if after > MAX_TIMER_DELAY {
            debug!(
                event = "core.clock.delay_clamped",
                slot = ?slot,
                requested = ?after,
            );
            MAX_TIMER_DELAY
        } else {
            after
        };
        let key = self.queue.insert((handle, slot), after);
        self.keys.insert(handle, key);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(key) = self.keys.remove(&handle) {
            self.queue.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_next_fired_returns_due_slot() {
        let mut clock = TokioClock::new();
        clock.schedule(TimerSlot::Liveness, Duration::from_secs(5));
        clock.schedule(
            TimerSlot::Expiry("b1".to_string()),
            Duration::from_secs(2),
        );

        let first = clock.next_fired().await.unwrap();
        assert_eq!(first.slot, TimerSlot::Expiry("b1".to_string()));
        let second = clock.next_fired().await.unwrap();
        assert_eq!(second.slot, TimerSlot::Liveness);
        assert_eq!(clock.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut clock = TokioClock::new();
        let cancelled = clock.schedule(TimerSlot::Liveness, Duration::from_secs(1));
        let kept = clock.schedule(
            TimerSlot::Staleness("b1".to_string()),
            Duration::from_secs(3),
        );
        clock.cancel(cancelled);
        clock.cancel(cancelled);

        let fired = clock.next_fired().await.unwrap();
        assert_eq!(fired.handle, kept);
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_follows_tokio_time() {
        let clock = TokioClock::new();
        let before = clock.now();
        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(
            clock.now().signed_duration_since(before).num_seconds(),
            90
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_beyond_wheel_range_is_clamped() {
        let mut clock = TokioClock::new();
        let far = clock.schedule(
            TimerSlot::Staleness("b1".to_string()),
            Duration::from_secs(20_000 * 3600),
        );
        clock.schedule(TimerSlot::Liveness, Duration::MAX);
        assert_eq!(clock.pending_count(), 2);

        clock.cancel(far);
        let fired = clock.next_fired().await.unwrap();
        assert_eq!(fired.slot, TimerSlot::Liveness);
    }

    #[tokio::test]
    async fn test_empty_queue_resolves_none() {
        let mut clock = TokioClock::new();
        assert!(clock.next_fired().await.is_none());
    }
}
