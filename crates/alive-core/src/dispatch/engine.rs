use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::updates::BoardUpdate;
use crate::board::{BoardBox, BoxRegistry};
use crate::clock::{Clock, Fired, ManualClock, TimerSlot, to_time_delta};
use crate::config::AliveConfig;
use crate::errors::AliveError;
use crate::protocol::{
    BoxPatch, BoxPayload, Envelope, ProtocolError, SseFrame, decode_envelope,
};
use crate::view::markup::render_box;
use crate::watchdog::{LivenessOutcome, LivenessSettings, LivenessWatchdog, ResyncReason, mark_stale};

/// Which part of the board this engine drives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewScope {
    /// The whole board.
    #[default]
    Board,
    /// The detail page of a single box.
    Detail(String),
}

impl ViewScope {
    /// Whether an envelope concerns this view.
    pub fn admits(&self, envelope: &Envelope) -> bool {
        match (self, envelope) {
            (ViewScope::Board, _) => true,
            (ViewScope::Detail(_), Envelope::CreateBox { .. }) => false,
            (ViewScope::Detail(id), Envelope::UpdateBox(_) | Envelope::DeleteBox { .. }) => {
                envelope.target_id() == Some(id.as_str())
            }
            (ViewScope::Detail(_), _) => true,
        }
    }
}

/// Counters kept by the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Payloads and envelopes handed to the engine.
    pub received: u64,
    /// Envelopes that changed board or connection state.
    pub applied: u64,
    /// Unknown kinds, out-of-scope envelopes and references to missing boxes.
    pub ignored: u64,
    /// Payloads that failed to decode.
    pub malformed: u64,
    /// `createBox` envelopes the registry rejected.
    pub dropped: u64,
    pub resyncs: u64,
}

/// Reconciles server events and local timers into board updates.
///
/// Every entry point returns the ordered list of [`BoardUpdate`]s that the
/// display must apply; the engine itself never touches a view.
#[derive(Debug)]
pub struct BoardEngine<C: Clock> {
    clock: C,
    registry: BoxRegistry,
    liveness: LivenessWatchdog,
    scope: ViewScope,
    stats: DispatchStats,
}

impl<C: Clock> BoardEngine<C> {
    pub fn new(clock: C, config: &AliveConfig, scope: ViewScope) -> Self {
        Self {
            clock,
            registry: BoxRegistry::from_config(&config.board),
            liveness: LivenessWatchdog::new(LivenessSettings::from_config(&config.liveness)),
            scope,
            stats: DispatchStats::default(),
        }
    }

    /// Arm the liveness watchdog. The engine counts its start as a keepalive.
    pub fn start(&mut self) {
        let _ = self.liveness.start(&mut self.clock);
        info!(
            event = "core.dispatch.engine_started",
            scope = ?self.scope,
            boxes = self.registry.len(),
        );
    }

    /// Adopt boxes that are already displayed, in display order.
    ///
    /// No inserts are emitted. Timers are armed relative to each box's last
    /// update. Returns the number of boxes adopted.
    pub fn seed(&mut self, boxes: Vec<BoxPayload>) -> usize {
        let now = self.clock.now();
        let mut seeded = 0;
        for payload in boxes {
            if matches!(&self.scope, ViewScope::Detail(id) if *id != payload.id) {
                continue;
            }

            let state = BoardBox::from_payload(payload, now);
            let box_id = state.id.clone();
            match self.registry.append(state) {
                Ok(replaced) => {
                    if let Some(old) = replaced {
                        let _ = old.release(&mut self.clock);
                    }
                    if let Some(entry) = self.registry.entry_mut(&box_id) {
                        entry.arm_timers(&mut self.clock);
                    }
                    seeded += 1;
                }
                Err(e) => {
                    warn!(
                        event = "core.dispatch.seed_rejected",
                        box_id = box_id,
                        error = %e,
                        error_code = e.error_code(),
                    );
                }
            }
        }

        info!(event = "core.dispatch.seed_completed", boxes = seeded);
        seeded
    }

    /// Apply one event read off the transport.
    pub fn handle_frame(&mut self, frame: SseFrame) -> Vec<BoardUpdate> {
        match frame.into_payload() {
            Ok(raw) => self.handle_payload(&raw),
            Err(e) => {
                self.reject(&e, 0);
                Vec::new()
            }
        }
    }

    /// Decode one raw envelope payload and apply it.
    ///
    /// Malformed payloads are counted and dropped.
    pub fn handle_payload(&mut self, raw: &str) -> Vec<BoardUpdate> {
        match decode_envelope(raw) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) => {
                self.reject(&e, raw.len());
                Vec::new()
            }
        }
    }

    fn reject(&mut self, error: &ProtocolError, payload_len: usize) {
        self.stats.received += 1;
        self.stats.malformed += 1;
        warn!(
            event = "core.dispatch.envelope_malformed",
            error = %error,
            error_code = error.error_code(),
            payload_len = payload_len,
        );
    }

    pub fn dispatch(&mut self, envelope: Envelope) -> Vec<BoardUpdate> {
        self.stats.received += 1;

        if !self.scope.admits(&envelope) {
            debug!(
                event = "core.dispatch.out_of_scope",
                kind = envelope.kind(),
                box_id = envelope.target_id(),
            );
            self.stats.ignored += 1;
            return Vec::new();
        }

        debug!(
            event = "core.dispatch.envelope_received",
            kind = envelope.kind(),
            box_id = envelope.target_id(),
        );

        match envelope {
            Envelope::Keepalive => {
                self.stats.applied += 1;
                self.liveness
                    .keepalive(&mut self.clock)
                    .map(BoardUpdate::banner)
                    .into_iter()
                    .collect()
            }
            Envelope::CreateBox { after_id, payload } => self.create_box(&after_id, payload),
            Envelope::UpdateBox(patch) => self.update_box(&patch),
            Envelope::DeleteBox { id } => self.delete_box(&id),
            Envelope::ReloadPage => {
                self.stats.applied += 1;
                let mut updates = self.resync(ResyncReason::ServerRequested);
                // A reload starts over as if freshly loaded
                let connected = self.liveness.start(&mut self.clock);
                updates.extend(connected.map(BoardUpdate::banner));
                updates
            }
            Envelope::Unknown => {
                debug!(event = "core.dispatch.unknown_kind_ignored");
                self.stats.ignored += 1;
                Vec::new()
            }
        }
    }

    /// Apply a timer that reached its deadline.
    pub fn handle_timer(&mut self, fired: Fired) -> Vec<BoardUpdate> {
        match fired.slot {
            TimerSlot::Staleness(box_id) => {
                let now = self.clock.now();
                let history_limit = self.registry.history_limit();
                let Some(entry) = self.registry.entry_mut(&box_id) else {
                    debug!(event = "core.staleness.fired_for_missing_box", box_id = box_id);
                    return Vec::new();
                };
                if !entry.staleness.take_fired(fired.handle) {
                    debug!(event = "core.staleness.superseded", box_id = box_id);
                    return Vec::new();
                }

                mark_stale(&mut entry.state, now, history_limit);
                info!(
                    event = "core.staleness.box_went_stale",
                    box_id = box_id,
                    detail = %entry.state.last_message,
                );
                vec![BoardUpdate::render(&entry.state)]
            }
            TimerSlot::Expiry(box_id) => {
                let Some(entry) = self.registry.entry_mut(&box_id) else {
                    debug!(event = "core.expiry.fired_for_missing_box", box_id = box_id);
                    return Vec::new();
                };
                if !entry.expiry.take_fired(fired.handle) {
                    debug!(event = "core.expiry.superseded", box_id = box_id);
                    return Vec::new();
                }

                info!(event = "core.expiry.box_expired", box_id = box_id);
                self.remove_box(&box_id)
            }
            TimerSlot::Liveness => match self.liveness.on_fire(&mut self.clock, fired.handle) {
                LivenessOutcome::Superseded => Vec::new(),
                LivenessOutcome::Missed(banner) => {
                    banner.map(BoardUpdate::banner).into_iter().collect()
                }
                LivenessOutcome::Resync(reason) => self.resync(reason),
            },
        }
    }

    /// Cancel every timer the engine holds.
    pub fn shutdown(&mut self) {
        for entry in self.registry.drain() {
            let _ = entry.release(&mut self.clock);
        }
        self.liveness.cancel(&mut self.clock);
        info!(event = "core.dispatch.engine_stopped", stats = ?self.stats);
    }

    pub fn registry(&self) -> &BoxRegistry {
        &self.registry
    }

    pub fn liveness(&self) -> &LivenessWatchdog {
        &self.liveness
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    fn create_box(&mut self, after_id: &str, payload: BoxPayload) -> Vec<BoardUpdate> {
        let state = BoardBox::from_payload(payload, self.clock.now());
        let box_id = state.id.clone();

        let replaced = match self.registry.create(after_id, state) {
            Ok(replaced) => replaced,
            Err(e) => {
                warn!(
                    event = "core.registry.create_rejected",
                    box_id = box_id,
                    after_id = after_id,
                    error = %e,
                    error_code = e.error_code(),
                );
                self.stats.dropped += 1;
                return Vec::new();
            }
        };

        let mut updates = Vec::new();
        if let Some(old) = replaced {
            let old = old.release(&mut self.clock);
            debug!(event = "core.registry.box_replaced", box_id = old.id);
            updates.push(BoardUpdate::Remove { box_id: old.id });
        }

        let Some(entry) = self.registry.entry_mut(&box_id) else {
            return updates;
        };
        entry.arm_timers(&mut self.clock);
        let markup = render_box(&entry.state);

        let after_id = self
            .registry
            .predecessor(&box_id)
            .unwrap_or(after_id)
            .to_string();
        info!(
            event = "core.registry.box_created",
            box_id = box_id,
            after_id = after_id,
        );
        self.stats.applied += 1;
        updates.push(BoardUpdate::Insert {
            box_id,
            after_id,
            markup,
        });
        updates
    }

    fn update_box(&mut self, patch: &BoxPatch) -> Vec<BoardUpdate> {
        let now = self.clock.now();
        let Some(outcome) = self.registry.update(patch, now) else {
            debug!(event = "core.registry.update_unknown_box", box_id = patch.id);
            self.stats.ignored += 1;
            return Vec::new();
        };
        let Some(entry) = self.registry.entry_mut(&patch.id) else {
            return Vec::new();
        };

        if outcome.qualifying || patch.max_tbu.is_some() {
            entry.arm_staleness(&mut self.clock);
        }
        if outcome.qualifying || patch.expire_after.is_some() {
            entry.arm_expiry(&mut self.clock);
        }

        debug!(
            event = "core.registry.box_updated",
            box_id = patch.id,
            level = %entry.state.level,
            qualifying = outcome.qualifying,
            changed = outcome.changed,
        );
        self.stats.applied += 1;
        vec![BoardUpdate::render(&entry.state)]
    }

    fn delete_box(&mut self, box_id: &str) -> Vec<BoardUpdate> {
        if !self.registry.contains(box_id) {
            debug!(event = "core.registry.delete_unknown_box", box_id = box_id);
            self.stats.ignored += 1;
            return Vec::new();
        }
        self.stats.applied += 1;
        self.remove_box(box_id)
    }

    fn remove_box(&mut self, box_id: &str) -> Vec<BoardUpdate> {
        let Some(entry) = self.registry.delete(box_id) else {
            return Vec::new();
        };
        let state = entry.release(&mut self.clock);
        info!(event = "core.registry.box_removed", box_id = state.id);
        vec![BoardUpdate::Remove { box_id: state.id }]
    }

    fn resync(&mut self, reason: ResyncReason) -> Vec<BoardUpdate> {
        let dropped = self.registry.drain();
        let boxes = dropped.len();
        for entry in dropped {
            let _ = entry.release(&mut self.clock);
        }
        self.stats.resyncs += 1;
        warn!(
            event = "core.dispatch.resync_started",
            reason = %reason,
            boxes = boxes,
        );
        vec![BoardUpdate::Resync { reason }]
    }
}

impl BoardEngine<ManualClock> {
    /// Move virtual time forward, applying every timer that comes due on the
    /// way in deadline order.
    pub fn advance(&mut self, by: Duration) -> Vec<BoardUpdate> {
        let limit = self
            .clock
            .now()
            .checked_add_signed(to_time_delta(by))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);

        let mut updates = Vec::new();
        while let Some(fired) = self.clock.pop_due(limit) {
            updates.extend(self.handle_timer(fired));
        }
        self.clock.set_now(limit);
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> BoardEngine<ManualClock> {
        let mut engine = BoardEngine::new(
            ManualClock::default(),
            &AliveConfig::default(),
            ViewScope::Board,
        );
        engine.start();
        engine
    }

    fn create(id: &str, extra: &str) -> String {
        format!(
            r#"{{"type":"createBox","afterId":"status-bar","box":{{"id":"{id}","name":"{id}","status":"green"{extra}}}}}"#
        )
    }

    #[test]
    fn test_create_emits_insert_and_arms_timers() {
        let mut engine = engine();
        let updates = engine.handle_payload(&create("b1", r#","maxTBU":"10s","expireAfter":"60""#));

        assert_eq!(updates.len(), 1);
        let BoardUpdate::Insert {
            box_id, after_id, markup,
        } = &updates[0]
        else {
            panic!("expected insert");
        };
        assert_eq!(box_id, "b1");
        assert_eq!(after_id, "status-bar");
        assert!(markup.contains("class='green box'"));

        let clock = engine.clock();
        assert_eq!(clock.pending_for(&TimerSlot::Staleness("b1".to_string())), 1);
        assert_eq!(clock.pending_for(&TimerSlot::Expiry("b1".to_string())), 1);
        assert_eq!(engine.stats().applied, 1);
    }

    #[test]
    fn test_recreate_removes_before_insert() {
        let mut engine = engine();
        engine.handle_payload(&create("b1", r#","maxTBU":"10s""#));
        let updates = engine.handle_payload(&create("b1", r#","maxTBU":"20s""#));

        assert!(matches!(updates[0], BoardUpdate::Remove { .. }));
        assert!(matches!(updates[1], BoardUpdate::Insert { .. }));
        assert_eq!(engine.registry().len(), 1);
        assert_eq!(
            engine
                .clock()
                .pending_for(&TimerSlot::Staleness("b1".to_string())),
            1
        );
        assert_eq!(engine.clock().overlapping_schedules(), 0);
    }

    #[test]
    fn test_create_after_unknown_id_is_dropped() {
        let mut engine = engine();
        let updates = engine.handle_payload(
            r#"{"type":"createBox","afterId":"nope","box":{"id":"b1"}}"#,
        );
        assert!(updates.is_empty());
        assert_eq!(engine.stats().dropped, 1);
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_staleness_fires_and_qualifying_update_rearms() {
        let mut engine = engine();
        engine.handle_payload(&create("b1", r#","maxTBU":"10s""#));
        engine.handle_payload(r#"{"type":"keepalive"}"#);

        let updates = engine.advance(Duration::from_secs(4));
        assert!(updates.is_empty());
        engine.handle_payload(r#"{"type":"keepalive"}"#);
        let updates = engine.advance(Duration::from_secs(4));
        assert!(updates.is_empty());
        engine.handle_payload(r#"{"type":"keepalive"}"#);

        let updates = engine.advance(Duration::from_secs(2));
        assert_eq!(
            updates,
            vec![BoardUpdate::Render {
                box_id: "b1".to_string(),
                level: crate::board::AlertLevel::Stale,
                message: "No new updates for 10s.".to_string(),
                last_updated: "1970-01-01T00:00:00.000Z".to_string(),
            }]
        );

        engine.handle_payload(r#"{"type":"updateBox","id":"b1","status":"green"}"#);
        let state = engine.registry().get("b1").unwrap();
        assert_eq!(state.level, crate::board::AlertLevel::Green);
        assert_eq!(
            engine
                .clock()
                .pending_for(&TimerSlot::Staleness("b1".to_string())),
            1
        );
    }

    #[test]
    fn test_stale_update_does_not_rearm() {
        let mut engine = engine();
        engine.handle_payload(&create("b1", r#","maxTBU":"10s""#));
        assert!(engine.registry().entry("b1").unwrap().staleness.is_armed());

        engine.handle_payload(r#"{"type":"updateBox","id":"b1","status":"noUpdate"}"#);
        let state = engine.registry().get("b1").unwrap();
        assert_eq!(state.level, crate::board::AlertLevel::Stale);
        assert_eq!(engine.clock().overlapping_schedules(), 0);
    }

    #[test]
    fn test_unknown_references_are_ignored() {
        let mut engine = engine();
        assert!(
            engine
                .handle_payload(r#"{"type":"updateBox","id":"ghost","status":"red"}"#)
                .is_empty()
        );
        assert!(
            engine
                .handle_payload(r#"{"type":"deleteBox","id":"ghost"}"#)
                .is_empty()
        );
        assert!(engine.handle_payload(r#"{"type":"mystery"}"#).is_empty());
        assert_eq!(engine.stats().ignored, 3);
        assert_eq!(engine.stats().received, 3);
    }

    #[test]
    fn test_malformed_payload_is_counted() {
        let mut engine = engine();
        assert!(engine.handle_payload("not json").is_empty());
        assert!(
            engine
                .handle_payload(r#"{"type":"updateBox","id":"b1","maxTBU":"-5s"}"#)
                .is_empty()
        );
        assert_eq!(engine.stats().malformed, 2);
    }

    #[test]
    fn test_reload_page_drops_everything() {
        let mut engine = engine();
        engine.handle_payload(&create("b1", r#","maxTBU":"10s","expireAfter":"30s""#));
        engine.handle_payload(&create("b2", ""));

        let updates = engine.handle_payload(r#"{"type":"reloadPage"}"#);
        assert_eq!(
            updates,
            vec![BoardUpdate::Resync {
                reason: ResyncReason::ServerRequested
            }]
        );
        assert!(engine.registry().is_empty());
        assert_eq!(engine.clock().pending_count(), 1);
        assert_eq!(engine.stats().resyncs, 1);
    }

    #[test]
    fn test_reload_page_restarts_liveness() {
        let mut engine = engine();
        let updates = engine.advance(Duration::from_secs(11));
        assert_eq!(updates.len(), 1);
        assert_eq!(engine.liveness().missed(), 2);
        assert_eq!(engine.liveness().banner().level, crate::board::AlertLevel::Stale);

        let updates = engine.handle_payload(r#"{"type":"reloadPage"}"#);
        assert_eq!(
            updates,
            vec![
                BoardUpdate::Resync {
                    reason: ResyncReason::ServerRequested
                },
                BoardUpdate::Banner {
                    level: crate::board::AlertLevel::Green,
                    message: String::new(),
                },
            ]
        );
        assert_eq!(engine.liveness().missed(), 0);
        assert!(engine.liveness().is_armed());
        assert_eq!(engine.liveness().last_keepalive(), engine.clock().now());

        // A full window after the reload counts as the first miss again
        engine.advance(Duration::from_secs(5));
        assert_eq!(engine.liveness().missed(), 1);
    }

    #[test]
    fn test_undecodable_frame_counts_as_malformed() {
        let mut engine = engine();
        assert!(engine.handle_frame(SseFrame::InvalidUtf8).is_empty());
        assert_eq!(
            engine
                .handle_frame(SseFrame::Data(r#"{"type":"keepalive"}"#.to_string()))
                .len(),
            0
        );

        let stats = engine.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.applied, 1);
    }

    #[test]
    fn test_detail_scope_filters_envelopes() {
        let mut engine = BoardEngine::new(
            ManualClock::default(),
            &AliveConfig::default(),
            ViewScope::Detail("b1".to_string()),
        );
        engine.seed(vec![
            BoxPayload {
                id: "b1".to_string(),
                ..Default::default()
            },
            BoxPayload {
                id: "b2".to_string(),
                ..Default::default()
            },
        ]);
        assert_eq!(engine.registry().ids(), ["b1"]);

        assert!(engine.handle_payload(&create("b3", "")).is_empty());
        assert!(
            engine
                .handle_payload(r#"{"type":"updateBox","id":"b2","status":"red"}"#)
                .is_empty()
        );
        assert_eq!(
            engine
                .handle_payload(r#"{"type":"updateBox","id":"b1","status":"red"}"#)
                .len(),
            1
        );
        assert_eq!(engine.stats().ignored, 2);
    }

    #[test]
    fn test_shutdown_cancels_all_timers() {
        let mut engine = engine();
        engine.handle_payload(&create("b1", r#","maxTBU":"10s","expireAfter":"30s""#));
        engine.shutdown();
        assert_eq!(engine.clock().pending_count(), 0);
    }
}
