use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::errors::BoardError;
use super::types::{AlertLevel, BoardBox};
use crate::clock::Clock;
use crate::config::BoardConfig;
use crate::protocol::BoxPatch;
use crate::watchdog::{ExpiryScheduler, StalenessWatchdog};

/// A box together with the two timers it owns.
#[derive(Debug)]
pub struct BoxEntry {
    pub state: BoardBox,
    pub staleness: StalenessWatchdog,
    pub expiry: ExpiryScheduler,
}

impl BoxEntry {
    pub fn new(state: BoardBox) -> Self {
        Self {
            state,
            staleness: StalenessWatchdog::new(),
            expiry: ExpiryScheduler::new(),
        }
    }

    /// Arm both timers from the stored thresholds and last update time.
    pub fn arm_timers<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        self.arm_staleness(clock);
        self.arm_expiry(clock);
    }

    pub fn arm_staleness<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        self.staleness.arm(
            clock,
            &self.state.id,
            self.state.max_tbu,
            self.state.last_update,
        );
    }

    pub fn arm_expiry<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        self.expiry.arm(
            clock,
            &self.state.id,
            self.state.expire_after,
            self.state.last_update,
        );
    }

    /// Cancel both timers and hand back the final box state.
    pub fn release<C: Clock + ?Sized>(mut self, clock: &mut C) -> BoardBox {
        self.staleness.cancel(clock);
        self.expiry.cancel(clock);
        self.state
    }
}

/// What an `updateBox` did to an existing box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOutcome {
    /// The update carried a non-stale status and refreshed the box.
    pub qualifying: bool,
    /// Level or message changed.
    pub changed: bool,
}

/// Ordered collection of the boxes on the board.
///
/// Entries removed from the registry are returned to the caller, who must
/// release their timers against the clock.
#[derive(Debug)]
pub struct BoxRegistry {
    order: Vec<String>,
    entries: HashMap<String, BoxEntry>,
    anchors: Vec<String>,
    history_limit: usize,
}

impl BoxRegistry {
    pub fn new(anchors: Vec<String>, history_limit: usize) -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
            anchors,
            history_limit,
        }
    }

    pub fn from_config(config: &BoardConfig) -> Self {
        Self::new(config.anchors(), config.history_limit())
    }

    pub fn is_anchor(&self, id: &str) -> bool {
        self.anchors.iter().any(|a| a == id)
    }

    /// Insert `state` after the box or anchor `after_id`.
    ///
    /// An existing box with the same id is taken out first and returned. When
    /// `after_id` names the box being replaced, the new box keeps its
    /// position. On error the registry is left untouched.
    #[must_use = "a replaced entry still holds live timers"]
    pub fn create(
        &mut self,
        after_id: &str,
        state: BoardBox,
    ) -> Result<Option<BoxEntry>, BoardError> {
        self.check_new_id(&state.id)?;

        let replacing = self.entries.contains_key(&state.id);
        let insert_at = if after_id == state.id && replacing {
            self.position(&state.id)
        } else if self.is_anchor(after_id) {
            Some(0)
        } else if after_id != state.id {
            self.position(after_id).map(|pos| pos + 1)
        } else {
            None
        };
        let Some(mut insert_at) = insert_at else {
            return Err(BoardError::AnchorNotFound {
                box_id: state.id,
                after_id: after_id.to_string(),
            });
        };

        let replaced = if replacing {
            if let Some(old_pos) = self.position(&state.id) {
                self.order.remove(old_pos);
                if old_pos < insert_at {
                    insert_at -= 1;
                }
            }
            self.entries.remove(&state.id)
        } else {
            None
        };

        debug!(
            event = "core.registry.box_inserted",
            box_id = state.id,
            after_id = after_id,
            position = insert_at,
            replaced = replaced.is_some(),
        );
        self.order.insert(insert_at, state.id.clone());
        self.entries.insert(state.id.clone(), BoxEntry::new(state));
        Ok(replaced)
    }

    /// Add a box at the end of the display order.
    #[must_use = "a replaced entry still holds live timers"]
    pub fn append(&mut self, state: BoardBox) -> Result<Option<BoxEntry>, BoardError> {
        self.check_new_id(&state.id)?;

        let replaced = self.entries.remove(&state.id);
        if replaced.is_some() {
            self.order.retain(|id| *id != state.id);
        }
        self.order.push(state.id.clone());
        self.entries.insert(state.id.clone(), BoxEntry::new(state));
        Ok(replaced)
    }

    /// Apply the fields present in `patch`.
    ///
    /// Returns `None` when the box is unknown. Timers are left to the
    /// caller; see [`BoxEntry::arm_timers`].
    pub fn update(&mut self, patch: &BoxPatch, now: DateTime<Utc>) -> Option<PatchOutcome> {
        let history_limit = self.history_limit;
        let entry = self.entries.get_mut(&patch.id)?;
        let state = &mut entry.state;

        let level = patch.status().map(AlertLevel::normalize);
        let mut changed = false;
        if let Some(level) = level {
            changed |= state.level != level;
            state.level = level;
        }
        if let Some(message) = patch.message() {
            changed |= state.last_message != message;
            state.last_message = message.to_string();
        }
        if let Some(max_tbu) = patch.max_tbu {
            state.max_tbu = max_tbu;
        }
        if let Some(expire_after) = patch.expire_after {
            state.expire_after = expire_after;
        }

        let qualifying = level != Some(AlertLevel::Stale);
        if qualifying {
            state.last_update = now;
        }
        if level.is_some() || patch.message().is_some() {
            state.record(now, history_limit);
        }

        Some(PatchOutcome {
            qualifying,
            changed,
        })
    }

    /// Remove a box. Unknown ids are a no-op.
    #[must_use = "a removed entry still holds live timers"]
    pub fn delete(&mut self, id: &str) -> Option<BoxEntry> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|o| o != id);
        Some(entry)
    }

    pub fn get(&self, id: &str) -> Option<&BoardBox> {
        self.entries.get(id).map(|e| &e.state)
    }

    pub fn entry(&self, id: &str) -> Option<&BoxEntry> {
        self.entries.get(id)
    }

    pub fn entry_mut(&mut self, id: &str) -> Option<&mut BoxEntry> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Box ids in display order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Boxes in display order.
    pub fn boxes(&self) -> impl Iterator<Item = &BoardBox> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| &e.state))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|o| o == id)
    }

    /// Id of the box or anchor displayed right before `id`.
    pub fn predecessor(&self, id: &str) -> Option<&str> {
        match self.position(id)? {
            0 => self.anchors.last().map(String::as_str),
            pos => self.order.get(pos - 1).map(String::as_str),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Take every entry out, in display order.
    #[must_use = "drained entries still hold live timers"]
    pub fn drain(&mut self) -> Vec<BoxEntry> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .collect()
    }

    fn check_new_id(&self, id: &str) -> Result<(), BoardError> {
        if id.trim().is_empty() {
            return Err(BoardError::InvalidBox {
                message: "box id is empty".to_string(),
            });
        }
        if self.is_anchor(id) {
            return Err(BoardError::InvalidBox {
                message: format!("box id '{}' collides with an anchor", id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn registry() -> BoxRegistry {
        BoxRegistry::new(vec!["root".to_string(), "status-bar".to_string()], 5)
    }

    fn board_box(id: &str) -> BoardBox {
        BoardBox::new(id, DateTime::<Utc>::default())
    }

    fn patch(id: &str, status: Option<&str>, message: Option<&str>) -> BoxPatch {
        BoxPatch {
            id: id.to_string(),
            status: status.map(str::to_string),
            message: message.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_after_anchor_goes_first() {
        let mut reg = registry();
        assert!(reg.create("status-bar", board_box("a")).unwrap().is_none());
        assert!(reg.create("status-bar", board_box("b")).unwrap().is_none());
        assert_eq!(reg.ids(), ["b", "a"]);
        assert_eq!(reg.predecessor("b"), Some("status-bar"));
        assert_eq!(reg.predecessor("a"), Some("b"));
    }

    #[test]
    fn test_create_after_box() {
        let mut reg = registry();
        let _ = reg.create("root", board_box("a")).unwrap();
        let _ = reg.create("root", board_box("c")).unwrap();
        let _ = reg.create("a", board_box("b")).unwrap();
        assert_eq!(reg.ids(), ["c", "a", "b"]);
    }

    #[test]
    fn test_create_unknown_after_id_is_rejected() {
        let mut reg = registry();
        let err = reg.create("nowhere", board_box("a")).unwrap_err();
        assert!(matches!(err, BoardError::AnchorNotFound { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_create_rejects_anchor_and_empty_ids() {
        let mut reg = registry();
        assert!(matches!(
            reg.create("root", board_box("status-bar")),
            Err(BoardError::InvalidBox { .. })
        ));
        assert!(matches!(
            reg.create("root", board_box(" ")),
            Err(BoardError::InvalidBox { .. })
        ));
    }

    #[test]
    fn test_create_existing_id_replaces_entry() {
        let mut clock = ManualClock::default();
        let mut reg = registry();
        let _ = reg.create("root", board_box("a")).unwrap();
        let _ = reg.create("a", board_box("b")).unwrap();
        let _ = reg.create("b", board_box("c")).unwrap();

        let mut replacement = board_box("a");
        replacement.last_message = "new".to_string();
        let old = reg.create("c", replacement).unwrap().unwrap();
        let _ = old.release(&mut clock);

        assert_eq!(reg.ids(), ["b", "c", "a"]);
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.get("a").unwrap().last_message, "new");
    }

    #[test]
    fn test_create_after_itself_keeps_position() {
        let mut reg = registry();
        let _ = reg.create("root", board_box("a")).unwrap();
        let _ = reg.create("a", board_box("b")).unwrap();
        assert!(reg.create("a", board_box("a")).unwrap().is_some());
        assert_eq!(reg.ids(), ["a", "b"]);

        assert!(reg.create("z", board_box("z")).is_err());
    }

    #[test]
    fn test_update_applies_present_fields_only() {
        let start = DateTime::<Utc>::default();
        let later = start + chrono::TimeDelta::seconds(30);
        let mut reg = registry();
        let mut initial = board_box("a");
        initial.last_message = "ok".to_string();
        initial.max_tbu = Duration::from_secs(60);
        let _ = reg.create("root", initial).unwrap();

        let outcome = reg.update(&patch("a", Some("red"), None), later).unwrap();
        assert_eq!(
            outcome,
            PatchOutcome {
                qualifying: true,
                changed: true
            }
        );

        let state = reg.get("a").unwrap();
        assert_eq!(state.level, AlertLevel::Red);
        assert_eq!(state.last_message, "ok");
        assert_eq!(state.max_tbu, Duration::from_secs(60));
        assert_eq!(state.last_update, later);
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn test_stale_update_does_not_refresh_last_update() {
        let start = DateTime::<Utc>::default();
        let mut reg = registry();
        let _ = reg.create("root", board_box("a")).unwrap();

        let outcome = reg
            .update(
                &patch("a", Some("noUpdate"), Some("late")),
                start + chrono::TimeDelta::seconds(9),
            )
            .unwrap();

        assert!(!outcome.qualifying);
        let state = reg.get("a").unwrap();
        assert_eq!(state.level, AlertLevel::Stale);
        assert_eq!(state.last_update, start);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut reg = registry();
        assert!(
            reg.update(&patch("ghost", Some("red"), None), DateTime::<Utc>::default())
                .is_none()
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut reg = registry();
        let _ = reg.create("root", board_box("a")).unwrap();
        assert!(reg.delete("a").is_some());
        assert!(reg.delete("a").is_none());
        assert!(reg.ids().is_empty());
    }

    #[test]
    fn test_release_cancels_timers() {
        let mut clock = ManualClock::default();
        let mut reg = registry();
        let mut initial = board_box("a");
        initial.max_tbu = Duration::from_secs(10);
        initial.expire_after = Duration::from_secs(20);
        let _ = reg.create("root", initial).unwrap();

        reg.entry_mut("a").unwrap().arm_timers(&mut clock);
        assert_eq!(clock.pending_count(), 2);

        let entry = reg.delete("a").unwrap();
        let state = entry.release(&mut clock);
        assert_eq!(state.id, "a");
        assert_eq!(clock.pending_count(), 0);
    }

    #[test]
    fn test_drain_returns_display_order() {
        let mut reg = registry();
        let _ = reg.append(board_box("a")).unwrap();
        let _ = reg.append(board_box("b")).unwrap();
        let _ = reg.create("root", board_box("c")).unwrap();

        let drained: Vec<String> = reg.drain().into_iter().map(|e| e.state.id).collect();
        assert_eq!(drained, ["c", "a", "b"]);
        assert!(reg.is_empty());
        assert_eq!(reg.boxes().count(), 0);
    }
}
