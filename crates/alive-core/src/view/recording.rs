use super::BoardView;
use crate::board::AlertLevel;
use crate::dispatch::BoardUpdate;
use crate::watchdog::ResyncReason;

/// In-memory view that keeps every update and a model of the board.
///
/// Used by tests and replays to check what a real display would show.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub updates: Vec<BoardUpdate>,
    /// Box ids in display order.
    pub order: Vec<String>,
    pub banner: Option<(AlertLevel, String)>,
    pub resyncs: usize,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last rendered level of a box, if any render was seen for it.
    pub fn level_of(&self, box_id: &str) -> Option<AlertLevel> {
        self.updates.iter().rev().find_map(|u| match u {
            BoardUpdate::Render {
                box_id: id, level, ..
            } if id == box_id => Some(*level),
            _ => None,
        })
    }
}

impl BoardView for RecordingView {
    fn render(&mut self, box_id: &str, level: AlertLevel, message: &str, last_updated: &str) {
        self.updates.push(BoardUpdate::Render {
            box_id: box_id.to_string(),
            level,
            message: message.to_string(),
            last_updated: last_updated.to_string(),
        });
    }

    fn insert(&mut self, box_id: &str, after_id: &str, markup: &str) {
        let at = self
            .order
            .iter()
            .position(|id| id == after_id)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        self.order.insert(at, box_id.to_string());
        self.updates.push(BoardUpdate::Insert {
            box_id: box_id.to_string(),
            after_id: after_id.to_string(),
            markup: markup.to_string(),
        });
    }

    fn remove(&mut self, box_id: &str) {
        self.order.retain(|id| id != box_id);
        self.updates.push(BoardUpdate::Remove {
            box_id: box_id.to_string(),
        });
    }

    fn set_connection_banner(&mut self, level: AlertLevel, message: &str) {
        self.banner = Some((level, message.to_string()));
        self.updates.push(BoardUpdate::Banner {
            level,
            message: message.to_string(),
        });
    }

    fn resync(&mut self, reason: &ResyncReason) {
        self.order.clear();
        self.resyncs += 1;
        self.updates.push(BoardUpdate::Resync {
            reason: reason.clone(),
        });
    }
}
