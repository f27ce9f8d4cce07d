//! Display adapters.
//!
//! A [`BoardView`] receives the updates produced by the engine. The engine
//! never calls a view directly; the stream runner applies each update in
//! order with [`BoardView::apply`].

pub mod json_lines;
pub mod markup;
pub mod recording;

pub use json_lines::JsonLinesView;
pub use recording::RecordingView;

use crate::board::AlertLevel;
use crate::dispatch::BoardUpdate;
use crate::watchdog::ResyncReason;

pub trait BoardView {
    /// Show a new level and message on an existing box.
    fn render(&mut self, box_id: &str, level: AlertLevel, message: &str, last_updated: &str);

    /// Insert rendered box markup after `after_id`.
    fn insert(&mut self, box_id: &str, after_id: &str, markup: &str);

    fn remove(&mut self, box_id: &str);

    fn set_connection_banner(&mut self, level: AlertLevel, message: &str);

    /// Drop everything and reload the board from the server.
    fn resync(&mut self, reason: &ResyncReason);

    fn apply(&mut self, update: &BoardUpdate) {
        match update {
            BoardUpdate::Insert {
                box_id,
                after_id,
                markup,
            } => self.insert(box_id, after_id, markup),
            BoardUpdate::Render {
                box_id,
                level,
                message,
                last_updated,
            } => self.render(box_id, *level, message, last_updated),
            BoardUpdate::Remove { box_id } => self.remove(box_id),
            BoardUpdate::Banner { level, message } => self.set_connection_banner(*level, message),
            BoardUpdate::Resync { reason } => self.resync(reason),
        }
    }
}
