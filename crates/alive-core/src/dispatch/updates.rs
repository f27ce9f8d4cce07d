use serde::Serialize;

use crate::board::{AlertLevel, BoardBox};
use crate::clock::display_time;
use crate::watchdog::{Banner, ResyncReason};

/// A change the display has to make.
///
/// The engine returns these in the order they must be applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BoardUpdate {
    Insert {
        box_id: String,
        after_id: String,
        markup: String,
    },
    Render {
        box_id: String,
        level: AlertLevel,
        message: String,
        last_updated: String,
    },
    Remove {
        box_id: String,
    },
    Banner {
        level: AlertLevel,
        message: String,
    },
    Resync {
        reason: ResyncReason,
    },
}

impl BoardUpdate {
    pub fn render(state: &BoardBox) -> Self {
        BoardUpdate::Render {
            box_id: state.id.clone(),
            level: state.level,
            message: state.last_message.clone(),
            last_updated: display_time(state.last_update),
        }
    }

    pub fn banner(banner: Banner) -> Self {
        BoardUpdate::Banner {
            level: banner.level,
            message: banner.message,
        }
    }

    /// Box this update targets, if any.
    pub fn box_id(&self) -> Option<&str> {
        match self {
            BoardUpdate::Insert { box_id, .. }
            | BoardUpdate::Render { box_id, .. }
            | BoardUpdate::Remove { box_id } => Some(box_id),
            BoardUpdate::Banner { .. } | BoardUpdate::Resync { .. } => None,
        }
    }
}
