use std::io::Write;

use tracing::warn;

use super::BoardView;
use crate::board::AlertLevel;
use crate::dispatch::BoardUpdate;
use crate::watchdog::ResyncReason;

/// Writes every board update as one JSON object per line.
///
/// Write failures are logged and counted; the board keeps running.
#[derive(Debug)]
pub struct JsonLinesView<W: Write> {
    writer: W,
    write_failures: usize,
}

impl<W: Write> JsonLinesView<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            write_failures: 0,
        }
    }

    pub fn write_failures(&self) -> usize {
        self.write_failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, update: &BoardUpdate) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, update)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> BoardView for JsonLinesView<W> {
    fn render(&mut self, box_id: &str, level: AlertLevel, message: &str, last_updated: &str) {
        self.apply(&BoardUpdate::Render {
            box_id: box_id.to_string(),
            level,
            message: message.to_string(),
            last_updated: last_updated.to_string(),
        });
    }

    fn insert(&mut self, box_id: &str, after_id: &str, markup: &str) {
        self.apply(&BoardUpdate::Insert {
            box_id: box_id.to_string(),
            after_id: after_id.to_string(),
            markup: markup.to_string(),
        });
    }

    fn remove(&mut self, box_id: &str) {
        self.apply(&BoardUpdate::Remove {
            box_id: box_id.to_string(),
        });
    }

    fn set_connection_banner(&mut self, level: AlertLevel, message: &str) {
        self.apply(&BoardUpdate::Banner {
            level,
            message: message.to_string(),
        });
    }

    fn resync(&mut self, reason: &ResyncReason) {
        self.apply(&BoardUpdate::Resync {
            reason: reason.clone(),
        });
    }

    fn apply(&mut self, update: &BoardUpdate) {
        if let Err(e) = self.write_line(update) {
            self.write_failures += 1;
            warn!(
                event = "core.view.write_failed",
                error = %e,
                failures = self.write_failures,
            );
        }
    }
}
