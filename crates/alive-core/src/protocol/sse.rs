//! Server-sent events framing.
//!
//! The board server writes each envelope as `data: <json>` followed by a
//! blank line. Only `data` fields matter here; `event`, `id`, `retry` and
//! comment lines are skipped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::errors::ProtocolError;

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// The joined `data` lines of the event.
    Data(String),
    /// A `data` line was not valid UTF-8. The event carries no usable payload.
    InvalidUtf8,
}

impl SseFrame {
    /// The event payload, or the decoding error that made it unusable.
    pub fn into_payload(self) -> Result<String, ProtocolError> {
        match self {
            SseFrame::Data(payload) => Ok(payload),
            SseFrame::InvalidUtf8 => Err(ProtocolError::InvalidEncoding {
                reason: "data line is not valid UTF-8".to_string(),
            }),
        }
    }
}

/// Read the next event from an SSE stream.
///
/// Returns `Ok(None)` at end of stream. An event left incomplete when the
/// stream ends is discarded. Lines are decoded one by one, so bytes that are
/// not UTF-8 spoil only the event they belong to. Not cancellation safe: run
/// it in its own task.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<SseFrame>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut data_lines: Vec<String> = Vec::new();
    let mut invalid = false;
    let mut line: Vec<u8> = Vec::new();

    loop {
        line.clear();
        let bytes_read = reader.read_until(b'\n', &mut line).await?;
        if bytes_read == 0 {
            return Ok(None);
        }

        let trimmed = trim_line_end(&line);
        if trimmed.is_empty() {
            if invalid {
                return Ok(Some(SseFrame::InvalidUtf8));
            }
            if data_lines.is_empty() {
                continue;
            }
            return Ok(Some(SseFrame::Data(data_lines.join("\n"))));
        }

        if trimmed.starts_with(b":") {
            continue;
        }

        let (field, value) = match trimmed.iter().position(|b| *b == b':') {
            Some(colon) => {
                let value = &trimmed[colon + 1..];
                (&trimmed[..colon], value.strip_prefix(b" ").unwrap_or(value))
            }
            None => (trimmed, &[][..]),
        };
        if field != b"data" {
            continue;
        }
        match std::str::from_utf8(value) {
            Ok(text) => data_lines.push(text.to_string()),
            Err(_) => invalid = true,
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
