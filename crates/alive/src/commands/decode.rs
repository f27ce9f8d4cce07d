use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::ArgMatches;
use serde::Serialize;
use tracing::info;

use alive_core::decode_envelope;
use alive_core::protocol::{SseFrame, read_frame};

use super::helpers::{build_runtime, open_input};

/// One output line of `alive decode`.
#[derive(Debug, Serialize)]
struct DecodedFrame {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DecodedFrame {
    fn from_frame(frame: SseFrame) -> Self {
        match frame.into_payload() {
            Ok(raw) => Self::from_payload(&raw),
            Err(e) => DecodedFrame {
                kind: "malformed",
                id: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn from_payload(raw: &str) -> Self {
        match decode_envelope(raw) {
            Ok(envelope) => DecodedFrame {
                kind: envelope.kind(),
                id: envelope.target_id().map(str::to_string),
                error: None,
            },
            Err(e) => DecodedFrame {
                kind: "malformed",
                id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

pub(crate) fn handle_decode_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = matches.get_one::<PathBuf>("input");
    info!(event = "cli.decode_started", input = ?input);

    let runtime = build_runtime()?;
    let result = runtime.block_on(async {
        let mut reader = open_input(input).await?;
        let mut stdout = std::io::stdout().lock();
        let mut frames = 0usize;
        let mut malformed = 0usize;

        while let Some(frame) = read_frame(&mut reader).await? {
            let decoded = DecodedFrame::from_frame(frame);
            frames += 1;
            if decoded.error.is_some() {
                malformed += 1;
            }
            serde_json::to_writer(&mut stdout, &decoded)?;
            writeln!(stdout)?;
        }
        stdout.flush()?;
        Ok::<_, Box<dyn std::error::Error>>((frames, malformed))
    });
    runtime.shutdown_timeout(Duration::from_millis(100));

    let (frames, malformed) = result?;
    info!(
        event = "cli.decode_completed",
        frames = frames,
        malformed = malformed,
    );
    Ok(())
}
