//! Real-time stream runner.
//!
//! Reads SSE frames from the transport on a spawned task and feeds them to a
//! [`BoardEngine`] alongside the timers of its [`TokioClock`]. Every update
//! the engine produces is applied to the view before the next input is
//! taken.

use serde::Serialize;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::TokioClock;
use crate::dispatch::{BoardEngine, BoardUpdate, DispatchStats};
use crate::protocol::{ProtocolError, SseFrame, read_frame};
use crate::view::BoardView;

const FRAME_BUFFER: usize = 64;

/// Why the runner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEnd {
    EndOfStream,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub frames: u64,
    pub end: StreamEnd,
    pub stats: DispatchStats,
}

/// Run the engine until the stream ends or `shutdown` is cancelled.
///
/// Starts the engine and shuts it down on the way out, so no timer outlives
/// the call. A transport read error ends the run with that error.
pub async fn run_stream<R, V>(
    reader: R,
    engine: &mut BoardEngine<TokioClock>,
    view: &mut V,
    shutdown: CancellationToken,
) -> Result<StreamSummary, ProtocolError>
where
    R: AsyncBufRead + Send + Unpin + 'static,
    V: BoardView + ?Sized,
{
    let (tx, mut rx) = mpsc::channel(FRAME_BUFFER);
    let reader_task = tokio::spawn(read_frames(reader, tx));

    engine.start();
    info!(event = "core.stream.run_started");

    let mut frames = 0u64;
    let result = loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break Ok(StreamEnd::Shutdown),
            frame = rx.recv() => match frame {
                Some(Ok(frame)) => {
                    frames += 1;
                    apply_all(view, engine.handle_frame(frame));
                }
                Some(Err(e)) => break Err(e),
                None => break Ok(StreamEnd::EndOfStream),
            },
            Some(fired) = engine.clock_mut().next_fired() => {
                debug!(event = "core.stream.timer_fired", slot = ?fired.slot);
                apply_all(view, engine.handle_timer(fired));
            }
        }
    };

    reader_task.abort();
    engine.shutdown();

    match result {
        Ok(end) => {
            let summary = StreamSummary {
                frames,
                end,
                stats: engine.stats(),
            };
            info!(
                event = "core.stream.run_completed",
                frames = frames,
                end = ?end,
                stats = ?summary.stats,
            );
            Ok(summary)
        }
        Err(e) => {
            warn!(event = "core.stream.run_failed", frames = frames, error = %e);
            Err(e)
        }
    }
}

fn apply_all<V: BoardView + ?Sized>(view: &mut V, updates: Vec<BoardUpdate>) {
    for update in &updates {
        view.apply(update);
    }
}

async fn read_frames<R>(mut reader: R, tx: mpsc::Sender<Result<SseFrame, ProtocolError>>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => {
                debug!(event = "core.stream.end_of_stream");
                return;
            }
            Err(e) => Err(e),
        };
        let failed = frame.is_err();
        if tx.send(frame).await.is_err() || failed {
            return;
        }
    }
}
