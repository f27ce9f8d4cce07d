use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ArgMatches;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use alive_core::config::AliveConfig;
use alive_core::{BoardEngine, BoxPayload, JsonLinesView, TokioClock, ViewScope, run_stream};

use super::helpers::{build_runtime, load_config_with_warning, open_input};

pub(crate) fn handle_watch_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = matches.get_one::<PathBuf>("input");

    let mut config = load_config_with_warning();
    apply_overrides(&mut config, matches);
    if let Err(e) = config.validate() {
        error!(event = "cli.watch_failed", error = %e);
        return Err(e.into());
    }

    let scope = match matches.get_one::<String>("box") {
        Some(id) => ViewScope::Detail(id.clone()),
        None => ViewScope::Board,
    };
    let snapshot = match matches.get_one::<PathBuf>("snapshot") {
        Some(path) => load_snapshot(path)?,
        None => Vec::new(),
    };

    info!(
        event = "cli.watch_started",
        input = ?input,
        scope = ?scope,
        snapshot_boxes = snapshot.len(),
    );

    let runtime = build_runtime()?;
    let result = runtime.block_on(async {
        let reader = open_input(input).await?;

        let mut engine = BoardEngine::new(TokioClock::new(), &config, scope);
        engine.seed(snapshot);
        let mut view = JsonLinesView::new(std::io::stdout());

        let shutdown = CancellationToken::new();
        let on_signal = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });

        let summary = run_stream(reader, &mut engine, &mut view, shutdown).await?;
        Ok::<_, Box<dyn std::error::Error>>(summary)
    });
    // A pending stdin read holds a blocking thread that never returns
    runtime.shutdown_timeout(Duration::from_millis(100));

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!(event = "cli.watch_failed", error = %e);
            return Err(e);
        }
    };

    info!(
        event = "cli.watch_completed",
        frames = summary.frames,
        end = ?summary.end,
        received = summary.stats.received,
        applied = summary.stats.applied,
        ignored = summary.stats.ignored,
        malformed = summary.stats.malformed,
        dropped = summary.stats.dropped,
        resyncs = summary.stats.resyncs,
    );
    Ok(())
}

/// Apply CLI overrides only if provided
fn apply_overrides(config: &mut AliveConfig, matches: &ArgMatches) {
    if let Some(window) = matches.get_one::<u64>("window") {
        config.liveness.window_secs = Some(*window);
    }
    if let Some(max_missed) = matches.get_one::<u32>("max-missed") {
        config.liveness.max_missed = Some(*max_missed);
    }
    if let Some(hard_ceiling) = matches.get_one::<u64>("hard-ceiling") {
        config.liveness.hard_ceiling_secs = Some(*hard_ceiling);
    }
}

/// Read the boxes already on the board from a JSON array.
fn load_snapshot(path: &Path) -> Result<Vec<BoxPayload>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read snapshot '{}': {}", path.display(), e))?;
    let boxes: Vec<BoxPayload> = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid snapshot '{}': {}", path.display(), e))?;
    Ok(boxes)
}
