use std::path::PathBuf;

use tokio::io::{AsyncBufRead, BufReader};
use tracing::warn;

use alive_core::config::AliveConfig;

/// Boxed transport reader, either a file or stdin.
pub type InputStream = Box<dyn AsyncBufRead + Send + Unpin>;

/// Load configuration with warning on errors.
///
/// Falls back to defaults if config loading fails, but notifies the user via:
/// - stderr message for immediate visibility
/// - structured log event `cli.config.load_failed` for debugging
pub fn load_config_with_warning() -> AliveConfig {
    match AliveConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config: {}. Using defaults.\n\
                 Tip: Check ~/.alive/config.toml and ./.alive/config.toml for errors.",
                e
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            AliveConfig::default()
        }
    }
}

/// Open the stream source: the given file, or stdin.
pub async fn open_input(path: Option<&PathBuf>) -> std::io::Result<InputStream> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// Single-threaded runtime for the stream runner.
pub fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}
