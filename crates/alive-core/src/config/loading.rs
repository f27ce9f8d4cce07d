//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.alive/config.toml` (global user preferences)
//! 3. **Project config** - `./.alive/config.toml` (directory-specific overrides)
//! 4. **CLI arguments** - Command-line flags (highest priority)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::types::{AliveConfig, BoardConfig, LivenessConfig};
use crate::config::validation::validate_config;
use crate::errors::ConfigError;

const CONFIG_DIR: &str = ".alive";
const CONFIG_FILE: &str = "config.toml";

/// Load configuration from the hierarchy of config files.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be read or parsed, or
/// if the merged configuration fails validation. Missing files are not errors.
pub fn load_hierarchy() -> Result<AliveConfig, ConfigError> {
    let user_path = dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE));
    let project_path = std::env::current_dir()?.join(CONFIG_DIR).join(CONFIG_FILE);
    load_hierarchy_from(user_path.as_deref(), Some(&project_path))
}

/// Load and merge the given config files (either may be absent).
pub fn load_hierarchy_from(
    user_path: Option<&Path>,
    project_path: Option<&Path>,
) -> Result<AliveConfig, ConfigError> {
    let mut config = AliveConfig::default();

    for path in [user_path, project_path].into_iter().flatten() {
        match load_config_file(path) {
            Ok(layer) => config = merge_configs(config, layer),
            Err(ConfigError::ConfigNotFound { path }) => {
                debug!(event = "core.config.file_not_found", path = path);
            }
            Err(e) => return Err(e),
        }
    }

    validate_config(&config)?;

    Ok(config)
}

/// Load a configuration file from the given path.
pub fn load_config_file(path: &Path) -> Result<AliveConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Path of the project-level config file for a directory.
pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Merge two configurations, with override_config taking precedence.
///
/// Override values replace base values only if present.
pub fn merge_configs(base: AliveConfig, override_config: AliveConfig) -> AliveConfig {
    AliveConfig {
        liveness: LivenessConfig {
            window_secs: override_config
                .liveness
                .window_secs
                .or(base.liveness.window_secs),
            max_missed: override_config
                .liveness
                .max_missed
                .or(base.liveness.max_missed),
            hard_ceiling_secs: override_config
                .liveness
                .hard_ceiling_secs
                .or(base.liveness.hard_ceiling_secs),
        },
        board: BoardConfig {
            anchors: override_config.board.anchors.or(base.board.anchors),
            history_limit: override_config
                .board
                .history_limit
                .or(base.board.history_limit),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AliveError;
    use std::time::Duration;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = project_config_path(dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        let config = load_hierarchy_from(Some(&missing), Some(&missing)).unwrap();
        assert_eq!(config, AliveConfig::default());
    }

    #[test]
    fn test_project_overrides_user() {
        let user_dir = tempfile::tempdir().unwrap();
        let project_dir = tempfile::tempdir().unwrap();
        let user = write_config(
            user_dir.path(),
            "[liveness]\nwindow_secs = 10\nmax_missed = 3\n",
        );
        let project = write_config(project_dir.path(), "[liveness]\nwindow_secs = 7\n");

        let config = load_hierarchy_from(Some(&user), Some(&project)).unwrap();
        assert_eq!(config.liveness.window(), Duration::from_secs(7));
        assert_eq!(config.liveness.max_missed(), 3);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_config(temp_dir.path(), "invalid toml [[[");

        let err = load_hierarchy_from(None, Some(&path)).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_PARSE_ERROR");
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_config(temp_dir.path(), "[board]\nhistory_limit = 0\n");

        let err = load_hierarchy_from(None, Some(&path)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_merge_keeps_base_when_override_unset() {
        let mut base = AliveConfig::default();
        base.board.anchors = Some(vec!["header".to_string()]);
        base.board.history_limit = Some(5);

        let mut over = AliveConfig::default();
        over.board.history_limit = Some(50);

        let merged = merge_configs(base, over);
        assert_eq!(merged.board.anchors(), vec!["header"]);
        assert_eq!(merged.board.history_limit(), 50);
    }
}
