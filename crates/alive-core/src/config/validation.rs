use crate::clock::MAX_TIMER_DELAY;
use crate::config::types::AliveConfig;
use crate::errors::ConfigError;

/// Validate the merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidConfiguration`] describing the first invalid
/// value found.
pub fn validate_config(config: &AliveConfig) -> Result<(), ConfigError> {
    let window = config.liveness.window();
    if window.is_zero() {
        return Err(ConfigError::InvalidConfiguration {
            message: "liveness.window_secs must be greater than 0".to_string(),
        });
    }

    if config.liveness.hard_ceiling() < window {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "liveness.hard_ceiling_secs ({}) must not be shorter than liveness.window_secs ({})",
                config.liveness.hard_ceiling().as_secs(),
                window.as_secs()
            ),
        });
    }

    if config.liveness.hard_ceiling() > MAX_TIMER_DELAY {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "liveness.hard_ceiling_secs ({}) must not exceed {}",
                config.liveness.hard_ceiling().as_secs(),
                MAX_TIMER_DELAY.as_secs()
            ),
        });
    }

    if config.board.history_limit() == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "board.history_limit must be greater than 0".to_string(),
        });
    }

    let anchors = config.board.anchors();
    if anchors.is_empty() || anchors.iter().any(|a| a.trim().is_empty()) {
        return Err(ConfigError::InvalidConfiguration {
            message: "board.anchors must contain at least one non-empty id".to_string(),
        });
    }

    Ok(())
}
