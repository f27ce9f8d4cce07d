//! # Configuration System
//!
//! Hierarchical TOML configuration for the alive board client.
//!
//! ## Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.alive/config.toml`
//! 3. **Project config** - `./.alive/config.toml`
//! 4. **CLI arguments** - Command-line flags (highest priority)
//!
//! ## Loading Configuration
//!
//! ```rust,no_run
//! use alive_core::config::AliveConfig;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AliveConfig::load_hierarchy()?;
//!     let window = config.liveness.window();
//!     Ok(())
//! }
//! ```

pub mod defaults;
pub mod loading;
pub mod types;
pub mod validation;

pub use types::{AliveConfig, BoardConfig, LivenessConfig};
pub use validation::validate_config;

impl AliveConfig {
    /// Load configuration from the hierarchy of config files.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, crate::errors::ConfigError> {
        loading::load_hierarchy()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), crate::errors::ConfigError> {
        validation::validate_config(self)
    }
}
