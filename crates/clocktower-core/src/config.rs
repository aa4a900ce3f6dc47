//! Configuration loading and typed config structures.
//!
//! The engine reads `clocktower-config.yaml`. Every field has a default, so
//! an empty file (or no file at all) yields a playable configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClocktowerConfig {
    /// Game rules carried into every [`Game`](crate::game::Game).
    #[serde(default)]
    pub rules: RulesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClocktowerConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Rules that shape a single game.
///
/// Stored inside the game so a restored snapshot keeps the rules it was
/// started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Dead vote tokens each player starts with.
    #[serde(default = "default_starting_dead_votes")]
    pub starting_dead_votes: u32,

    /// Nesting limit for status derivation and effect cascades. Past this
    /// depth a status query answers `true`.
    #[serde(default = "default_max_status_depth")]
    pub max_status_depth: u32,

    /// Seed for the dawn kill shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            starting_dead_votes: default_starting_dead_votes(),
            max_status_depth: default_max_status_depth(),
            seed: default_seed(),
        }
    }
}

/// Logging configuration for the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_starting_dead_votes() -> u32 {
    1
}

const fn default_max_status_depth() -> u32 {
    64
}

const fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_owned()
}
