//! Error types for the scenario runner binary.
//!
//! [`EngineError`] wraps every failure the runner can hit between reading
//! the configuration and writing the final snapshot.

use clocktower_core::{ConfigError, GameError};

/// Top-level error for the scenario runner.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The scenario file could not be parsed or set up.
    #[error("scenario error: {message}")]
    Scenario {
        /// What was wrong with it.
        message: String,
    },

    /// A command was rejected by the game.
    #[error("command {index} ({command}) failed: {source}")]
    Command {
        /// Zero-based position in the command list.
        index: usize,
        /// The command's name.
        command: &'static str,
        /// The game's error.
        source: GameError,
    },

    /// Game setup or snapshotting failed.
    #[error("game error: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: GameError,
    },

    /// Reading or writing a file failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
