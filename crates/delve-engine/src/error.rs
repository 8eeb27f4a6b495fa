//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the play loop,
//! giving `main` a single error type to propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: delve_core::config::ConfigError,
    },

    /// The save file could not be opened, parsed, or written.
    #[error("{source}")]
    Replay {
        /// The underlying replay error.
        #[from]
        source: delve_events::ReplayError,
    },

    /// The simulation stopped.
    #[error("{source}")]
    Core {
        /// The underlying simulation error.
        #[from]
        source: delve_core::CoreError,
    },

    /// Replaying needs a save file to replay.
    #[error("{}: no such save file", path.display())]
    MissingSave {
        /// The path that was asked for.
        path: PathBuf,
    },

    /// Reading player input failed.
    #[error("input error: {source}")]
    Input {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
