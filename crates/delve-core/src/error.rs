//! Error types for the simulation core.
//!
//! Ordinary gameplay outcomes (death, empty wands, rejected actions) are
//! never errors. A [`CoreError`] means the simulation cannot continue: the
//! world arena is inconsistent, the replay log is malformed or diverged, or
//! a decision maker failed outright.

use delve_events::ReplayError;
use delve_world::{RandomError, WorldError};

use crate::config::ConfigError;
use crate::decision::DecisionError;

/// Errors that stop the simulation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The world arena rejected an operation.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A random draw failed.
    #[error("random draw failed: {source}")]
    Random {
        /// The underlying draw error.
        #[from]
        source: RandomError,
    },

    /// The replay log failed to parse, diverged, or could not be written.
    #[error("{source}")]
    Replay {
        /// The underlying replay error.
        #[from]
        source: ReplayError,
    },

    /// The configuration could not be loaded.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// A decision maker failed.
    #[error("decision error: {source}")]
    Decision {
        /// The underlying decision error.
        #[from]
        source: DecisionError,
    },
}
