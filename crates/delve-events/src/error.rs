//! Error types for the `delve-events` crate.
//!
//! Every problem with a save file or test script is a [`ReplayError`]. Parse
//! and expectation failures carry the file, line, and column they were found
//! at and print in the familiar `path:line:col: error: message` form.

use std::path::PathBuf;

use delve_world::RandomError;

/// A problem found at one column of a line, before the file is known.
///
/// The codec and directive helpers produce these; the script that owns the
/// line turns them into a located [`ReplayError::Parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// One-based column of the offending token.
    pub column: usize,
    /// What went wrong.
    pub message: String,
}

impl Diagnostic {
    /// A diagnostic at a column.
    pub fn new(column: usize, message: impl Into<String>) -> Self {
        Self {
            column,
            message: message.into(),
        }
    }

    /// A diagnostic about the line as a whole.
    pub fn line(message: impl Into<String>) -> Self {
        Self::new(1, message)
    }
}

/// Errors raised while reading, writing, or checking a replay log.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The log is malformed, a random draw's tag did not match, a replayed
    /// action was rejected, or a test expectation failed.
    #[error("{path}:{line}:{column}: error: {message}")]
    Parse {
        /// The log file (or script name).
        path: String,
        /// One-based line number.
        line: usize,
        /// One-based column number.
        column: usize,
        /// What went wrong.
        message: String,
    },

    /// A replayed snapshot disagreed with the live world.
    #[error("{path}:{line}:1: error: corrupt save file")]
    CorruptSave {
        /// The log file.
        path: String,
        /// Line of the `@snapshot` directive.
        line: usize,
        /// Where the expected serialization was dumped.
        expected: Option<PathBuf>,
        /// Where the actual serialization was dumped.
        actual: Option<PathBuf>,
    },

    /// Reading or writing the save file failed.
    #[error("{path}: {source}")]
    Io {
        /// The file involved.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl ReplayError {
    /// Build an I/O error for a file.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ReplayError> for RandomError {
    fn from(error: ReplayError) -> Self {
        Self::Script {
            message: error.to_string(),
        }
    }
}
