//! Replay and determinism log for the Delve simulation.
//!
//! A save file is the game's header plus every action the player's
//! individual took. Replaying it reproduces the game exactly, which makes the
//! same file format serve three purposes: saving and resuming, detecting
//! nondeterminism through embedded snapshots, and scripted tests through
//! expectation directives.
//!
//! # Modules
//!
//! - [`codec`] -- Token-level encoding of scalars, ids, signatures, and actions.
//! - [`directives`] -- Test-script expectations checked against the player's knowledge.
//! - [`error`] -- [`ReplayError`] and located [`Diagnostic`]s.
//! - [`log`] -- The [`ReplayLog`] state machine and its [`Randomness`] impl.
//! - [`snapshot`] -- Canonical full-state snapshots.
//! - [`token`] -- Line tokenizer and script cursor.
//!
//! [`Randomness`]: delve_world::Randomness

pub mod codec;
pub mod directives;
pub mod error;
pub mod log;
pub mod snapshot;
pub mod token;

pub use codec::{format_action, parse_action};
pub use directives::{Expectations, TEST_DIRECTIVES};
pub use error::{Diagnostic, ReplayError};
pub use log::{Header, ReplayLog, SaveMode};
pub use snapshot::{SNAPSHOT_DIRECTIVES, Snapshot};
pub use token::{Line, Script, Token, tokenize};
