//! Error types for the `delve-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`]; random draws
//! return the narrower [`RandomError`], which converts into it.

use delve_types::{Coord, ThingId, ThingSignature};

/// Errors raised by a [`Randomness`](crate::random::Randomness) source.
#[derive(Debug, thiserror::Error)]
pub enum RandomError {
    /// A draw was requested from an empty range.
    #[error("random draw with empty range (tag {tag})")]
    EmptyRange {
        /// The tag of the offending draw.
        tag: String,
    },

    /// A range or collection is too large to draw from.
    #[error("random draw over too large a range (tag {tag})")]
    RangeTooLarge {
        /// The tag of the offending draw.
        tag: String,
        /// The failed conversion.
        #[source]
        source: std::num::TryFromIntError,
    },

    /// The replay script could not supply the draw. The message is already
    /// located (`path:line:col: error: ...`).
    #[error("{message}")]
    Script {
        /// The located diagnostic.
        message: String,
    },
}

/// Errors that can occur during world-state operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A thing id is not in the arena.
    #[error("thing not found: {0}")]
    ThingNotFound(ThingId),

    /// A thing was expected to be an individual.
    #[error("thing is not an individual: {0}")]
    NotAnIndividual(ThingId),

    /// A thing was expected to be an item.
    #[error("thing is not an item: {0}")]
    NotAnItem(ThingId),

    /// An item was requested with a signature that names an individual.
    #[error("not an item signature: {} {}", .0.thing_type(), .0.kind_name())]
    NotAnItemSignature(ThingSignature),

    /// A thing with this id already exists. Ids are never reused.
    #[error("duplicate thing id: {0}")]
    DuplicateThing(ThingId),

    /// Placing the thing in the container would make a container cycle.
    #[error("placing {thing} inside {container} would create a container cycle")]
    ContainerCycle {
        /// The thing being placed.
        thing: ThingId,
        /// The would-be container.
        container: ThingId,
    },

    /// A coordinate lies outside the map.
    #[error("coordinate out of bounds: ({}, {})", .0.x, .0.y)]
    OutOfBounds(Coord),

    /// No open, unoccupied tile could be found.
    #[error("no free spawn location after {attempts} attempts")]
    NoSpawnLocation {
        /// How many candidates were tried.
        attempts: u32,
    },

    /// Level generation kept producing levels that were too cramped.
    #[error("level generation failed after {attempts} attempts")]
    MapGenerationFailed {
        /// How many levels were generated and rejected.
        attempts: u32,
    },

    /// A random draw failed.
    #[error("random draw failed: {source}")]
    Random {
        /// The underlying draw error.
        #[from]
        source: RandomError,
    },

    /// The clock failed to advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: crate::clock::ClockError,
    },
}
