//! Shared type definitions for the Delve dungeon simulation.
//!
//! This crate is the single source of truth for the vocabulary used across
//! the Delve workspace: identifiers, map geometry, the closed sets of
//! species and item kinds, status effects, actions, and authoritative
//! events.
//!
//! # Modules
//!
//! - [`ids`] -- 256-bit identifiers for things and turn-order initiative
//! - [`geometry`] -- Map coordinates, directions, and the fixed-size tile matrix
//! - [`enums`] -- Enumeration types (species, item kinds and descriptions, tiles)
//! - [`vision`] -- The per-tile vision modality bitmask
//! - [`status`] -- Status effects with their expiration and payload
//! - [`actions`] -- Actions an individual can take, and thing signatures
//! - [`events`] -- Authoritative state-change events

pub mod actions;
pub mod enums;
pub mod events;
pub mod geometry;
pub mod ids;
pub mod status;
pub mod vision;

// Re-export all public types at crate root for convenience.
pub use actions::{Action, ThingSignature};
pub use enums::{
    AbilityId, BookDescription, BookKind, DecisionMakerType, Mind, PotionDescription, PotionKind,
    SpeciesId, StatusEffectId, Team, ThingType, TileType, WandDescription, WandKind, WeaponKind,
};
pub use events::Event;
pub use geometry::{Coord, DIRECTIONS, MAP_HEIGHT, MAP_WIDTH, MapMatrix};
pub use ids::{Initiative, ParseUint256Error, ThingId, Uint256};
pub use status::{StatusEffect, StatusKind};
pub use vision::VisionTypes;
