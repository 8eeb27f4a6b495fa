//! Authoritative world state for the Delve simulation.
//!
//! This crate owns every [`Thing`] through an id-keyed arena, the map of the
//! current dungeon level, the global clock, and the per-individual
//! [`Knowledge`] store. It also defines the [`Randomness`] seam through
//! which every random draw in the simulation is funneled.
//!
//! # Modules
//!
//! - [`clock`] -- Global tick counter with overflow checking.
//! - [`error`] -- [`WorldError`] and [`RandomError`].
//! - [`knowledge`] -- Per-individual partial copy of the world and narration log.
//! - [`map`] -- Tiles and level generation.
//! - [`random`] -- The [`Randomness`] trait and the seeded generator.
//! - [`spawn`] -- Creating individuals and items.
//! - [`species`] -- The static species table.
//! - [`thing`] -- Things, locations, and individual life data.
//! - [`world`] -- The [`World`] arena itself.
//!
//! [`Thing`]: thing::Thing
//! [`Knowledge`]: knowledge::Knowledge
//! [`Randomness`]: random::Randomness
//! [`World`]: world::World

pub mod clock;
pub mod error;
pub mod knowledge;
pub mod map;
pub mod random;
pub mod spawn;
pub mod species;
pub mod thing;
pub mod world;

pub use clock::{ClockError, WorldClock};
pub use error::{RandomError, WorldError};
pub use knowledge::{
    Knowledge, NARRATION_CAPACITY, Narration, NarrationLog, PLACEHOLDER_TIMEOUT, PerceivedKind,
    PerceivedThing,
};
pub use map::{FINAL_DUNGEON_LEVEL, Level, Tile};
pub use random::{RandomState, Randomness, SeededRandom};
pub use species::{ACTION_COST, SLOW_MOVEMENT_COST, SPEEDY_MOVEMENT_COST, Species, species};
pub use thing::{AbilityCooldown, Life, Location, Thing, ThingKind, WandInfo};
pub use world::{ItemIdentities, World};
