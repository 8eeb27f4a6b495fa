//! Creating individuals and items.
//!
//! Spawning only touches the [`World`]; announcing the newcomer (the
//! `Appear` event) is left to the caller, which owns perception.

use delve_types::{
    BookKind, Coord, DecisionMakerType, PotionKind, SpeciesId, ThingId, ThingSignature,
    WandKind, WeaponKind,
};
use tracing::debug;

use crate::error::WorldError;
use crate::random::{Randomness, choose};
use crate::species::{ACTION_COST, species};
use crate::thing::{Life, Location, Thing, ThingKind, WandInfo};
use crate::world::World;

/// Attempts at finding a random free tile.
const SPAWN_ATTEMPTS: u32 = 1000;

/// Spawned monsters keep at least this squared distance from the player.
const SPAWN_DISTANCE_SQUARED: i32 = 64;

/// Create an individual standing at `location`.
///
/// # Errors
///
/// Propagates draw and placement failures.
pub fn spawn_individual<R: Randomness + ?Sized>(
    world: &mut World,
    rng: &mut R,
    species_id: SpeciesId,
    decision_maker: DecisionMakerType,
    location: Coord,
) -> Result<ThingId, WorldError> {
    let id = rng.random_id()?;
    let initiative = rng.random_initiative()?;
    let mut life = Life::new(species_id, decision_maker, initiative);
    // Newcomers are poised right away.
    let now = world.time();
    life.last_movement_time = now.saturating_sub(species(species_id).movement_cost);
    life.last_action_time = now.saturating_sub(ACTION_COST);
    let mut thing = Thing::new(id, ThingKind::Individual(Box::new(life)));
    thing.location = Location::Standing(location);
    world.insert(thing)?;
    debug!(thing_id = %id, species = %species_id, x = location.x, y = location.y, "Spawned individual");
    Ok(id)
}

/// Whether a tile can take a new individual.
fn can_spawn_at(world: &World, location: Coord, away_from: Option<Coord>) -> bool {
    world.tile(location).tile_type.is_open_space()
        && world.individual_at(location).is_none()
        && away_from.is_none_or(|avoid| avoid.distance_squared(location) >= SPAWN_DISTANCE_SQUARED)
}

/// A random free open tile, optionally far from a point.
///
/// In test mode this is the first free open tile in row-major order and no
/// numbers are drawn.
///
/// # Errors
///
/// Returns [`WorldError::NoSpawnLocation`] when nothing fits.
pub fn random_spawn_location<R: Randomness + ?Sized>(
    world: &World,
    rng: &mut R,
    away_from: Option<Coord>,
) -> Result<Coord, WorldError> {
    if rng.is_test_mode() {
        return delve_types::geometry::all_coords()
            .find(|c| can_spawn_at(world, *c, away_from))
            .ok_or(WorldError::NoSpawnLocation { attempts: 0 });
    }
    for _ in 0..SPAWN_ATTEMPTS {
        let location = Coord::new(
            rng.random_range(0, delve_types::MAP_WIDTH, "spawn_x")?,
            rng.random_range(0, delve_types::MAP_HEIGHT, "spawn_y")?,
        );
        if can_spawn_at(world, location, away_from) {
            return Ok(location);
        }
    }
    Err(WorldError::NoSpawnLocation {
        attempts: SPAWN_ATTEMPTS,
    })
}

/// A random non-human species that lives on this dungeon level.
///
/// # Errors
///
/// Propagates draw failures.
pub fn random_monster_species<R: Randomness + ?Sized>(
    rng: &mut R,
    dungeon_level: i32,
) -> Result<SpeciesId, WorldError> {
    let candidates: Vec<SpeciesId> = SpeciesId::ALL
        .iter()
        .copied()
        .filter(|id| *id != SpeciesId::Human && species(*id).spawns_on(dungeon_level))
        .collect();
    Ok(choose(rng, &candidates, "monster_species")?.unwrap_or(SpeciesId::Ant))
}

/// Spawn a random monster somewhere away from the player.
///
/// # Errors
///
/// Propagates draw and placement failures.
pub fn spawn_random_monster<R: Randomness + ?Sized>(
    world: &mut World,
    rng: &mut R,
) -> Result<ThingId, WorldError> {
    let species_id = random_monster_species(rng, world.dungeon_level())?;
    let away_from = world.you().and_then(|you| world.coord_of(you));
    let location = random_spawn_location(world, rng, away_from)?;
    spawn_individual(world, rng, species_id, DecisionMakerType::Ai, location)
}

/// The variant data for a fresh item of a signature.
///
/// Unspecified kinds are drawn at random; wands get 3-7 charges.
///
/// # Errors
///
/// Returns [`WorldError::NotAnItemSignature`] for an individual signature, or a draw
/// failure.
pub fn item_kind<R: Randomness + ?Sized>(
    rng: &mut R,
    signature: ThingSignature,
) -> Result<ThingKind, WorldError> {
    Ok(match signature {
        ThingSignature::Individual(_) => return Err(WorldError::NotAnItemSignature(signature)),
        ThingSignature::Wand(kind) => {
            let kind = match kind {
                Some(kind) => kind,
                None => choose(rng, WandKind::ALL, "wand_kind")?.unwrap_or(WandKind::Striking),
            };
            let charges = rng.random_range(3, 8, "wand_charges")?;
            ThingKind::Wand(WandInfo { kind, charges })
        }
        ThingSignature::Potion(kind) => ThingKind::Potion(match kind {
            Some(kind) => kind,
            None => choose(rng, PotionKind::ALL, "potion_kind")?.unwrap_or(PotionKind::Healing),
        }),
        ThingSignature::Book(kind) => ThingKind::Book(match kind {
            Some(kind) => kind,
            None => choose(rng, BookKind::ALL, "book_kind")?.unwrap_or(BookKind::Speed),
        }),
        ThingSignature::Weapon(kind) => ThingKind::Weapon(kind),
    })
}

/// A random item signature: wands and potions are most common.
///
/// # Errors
///
/// Propagates draw failures.
pub fn random_item_signature<R: Randomness + ?Sized>(
    rng: &mut R,
) -> Result<ThingSignature, WorldError> {
    Ok(match rng.random_int(10, "item_type")? {
        0..=3 => ThingSignature::Wand(None),
        4..=7 => ThingSignature::Potion(None),
        8 => ThingSignature::Book(None),
        _ => ThingSignature::Weapon(
            choose(rng, WeaponKind::ALL, "weapon_kind")?.unwrap_or(WeaponKind::Dagger),
        ),
    })
}

/// Create an item at a location.
///
/// # Errors
///
/// Propagates draw and placement failures.
pub fn create_item<R: Randomness + ?Sized>(
    world: &mut World,
    rng: &mut R,
    signature: ThingSignature,
    location: Location,
) -> Result<ThingId, WorldError> {
    let kind = item_kind(rng, signature)?;
    let id = rng.random_id()?;
    let mut thing = Thing::new(id, kind);
    thing.location = location;
    world.insert(thing)?;
    debug!(thing_id = %id, item = %signature.kind_name(), "Created item");
    Ok(id)
}

/// Scatter random items and warm-up monsters over the current level.
///
/// Does nothing in test mode. Returns the spawned individuals so the caller
/// can announce them.
///
/// # Errors
///
/// Propagates draw and placement failures.
pub fn populate_level<R: Randomness + ?Sized>(
    world: &mut World,
    rng: &mut R,
    items: u32,
    monsters: u32,
) -> Result<Vec<ThingId>, WorldError> {
    if rng.is_test_mode() {
        return Ok(Vec::new());
    }
    for _ in 0..items {
        let signature = random_item_signature(rng)?;
        let coord = random_spawn_location(world, rng, None)?;
        create_item(world, rng, signature, Location::Floor { coord, z_order: 0 })?;
    }
    let mut spawned = Vec::new();
    for _ in 0..monsters {
        spawned.push(spawn_random_monster(world, rng)?);
    }
    Ok(spawned)
}
