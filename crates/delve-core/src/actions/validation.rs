//! Action validation pipeline.
//!
//! The pipeline runs these stages in order:
//! 1. Actor -- is the actor a living individual (and the player, for cheats
//!    and stairs)?
//! 2. Syntax -- is the direction one of the eight unit vectors?
//! 3. Items -- is the named item where the action needs it, and of the
//!    right type?
//! 4. Location -- is the actor standing where the action needs it?
//! 5. Abilities -- does the species have the ability, and is it ready?
//! 6. Cheat arguments -- do cheat targets make sense?
//!
//! Each stage returns `Ok(())` on success or a [`Rejection`] on failure. A
//! rejection is an ordinary outcome: the scheduler treats it as indecision.
//! Walking into a wall is *not* rejected; it becomes a bump.

use delve_types::{Action, Coord, DecisionMakerType, ThingId, ThingSignature, ThingType, TileType};
use delve_world::{FINAL_DUNGEON_LEVEL, Location, Thing, World};

/// Why an action was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The actor is missing, dead, or not an individual.
    #[error("the actor cannot act")]
    ActorDead,
    /// The direction is not a unit vector.
    #[error("not a direction")]
    BadDirection,
    /// The item is not in the actor's inventory.
    #[error("item not carried")]
    ItemNotCarried,
    /// The item cannot be used this way.
    #[error("wrong type of item")]
    WrongItemType,
    /// The item is not on the floor under the actor.
    #[error("item not underfoot")]
    NotUnderfoot,
    /// Going down needs stairs underfoot.
    #[error("not standing on stairs")]
    NotOnStairs,
    /// Cheats and stairs are reserved for the player.
    #[error("only the player may do that")]
    NotThePlayer,
    /// There is nothing below the final level.
    #[error("already on the final level")]
    FinalLevel,
    /// The species has no such ability.
    #[error("ability not available")]
    MissingAbility,
    /// The ability is still cooling down.
    #[error("ability still cooling down")]
    CoolingDown,
    /// A cheat named a coordinate off the map.
    #[error("coordinate out of bounds")]
    OutOfBounds,
    /// A cheat named a tile that cannot take an individual.
    #[error("tile is occupied")]
    Occupied,
    /// A wish named an individual.
    #[error("not an item")]
    NotAnItemSignature,
    /// A cheat target is not a living individual.
    #[error("not an individual")]
    NotAnIndividual,
}

/// Validate an action through the full pipeline.
///
/// Returns `Ok(())` if the action passes all checks, or a [`Rejection`]
/// describing why it was rejected.
pub fn validate_action(world: &World, actor: ThingId, action: &Action) -> Result<(), Rejection> {
    let thing = validate_actor(world, actor, action)?;
    validate_syntax(action)?;
    validate_items(world, thing, action)?;
    validate_location(world, thing, action)?;
    validate_ability(thing, action)?;
    validate_cheat(world, action)
}

fn validate_actor<'w>(
    world: &'w World,
    actor: ThingId,
    action: &Action,
) -> Result<&'w Thing, Rejection> {
    let thing = world
        .get(actor)
        .filter(|t| t.is_alive_individual())
        .ok_or(Rejection::ActorDead)?;
    let players_only = action.is_cheat() || matches!(action, Action::GoDown);
    if players_only
        && thing.life().map(|life| life.decision_maker) != Some(DecisionMakerType::Player)
    {
        return Err(Rejection::NotThePlayer);
    }
    Ok(thing)
}

const fn validate_syntax(action: &Action) -> Result<(), Rejection> {
    match action.direction() {
        Some(direction) if !direction.is_unit_direction() => Err(Rejection::BadDirection),
        _ => Ok(()),
    }
}

fn validate_items(world: &World, actor: &Thing, action: &Action) -> Result<(), Rejection> {
    let required = match action {
        Action::Zap { .. } => Some(ThingType::Wand),
        Action::ReadBook { .. } => Some(ThingType::Book),
        Action::Quaff(_) => Some(ThingType::Potion),
        Action::Throw { .. } | Action::Drop(_) => None,
        _ => return Ok(()),
    };
    let Some(item) = action.item() else {
        return Ok(());
    };
    let item = world.get(item).filter(|t| t.still_exists);
    let carried = item.is_some_and(|t| t.location.container() == Some(actor.id));
    if !carried {
        return Err(Rejection::ItemNotCarried);
    }
    match (required, item) {
        (Some(kind), Some(item)) if item.thing_type() != kind => Err(Rejection::WrongItemType),
        _ => Ok(()),
    }
}

fn validate_location(world: &World, actor: &Thing, action: &Action) -> Result<(), Rejection> {
    let here = actor.location.coord();
    match action {
        Action::PickUp(item) => {
            let underfoot = world.get(*item).is_some_and(|t| {
                t.still_exists
                    && matches!(t.location, Location::Floor { coord, .. } if Some(coord) == here)
            });
            if underfoot {
                Ok(())
            } else {
                Err(Rejection::NotUnderfoot)
            }
        }
        Action::GoDown => {
            if world.dungeon_level() >= FINAL_DUNGEON_LEVEL {
                return Err(Rejection::FinalLevel);
            }
            let on_stairs =
                here.is_some_and(|c| world.tile(c).tile_type == TileType::StairsDown);
            if on_stairs {
                Ok(())
            } else {
                Err(Rejection::NotOnStairs)
            }
        }
        Action::CheatGoDown if world.dungeon_level() >= FINAL_DUNGEON_LEVEL => {
            Err(Rejection::FinalLevel)
        }
        _ => Ok(()),
    }
}

fn validate_ability(actor: &Thing, action: &Action) -> Result<(), Rejection> {
    let Action::Ability { ability, .. } = action else {
        return Ok(());
    };
    let has_it = actor
        .physical_species_data()
        .is_some_and(|row| row.has_ability(*ability));
    if !has_it {
        return Err(Rejection::MissingAbility);
    }
    if actor.life().is_some_and(|life| life.is_cooling_down(*ability)) {
        return Err(Rejection::CoolingDown);
    }
    Ok(())
}

fn validate_cheat(world: &World, action: &Action) -> Result<(), Rejection> {
    match action {
        Action::CheatKill(target) => {
            if world.get(*target).is_some_and(Thing::is_alive_individual) {
                Ok(())
            } else {
                Err(Rejection::NotAnIndividual)
            }
        }
        Action::CheatGenerateMonster { location, .. } => validate_free_tile(world, *location),
        Action::CheatWish(ThingSignature::Individual(_)) => Err(Rejection::NotAnItemSignature),
        _ => Ok(()),
    }
}

fn validate_free_tile(world: &World, location: Coord) -> Result<(), Rejection> {
    if !location.is_in_bounds() {
        return Err(Rejection::OutOfBounds);
    }
    if !world.tile(location).is_open_space() || world.individual_at(location).is_some() {
        return Err(Rejection::Occupied);
    }
    Ok(())
}
