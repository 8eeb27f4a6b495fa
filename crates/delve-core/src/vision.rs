//! The vision engine.
//!
//! [`compute_vision`] recomputes which tiles an individual senses and by
//! which modality, and writes the discovered terrain into its knowledge.
//! [`thing_vision`] then answers how (if at all) the individual senses a
//! particular thing, which is what the perception pipeline builds on.
//!
//! Modalities:
//!
//! - normal: line of sight through open space. Suppressed by blindness and
//!   superseded by the ethereal vision status. Does not see the invisible.
//! - ethereal: everything within [`ETHEREAL_RADIUS`], through walls.
//! - touch: the individual's own tile.
//! - cogniscopy: every tile, but only minds show up.

use delve_types::{
    Coord, MapMatrix, StatusEffectId, ThingId, VisionTypes,
    geometry::all_coords,
};
use delve_world::{Knowledge, Location, Thing, Tile, World, WorldError};

use crate::error::CoreError;

/// Ethereal sight reaches this far (Euclidean).
pub const ETHEREAL_RADIUS: i32 = 5;

/// Whether every tile strictly between `from` and `to` is open space.
///
/// The line steps one tile at a time along the dominant axis and rounds the
/// other coordinate toward the start with integer division.
pub fn is_open_line_of_sight(tiles: &MapMatrix<Tile>, from: Coord, to: Coord) -> bool {
    if from == to {
        return true;
    }
    let delta = to - from;
    let blocked = |coord: Coord| !tiles.get(coord).is_some_and(|tile| tile.is_open_space());
    if delta.y.saturating_abs() > delta.x.saturating_abs() {
        let step = delta.y.signum();
        let mut y = from.y.saturating_add(step);
        while y.saturating_mul(step) < to.y.saturating_mul(step) {
            let offset = y
                .saturating_sub(from.y)
                .saturating_mul(delta.x)
                .checked_div(delta.y)
                .unwrap_or(0);
            if blocked(Coord::new(from.x.saturating_add(offset), y)) {
                return false;
            }
            y = y.saturating_add(step);
        }
    } else {
        let step = delta.x.signum();
        let mut x = from.x.saturating_add(step);
        while x.saturating_mul(step) < to.x.saturating_mul(step) {
            let offset = x
                .saturating_sub(from.x)
                .saturating_mul(delta.y)
                .checked_div(delta.x)
                .unwrap_or(0);
            if blocked(Coord::new(x, from.y.saturating_add(offset))) {
                return false;
            }
            x = x.saturating_add(step);
        }
    }
    true
}

/// The modalities an individual has right now, before geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Senses {
    normal: bool,
    ethereal: bool,
    cogniscopy: bool,
}

fn senses(individual: &Thing) -> Senses {
    let innate = individual
        .physical_species_data()
        .map_or_else(VisionTypes::none, |row| row.vision);
    let ethereal_status = individual.has_status(StatusEffectId::EtherealVision);
    Senses {
        normal: innate.contains(VisionTypes::NORMAL)
            && !individual.has_status(StatusEffectId::Blindness)
            && !ethereal_status,
        ethereal: innate.contains(VisionTypes::ETHEREAL) || ethereal_status,
        cogniscopy: individual.has_status(StatusEffectId::Cogniscopy),
    }
}

/// Per-tile vision of an individual standing where it stands.
pub fn sensed_tiles(world: &World, individual: &Thing) -> MapMatrix<VisionTypes> {
    let mut vision = MapMatrix::filled(VisionTypes::none());
    let Some(here) = individual.location.coord() else {
        return vision;
    };
    let senses = senses(individual);
    let radius_squared = ETHEREAL_RADIUS.saturating_mul(ETHEREAL_RADIUS);
    for coord in all_coords() {
        let Some(cell) = vision.get_mut(coord) else {
            continue;
        };
        if senses.cogniscopy {
            cell.insert(VisionTypes::COGNISCOPY);
        }
        if senses.normal && is_open_line_of_sight(world.tiles(), here, coord) {
            cell.insert(VisionTypes::NORMAL);
        }
        if senses.ethereal && here.distance_squared(coord) <= radius_squared {
            cell.insert(VisionTypes::ETHEREAL);
        }
        if coord == here {
            cell.insert(VisionTypes::TOUCH);
        }
    }
    vision
}

/// Write what `vision` reveals about a tile into knowledge.
///
/// Color vision records the true tile. Shape alone records the degraded
/// open/solid form, unless the remembered tile is already truly known and
/// agrees on openness.
pub fn remember_tile(knowledge: &mut Knowledge, coord: Coord, actual: Tile, vision: VisionTypes) {
    let remembered = if vision.can_see_color() {
        actual
    } else if vision.can_see_shape() {
        let known = knowledge.tile(coord);
        if known.tile_type.is_truly_known() && known.is_open_space() == actual.is_open_space() {
            return;
        }
        Tile::new(actual.tile_type.degraded(), 0)
    } else {
        return;
    };
    if let Some(tile) = knowledge.tiles.get_mut(coord) {
        *tile = remembered;
    }
}

/// Recompute an individual's vision and refresh its terrain knowledge.
///
/// Mindless individuals do not remember terrain: their map is reset to
/// what they sense right now.
///
/// # Errors
///
/// Returns [`WorldError::ThingNotFound`] or [`WorldError::NotAnIndividual`].
pub fn compute_vision(world: &mut World, observer: ThingId) -> Result<(), CoreError> {
    let thing = world.thing(observer)?;
    if !thing.is_individual() {
        return Err(WorldError::NotAnIndividual(observer).into());
    }
    let vision = sensed_tiles(world, thing);
    let forgetful = !thing.has_mind();
    let actual = world.tiles().clone();
    let life = world
        .thing_mut(observer)?
        .life_mut()
        .ok_or(WorldError::NotAnIndividual(observer))?;
    let knowledge = &mut life.knowledge;
    if forgetful {
        knowledge.tiles.fill(&Tile::UNKNOWN);
    }
    for coord in all_coords() {
        let sensed = vision.get(coord).copied().unwrap_or_else(VisionTypes::none);
        if let Some(tile) = actual.get(coord) {
            remember_tile(knowledge, coord, *tile, sensed);
        }
    }
    knowledge.tile_is_visible = vision;
    Ok(())
}

/// How an individual standing on a tile sensed with `tile_vision` shows up.
pub fn individual_vision(tile_vision: VisionTypes, target: &Thing) -> VisionTypes {
    let mut seen = VisionTypes::none();
    if tile_vision.contains(VisionTypes::NORMAL) && !target.has_status(StatusEffectId::Invisibility)
    {
        seen.insert(VisionTypes::NORMAL);
    }
    if tile_vision.contains(VisionTypes::ETHEREAL) {
        seen.insert(VisionTypes::ETHEREAL);
    }
    if tile_vision.contains(VisionTypes::TOUCH) {
        seen.insert(VisionTypes::TOUCH);
    }
    if tile_vision.contains(VisionTypes::COGNISCOPY) && target.has_mind() {
        seen.insert(VisionTypes::COGNISCOPY);
    }
    seen
}

/// How `observer`, with `knowledge`, senses `target` right now.
///
/// An individual always senses itself. Dead things are never sensed.
/// Carried items are sensed when their carrier is, minus cogniscopy, which
/// never shows items.
pub fn thing_vision(
    world: &World,
    observer: ThingId,
    knowledge: &Knowledge,
    target: ThingId,
) -> VisionTypes {
    let Some(thing) = world.get(target) else {
        return VisionTypes::none();
    };
    if !thing.still_exists {
        return VisionTypes::none();
    }
    match thing.location {
        Location::Nowhere => VisionTypes::none(),
        Location::Standing(coord) => {
            let tile_vision = knowledge.vision_at(coord);
            if target == observer {
                tile_vision.union(VisionTypes::TOUCH)
            } else {
                individual_vision(tile_vision, thing)
            }
        }
        Location::Floor { coord, .. } => knowledge.vision_at(coord).without(VisionTypes::COGNISCOPY),
        Location::Inventory { container, .. } => {
            thing_vision(world, observer, knowledge, container).without(VisionTypes::COGNISCOPY)
        }
    }
}

/// Whether `observer` senses `target` at all.
pub fn can_see_thing(world: &World, observer: ThingId, knowledge: &Knowledge, target: ThingId) -> bool {
    thing_vision(world, observer, knowledge, target).any()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_types::{DecisionMakerType, SpeciesId, StatusEffect, StatusKind, TileType};
    use delve_world::map::test_level;
    use delve_world::spawn::spawn_individual;
    use delve_world::{ItemIdentities, SeededRandom};

    use super::*;

    fn room() -> (World, SeededRandom) {
        (
            World::new(test_level(0), ItemIdentities::identity(), 0),
            SeededRandom::test_mode(),
        )
    }

    fn spawn(world: &mut World, rng: &mut SeededRandom, species: SpeciesId, at: Coord) -> ThingId {
        spawn_individual(world, rng, species, DecisionMakerType::Ai, at).unwrap()
    }

    fn wall(world: &mut World, at: Coord) {
        world.set_tile_type(at, TileType::BrownBrickWall).unwrap();
    }

    fn knowledge(world: &World, id: ThingId) -> &Knowledge {
        &world.thing(id).unwrap().life().unwrap().knowledge
    }

    fn afflict(world: &mut World, id: ThingId, kind: StatusKind) {
        world.thing_mut(id).unwrap().put_status(StatusEffect {
            kind,
            expiration_time: 1000,
        });
    }

    #[test]
    fn an_open_room_is_fully_visible() {
        let (mut world, mut rng) = room();
        let human = spawn(&mut world, &mut rng, SpeciesId::Human, Coord::new(10, 10));
        compute_vision(&mut world, human).unwrap();
        let knowledge = knowledge(&world, human);
        assert!(knowledge.vision_at(Coord::new(48, 23)).contains(VisionTypes::NORMAL));
        assert!(knowledge.vision_at(Coord::new(10, 10)).contains(VisionTypes::TOUCH));
        assert!(!knowledge.vision_at(Coord::new(11, 10)).contains(VisionTypes::TOUCH));
        assert_eq!(knowledge.tile(Coord::new(48, 23)).tile_type, TileType::StairsDown);
    }

    #[test]
    fn walls_block_everything_behind_them() {
        let (mut world, mut rng) = room();
        wall(&mut world, Coord::new(10, 5));
        let human = spawn(&mut world, &mut rng, SpeciesId::Human, Coord::new(5, 5));
        compute_vision(&mut world, human).unwrap();
        let knowledge = knowledge(&world, human);
        assert!(knowledge.vision_at(Coord::new(10, 5)).contains(VisionTypes::NORMAL));
        for x in 11..20 {
            assert!(!knowledge.vision_at(Coord::new(x, 5)).any(), "x = {x}");
        }
        assert_eq!(knowledge.tile(Coord::new(15, 5)).tile_type, TileType::Unknown);
    }

    #[test]
    fn adding_walls_never_reveals_tiles() {
        let (open_world, _) = room();
        let (mut walled, _) = room();
        for coord in [Coord::new(20, 10), Coord::new(21, 12), Coord::new(18, 14)] {
            wall(&mut walled, coord);
        }
        let from = Coord::new(15, 12);
        for target in all_coords() {
            if is_open_line_of_sight(walled.tiles(), from, target) {
                assert!(is_open_line_of_sight(open_world.tiles(), from, target), "{target:?}");
            }
        }
        assert!(!is_open_line_of_sight(walled.tiles(), from, Coord::new(25, 12)));
        assert!(is_open_line_of_sight(walled.tiles(), from, Coord::new(21, 12)));
        assert!(is_open_line_of_sight(open_world.tiles(), from, Coord::new(25, 12)));
    }

    #[test]
    fn ethereal_vision_ignores_walls_within_its_radius() {
        let (mut world, mut rng) = room();
        wall(&mut world, Coord::new(11, 10));
        let blob = spawn(&mut world, &mut rng, SpeciesId::PinkBlob, Coord::new(10, 10));
        compute_vision(&mut world, blob).unwrap();
        let knowledge = knowledge(&world, blob);
        assert!(knowledge.vision_at(Coord::new(13, 10)).contains(VisionTypes::ETHEREAL));
        assert!(knowledge.vision_at(Coord::new(15, 10)).contains(VisionTypes::ETHEREAL));
        assert!(!knowledge.vision_at(Coord::new(16, 10)).any());
        assert!(!knowledge.vision_at(Coord::new(14, 14)).any());
        assert!(!knowledge.vision_at(Coord::new(12, 10)).contains(VisionTypes::NORMAL));
    }

    #[test]
    fn blindness_leaves_only_touch() {
        let (mut world, mut rng) = room();
        let human = spawn(&mut world, &mut rng, SpeciesId::Human, Coord::new(10, 10));
        afflict(&mut world, human, StatusKind::Blindness);
        compute_vision(&mut world, human).unwrap();
        let knowledge = knowledge(&world, human);
        assert_eq!(knowledge.vision_at(Coord::new(10, 10)), VisionTypes::TOUCH);
        assert!(!knowledge.vision_at(Coord::new(11, 10)).any());
        assert_eq!(knowledge.tile(Coord::new(10, 10)).tile_type, TileType::UnknownFloor);
    }

    #[test]
    fn invisibility_hides_from_normal_vision_only() {
        let (mut world, mut rng) = room();
        let human = spawn(&mut world, &mut rng, SpeciesId::Human, Coord::new(10, 10));
        let blob = spawn(&mut world, &mut rng, SpeciesId::PinkBlob, Coord::new(12, 10));
        let ghost = spawn(&mut world, &mut rng, SpeciesId::Human, Coord::new(13, 10));
        afflict(&mut world, ghost, StatusKind::Invisibility);
        compute_vision(&mut world, human).unwrap();
        compute_vision(&mut world, blob).unwrap();
        let seen_by_human = thing_vision(&world, human, knowledge(&world, human), ghost);
        assert!(!seen_by_human.any());
        let seen_by_blob = thing_vision(&world, blob, knowledge(&world, blob), ghost);
        assert_eq!(seen_by_blob, VisionTypes::ETHEREAL);
    }

    #[test]
    fn cogniscopy_senses_minds_but_not_items() {
        let (mut world, mut rng) = room();
        wall(&mut world, Coord::new(11, 10));
        let human = spawn(&mut world, &mut rng, SpeciesId::Human, Coord::new(10, 10));
        let ogre = spawn(&mut world, &mut rng, SpeciesId::Ogre, Coord::new(12, 10));
        let blob = spawn(&mut world, &mut rng, SpeciesId::PinkBlob, Coord::new(12, 11));
        afflict(&mut world, human, StatusKind::Cogniscopy);
        compute_vision(&mut world, human).unwrap();
        let knowledge = knowledge(&world, human);
        assert_eq!(thing_vision(&world, human, knowledge, ogre), VisionTypes::COGNISCOPY);
        assert!(!can_see_thing(&world, human, knowledge, blob));
    }

    #[test]
    fn individuals_always_sense_themselves() {
        let (mut world, mut rng) = room();
        let human = spawn(&mut world, &mut rng, SpeciesId::Human, Coord::new(3, 3));
        afflict(&mut world, human, StatusKind::Invisibility);
        afflict(&mut world, human, StatusKind::Blindness);
        compute_vision(&mut world, human).unwrap();
        let seen = thing_vision(&world, human, knowledge(&world, human), human);
        assert!(seen.can_see_thoughts());
    }

    #[test]
    fn mindless_individuals_forget_terrain() {
        let (mut world, mut rng) = room();
        let blob = spawn(&mut world, &mut rng, SpeciesId::PinkBlob, Coord::new(10, 10));
        compute_vision(&mut world, blob).unwrap();
        assert!(knowledge(&world, blob).tile(Coord::new(12, 10)).is_open_space());
        world.place_standing(blob, Coord::new(30, 10)).unwrap();
        compute_vision(&mut world, blob).unwrap();
        assert_eq!(
            knowledge(&world, blob).tile(Coord::new(12, 10)).tile_type,
            TileType::Unknown
        );
    }
}
