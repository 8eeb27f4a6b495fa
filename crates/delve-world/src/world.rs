//! The authoritative world.
//!
//! [`World`] owns every [`Thing`] in an id-keyed arena, the current level's
//! tiles, the clock, and the per-game item identity permutation. Everything
//! else refers to things by id. Invariants maintained here:
//!
//! - ids are unique and never reused;
//! - container chains are acyclic;
//! - z-orders are dense within every floor pile and inventory.

use std::collections::BTreeMap;

use delve_types::{
    BookDescription, BookKind, Coord, MapMatrix, PotionDescription, PotionKind, ThingId,
    TileType, WandDescription, WandKind,
};
use tracing::debug;

use crate::clock::WorldClock;
use crate::error::WorldError;
use crate::map::{Level, Tile};
use crate::random::{Randomness, shuffle};
use crate::thing::{Location, Thing};

// ---------------------------------------------------------------------------
// Item identities
// ---------------------------------------------------------------------------

/// The per-game mapping from each item kind to its description.
///
/// Each vector is indexed by the kind's canonical index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIdentities {
    /// Description of each wand kind.
    pub wands: Vec<WandDescription>,
    /// Description of each potion kind.
    pub potions: Vec<PotionDescription>,
    /// Description of each book kind.
    pub books: Vec<BookDescription>,
}

impl ItemIdentities {
    /// Kind `i` looks like description `i`. Used in test mode.
    pub fn identity() -> Self {
        Self {
            wands: WandDescription::ALL
                .iter()
                .copied()
                .take(WandKind::ALL.len())
                .collect(),
            potions: PotionDescription::ALL
                .iter()
                .copied()
                .take(PotionKind::ALL.len())
                .collect(),
            books: BookDescription::ALL
                .iter()
                .copied()
                .take(BookKind::ALL.len())
                .collect(),
        }
    }

    /// A random permutation of the descriptions, or the identity mapping in
    /// test mode.
    ///
    /// # Errors
    ///
    /// Propagates draw failures.
    pub fn random<R: Randomness + ?Sized>(rng: &mut R) -> Result<Self, WorldError> {
        if rng.is_test_mode() {
            return Ok(Self::identity());
        }
        let mut wands = WandDescription::ALL.to_vec();
        shuffle(rng, &mut wands, "wand_descriptions")?;
        wands.truncate(WandKind::ALL.len());
        let mut potions = PotionDescription::ALL.to_vec();
        shuffle(rng, &mut potions, "potion_descriptions")?;
        potions.truncate(PotionKind::ALL.len());
        let mut books = BookDescription::ALL.to_vec();
        shuffle(rng, &mut books, "book_descriptions")?;
        books.truncate(BookKind::ALL.len());
        Ok(Self {
            wands,
            potions,
            books,
        })
    }

    /// What a wand kind looks like.
    pub fn wand_description(&self, kind: WandKind) -> WandDescription {
        self.wands
            .get(kind.index())
            .copied()
            .unwrap_or(WandDescription::Bone)
    }

    /// What a potion kind looks like.
    pub fn potion_description(&self, kind: PotionKind) -> PotionDescription {
        self.potions
            .get(kind.index())
            .copied()
            .unwrap_or(PotionDescription::Blue)
    }

    /// What a book kind looks like.
    pub fn book_description(&self, kind: BookKind) -> BookDescription {
        self.books
            .get(kind.index())
            .copied()
            .unwrap_or(BookDescription::Purple)
    }

    /// The wand kind behind a description, if any kind uses it this game.
    pub fn wand_kind_of(&self, description: WandDescription) -> Option<WandKind> {
        WandKind::ALL
            .iter()
            .copied()
            .find(|kind| self.wand_description(*kind) == description)
    }

    /// The potion kind behind a description, if any kind uses it this game.
    pub fn potion_kind_of(&self, description: PotionDescription) -> Option<PotionKind> {
        PotionKind::ALL
            .iter()
            .copied()
            .find(|kind| self.potion_description(*kind) == description)
    }

    /// The book kind behind a description, if any kind uses it this game.
    pub fn book_kind_of(&self, description: BookDescription) -> Option<BookKind> {
        BookKind::ALL
            .iter()
            .copied()
            .find(|kind| self.book_description(*kind) == description)
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The single authoritative game state.
#[derive(Debug, Clone)]
pub struct World {
    things: BTreeMap<ThingId, Thing>,
    tiles: MapMatrix<Tile>,
    stairs_down: Option<Coord>,
    clock: WorldClock,
    identities: ItemIdentities,
    you: Option<ThingId>,
    dungeon_level: i32,
}

impl World {
    /// A world on a level, at tick zero, with nobody in it.
    pub fn new(level: Level, identities: ItemIdentities, dungeon_level: i32) -> Self {
        Self {
            things: BTreeMap::new(),
            tiles: level.tiles,
            stairs_down: level.stairs_down,
            clock: WorldClock::new(),
            identities,
            you: None,
            dungeon_level,
        }
    }

    // ---- globals ----

    /// The current tick.
    pub const fn time(&self) -> i64 {
        self.clock.tick()
    }

    /// Set the clock, used when restoring state.
    pub const fn set_time(&mut self, tick: i64) {
        self.clock = WorldClock::at(tick);
    }

    /// Advance the clock by one tick and return the new tick.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Clock`] on overflow.
    pub fn advance_clock(&mut self) -> Result<i64, WorldError> {
        Ok(self.clock.advance()?)
    }

    /// The item identity permutation.
    pub const fn identities(&self) -> &ItemIdentities {
        &self.identities
    }

    /// The player's individual, once spawned.
    pub const fn you(&self) -> Option<ThingId> {
        self.you
    }

    /// Record which individual is the player.
    pub const fn set_you(&mut self, id: ThingId) {
        self.you = Some(id);
    }

    /// Current depth, from zero.
    pub const fn dungeon_level(&self) -> i32 {
        self.dungeon_level
    }

    // ---- terrain ----

    /// The tile at a coordinate; out-of-bounds reads as border wall.
    pub fn tile(&self, coord: Coord) -> Tile {
        self.tiles
            .get(coord)
            .copied()
            .unwrap_or(Tile::new(TileType::BorderWall, 0))
    }

    /// All tiles of the level.
    pub const fn tiles(&self) -> &MapMatrix<Tile> {
        &self.tiles
    }

    /// Change a tile's terrain, keeping its aesthetics.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] outside the map.
    pub fn set_tile_type(&mut self, coord: Coord, tile_type: TileType) -> Result<(), WorldError> {
        let tile = self
            .tiles
            .get_mut(coord)
            .ok_or(WorldError::OutOfBounds(coord))?;
        tile.tile_type = tile_type;
        Ok(())
    }

    /// Where the stairs down are, on levels that have them.
    pub const fn stairs_down(&self) -> Option<Coord> {
        self.stairs_down
    }

    /// Replace the terrain with a new level. Things are untouched.
    pub fn replace_level(&mut self, level: Level, dungeon_level: i32) {
        self.tiles = level.tiles;
        self.stairs_down = level.stairs_down;
        self.dungeon_level = dungeon_level;
    }

    // ---- arena ----

    /// Look up a thing.
    pub fn get(&self, id: ThingId) -> Option<&Thing> {
        self.things.get(&id)
    }

    /// Look up a thing, or fail.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ThingNotFound`] if absent.
    pub fn thing(&self, id: ThingId) -> Result<&Thing, WorldError> {
        self.things.get(&id).ok_or(WorldError::ThingNotFound(id))
    }

    /// Look up a thing mutably, or fail.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ThingNotFound`] if absent.
    pub fn thing_mut(&mut self, id: ThingId) -> Result<&mut Thing, WorldError> {
        self.things
            .get_mut(&id)
            .ok_or(WorldError::ThingNotFound(id))
    }

    /// Every thing, in id order.
    pub fn things(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    /// Every thing mutably, in id order.
    pub fn things_mut(&mut self) -> impl Iterator<Item = &mut Thing> {
        self.things.values_mut()
    }

    /// How many things exist.
    pub fn thing_count(&self) -> usize {
        self.things.len()
    }

    /// Add a thing to the arena. Its location is honored: pile and inventory
    /// locations are appended at the top of the pile.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateThing`] for a reused id, or a
    /// container error from placing it.
    pub fn insert(&mut self, mut thing: Thing) -> Result<ThingId, WorldError> {
        let id = thing.id;
        if self.things.contains_key(&id) {
            return Err(WorldError::DuplicateThing(id));
        }
        let location = thing.location;
        thing.location = Location::Nowhere;
        self.things.insert(id, thing);
        match location {
            Location::Nowhere => {}
            Location::Standing(coord) => self.place_standing(id, coord)?,
            Location::Floor { coord, .. } => self.place_on_floor(id, coord)?,
            Location::Inventory { container, .. } => self.place_in_inventory(id, container)?,
        }
        Ok(id)
    }

    /// Stand an individual on a tile.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ThingNotFound`] or [`WorldError::OutOfBounds`].
    pub fn place_standing(&mut self, id: ThingId, coord: Coord) -> Result<(), WorldError> {
        if !coord.is_in_bounds() {
            return Err(WorldError::OutOfBounds(coord));
        }
        self.detach(id)?;
        self.thing_mut(id)?.location = Location::Standing(coord);
        Ok(())
    }

    /// Put an item on top of the floor pile at a tile.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ThingNotFound`] or [`WorldError::OutOfBounds`].
    pub fn place_on_floor(&mut self, id: ThingId, coord: Coord) -> Result<(), WorldError> {
        if !coord.is_in_bounds() {
            return Err(WorldError::OutOfBounds(coord));
        }
        self.detach(id)?;
        let z_order = self.items_at(coord).len();
        self.thing_mut(id)?.location = Location::Floor { coord, z_order };
        Ok(())
    }

    /// Put an item at the end of a container's inventory.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ContainerCycle`] if the container is the item or
    /// is (transitively) inside it.
    pub fn place_in_inventory(&mut self, id: ThingId, container: ThingId) -> Result<(), WorldError> {
        self.thing(container)?;
        let mut cursor = Some(container);
        while let Some(current) = cursor {
            if current == id {
                return Err(WorldError::ContainerCycle {
                    thing: id,
                    container,
                });
            }
            cursor = self.thing(current)?.location.container();
        }
        self.detach(id)?;
        let z_order = self.inventory_of(container).len();
        self.thing_mut(id)?.location = Location::Inventory { container, z_order };
        Ok(())
    }

    /// Take a thing out of wherever it is, leaving it nowhere.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ThingNotFound`] if absent.
    pub fn detach(&mut self, id: ThingId) -> Result<(), WorldError> {
        let thing = self.thing_mut(id)?;
        let old = thing.location;
        thing.location = Location::Nowhere;
        self.fix_z_orders(old);
        Ok(())
    }

    /// Renumber the pile or inventory that `location` belongs to.
    fn fix_z_orders(&mut self, location: Location) {
        let members: Vec<ThingId> = match location {
            Location::Floor { coord, .. } => self.items_at(coord),
            Location::Inventory { container, .. } => self.inventory_of(container),
            Location::Nowhere | Location::Standing(_) => return,
        };
        for (z_order, member) in members.into_iter().enumerate() {
            if let Some(thing) = self.things.get_mut(&member) {
                thing.location = thing.location.with_z_order(z_order);
            }
        }
    }

    /// Remove a thing and everything it contains from the arena.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ThingNotFound`] if absent.
    pub fn remove(&mut self, id: ThingId) -> Result<Thing, WorldError> {
        self.detach(id)?;
        for contained in self.inventory_of(id) {
            self.remove(contained)?;
        }
        let thing = self
            .things
            .remove(&id)
            .ok_or(WorldError::ThingNotFound(id))?;
        debug!(thing_id = %id, "Removed thing");
        Ok(thing)
    }

    // ---- queries ----

    /// The living individual standing on a tile.
    pub fn individual_at(&self, coord: Coord) -> Option<&Thing> {
        self.things
            .values()
            .find(|t| t.still_exists && t.location == Location::Standing(coord))
    }

    /// Items in the floor pile at a tile, bottom first.
    pub fn items_at(&self, coord: Coord) -> Vec<ThingId> {
        self.sorted_members(|location| {
            matches!(location, Location::Floor { coord: c, .. } if *c == coord)
        })
    }

    /// Items carried by a thing, first first.
    pub fn inventory_of(&self, container: ThingId) -> Vec<ThingId> {
        self.sorted_members(|location| location.container() == Some(container))
    }

    fn sorted_members(&self, filter: impl Fn(&Location) -> bool) -> Vec<ThingId> {
        let mut members: Vec<(Location, ThingId)> = self
            .things
            .values()
            .filter(|t| filter(&t.location))
            .map(|t| (t.location, t.id))
            .collect();
        members.sort_unstable();
        members.into_iter().map(|(_, id)| id).collect()
    }

    /// Living individuals in ascending initiative order.
    pub fn individuals_by_initiative(&self) -> Vec<ThingId> {
        let mut individuals: Vec<_> = self
            .things
            .values()
            .filter(|t| t.still_exists)
            .filter_map(|t| t.life().map(|life| (life.initiative, t.id)))
            .collect();
        individuals.sort_unstable();
        individuals.into_iter().map(|(_, id)| id).collect()
    }

    /// Things marked destroyed but not yet removed, in id order.
    pub fn dead_things(&self) -> Vec<ThingId> {
        self.things
            .values()
            .filter(|t| !t.still_exists)
            .map(|t| t.id)
            .collect()
    }

    /// The coordinate a thing is at, following containers up to the map.
    pub fn coord_of(&self, id: ThingId) -> Option<Coord> {
        let mut cursor = self.things.get(&id)?;
        loop {
            match cursor.location {
                Location::Standing(coord) | Location::Floor { coord, .. } => return Some(coord),
                Location::Inventory { container, .. } => cursor = self.things.get(&container)?,
                Location::Nowhere => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_types::{DecisionMakerType, Initiative, SpeciesId, WeaponKind};

    use super::*;
    use crate::map::test_level;
    use crate::random::SeededRandom;
    use crate::thing::{Life, ThingKind};

    fn world() -> World {
        World::new(test_level(0), ItemIdentities::identity(), 0)
    }

    fn individual(id: u64, initiative: u64, coord: Coord) -> Thing {
        let life = Life::new(
            SpeciesId::Human,
            DecisionMakerType::Ai,
            Initiative::from_u64(initiative),
        );
        let mut thing = Thing::new(ThingId::from_u64(id), ThingKind::Individual(Box::new(life)));
        thing.location = Location::Standing(coord);
        thing
    }

    fn dagger(id: u64, location: Location) -> Thing {
        let mut thing = Thing::new(ThingId::from_u64(id), ThingKind::Weapon(WeaponKind::Dagger));
        thing.location = location;
        thing
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut world = world();
        world.insert(individual(1, 1, Coord::new(2, 2))).unwrap();
        assert!(matches!(
            world.insert(individual(1, 2, Coord::new(3, 3))),
            Err(WorldError::DuplicateThing(_))
        ));
    }

    #[test]
    fn floor_piles_stay_dense() {
        let mut world = world();
        let coord = Coord::new(4, 4);
        for id in 1..=3 {
            world
                .insert(dagger(id, Location::Floor { coord, z_order: 99 }))
                .unwrap();
        }
        assert_eq!(
            world.items_at(coord),
            vec![
                ThingId::from_u64(1),
                ThingId::from_u64(2),
                ThingId::from_u64(3)
            ]
        );
        world.detach(ThingId::from_u64(2)).unwrap();
        let pile = world.items_at(coord);
        assert_eq!(pile, vec![ThingId::from_u64(1), ThingId::from_u64(3)]);
        assert_eq!(
            world.thing(ThingId::from_u64(3)).unwrap().location,
            Location::Floor { coord, z_order: 1 }
        );
    }

    #[test]
    fn container_cycles_are_rejected() {
        let mut world = world();
        let outer = ThingId::from_u64(1);
        let inner = ThingId::from_u64(2);
        world.insert(dagger(1, Location::Nowhere)).unwrap();
        world
            .insert(dagger(
                2,
                Location::Inventory {
                    container: outer,
                    z_order: 0,
                },
            ))
            .unwrap();
        assert!(matches!(
            world.place_in_inventory(outer, inner),
            Err(WorldError::ContainerCycle { .. })
        ));
        assert!(matches!(
            world.place_in_inventory(outer, outer),
            Err(WorldError::ContainerCycle { .. })
        ));
    }

    #[test]
    fn removing_a_carrier_removes_its_inventory() {
        let mut world = world();
        let holder = world.insert(individual(1, 1, Coord::new(2, 2))).unwrap();
        world
            .insert(dagger(
                2,
                Location::Inventory {
                    container: holder,
                    z_order: 0,
                },
            ))
            .unwrap();
        assert_eq!(world.coord_of(ThingId::from_u64(2)), Some(Coord::new(2, 2)));
        world.remove(holder).unwrap();
        assert_eq!(world.thing_count(), 0);
    }

    #[test]
    fn initiative_orders_individuals() {
        let mut world = world();
        world.insert(individual(1, 20, Coord::new(2, 2))).unwrap();
        world.insert(individual(2, 10, Coord::new(3, 3))).unwrap();
        world.insert(dagger(3, Location::Nowhere)).unwrap();
        assert_eq!(
            world.individuals_by_initiative(),
            vec![ThingId::from_u64(2), ThingId::from_u64(1)]
        );
        world.thing_mut(ThingId::from_u64(2)).unwrap().still_exists = false;
        assert_eq!(world.individuals_by_initiative(), vec![ThingId::from_u64(1)]);
        assert_eq!(world.dead_things(), vec![ThingId::from_u64(2)]);
        assert!(world.individual_at(Coord::new(3, 3)).is_none());
    }

    #[test]
    fn identities_are_permutations() {
        let identities = ItemIdentities::random(&mut SeededRandom::new(5)).unwrap();
        let mut wands = identities.wands.clone();
        wands.sort_unstable();
        wands.dedup();
        assert_eq!(wands.len(), WandKind::ALL.len());
        assert_eq!(
            ItemIdentities::identity().wand_description(WandKind::Digging),
            WandDescription::Gold
        );
    }
}
