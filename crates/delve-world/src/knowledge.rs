//! Per-individual knowledge of the world.
//!
//! A [`Knowledge`] is what one individual believes: the tiles it has seen,
//! what it can see right now, the things it has perceived (possibly stale or
//! placeholders for suspected invisible presences), which item descriptions
//! it has identified, and its narration log.

use std::collections::{BTreeMap, BTreeSet};

use delve_types::{
    BookDescription, BookKind, Coord, MapMatrix, PotionDescription, PotionKind, SpeciesId,
    StatusEffectId, Team, ThingId, ThingSignature, ThingType, VisionTypes, WandDescription,
    WandKind, WeaponKind,
};
use serde::{Deserialize, Serialize};

use crate::map::Tile;
use crate::thing::Location;

/// Narration entries kept before the oldest half is forgotten.
pub const NARRATION_CAPACITY: usize = 1000;

/// Ticks after which an unconfirmed placeholder is forgotten.
pub const PLACEHOLDER_TIMEOUT: i64 = 600;

// ---------------------------------------------------------------------------
// Narration
// ---------------------------------------------------------------------------

/// One entry in a narration log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Narration {
    /// A sentence describing a perceived event.
    Sentence(String),
    /// Marks the start of a new poised moment.
    Separator,
}

/// Append-only narration with oldest-half eviction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationLog {
    entries: Vec<Narration>,
    forgotten: u64,
}

impl NarrationLog {
    /// An empty log.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            forgotten: 0,
        }
    }

    /// Append an entry, forgetting the oldest half first when full.
    pub fn push(&mut self, entry: Narration) {
        if self.entries.len() >= NARRATION_CAPACITY {
            let evict = NARRATION_CAPACITY / 2;
            self.entries.drain(..evict);
            self.forgotten = self
                .forgotten
                .saturating_add(u64::try_from(evict).unwrap_or(u64::MAX));
        }
        self.entries.push(entry);
    }

    /// Append a sentence.
    pub fn push_sentence(&mut self, text: impl Into<String>) {
        self.push(Narration::Sentence(text.into()));
    }

    /// Start a new poised moment, unless nothing was said since the last one.
    pub fn push_separator(&mut self) {
        match self.entries.last() {
            None | Some(Narration::Separator) => {}
            Some(Narration::Sentence(_)) => self.push(Narration::Separator),
        }
    }

    /// The retained entries, oldest first.
    pub fn entries(&self) -> &[Narration] {
        &self.entries
    }

    /// How many entries have been evicted so far.
    pub const fn forgotten(&self) -> u64 {
        self.forgotten
    }

    /// Entries ever appended, including evicted ones. Usable as a mark.
    pub fn total(&self) -> u64 {
        self.forgotten
            .saturating_add(u64::try_from(self.entries.len()).unwrap_or(u64::MAX))
    }

    /// Retained entries appended at or after an absolute mark.
    pub fn since(&self, mark: u64) -> &[Narration] {
        let start = usize::try_from(mark.saturating_sub(self.forgotten)).unwrap_or(usize::MAX);
        self.entries.get(start..).unwrap_or(&[])
    }

    /// The retained sentences, without separators.
    pub fn sentences(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            Narration::Sentence(text) => Some(text.as_str()),
            Narration::Separator => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Perceived things
// ---------------------------------------------------------------------------

/// What an observer knows about the variant of a perceived thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerceivedKind {
    /// An individual of an apparent species.
    ///
    /// For a placeholder both fields are the observer's guess: it assumes an
    /// unseen presence is a hostile human.
    Individual {
        /// The species it looks like.
        species: SpeciesId,
        /// The side it appears to fight for.
        team: Team,
    },
    /// A wand.
    Wand {
        /// Its appearance; `None` when only its shape was sensed.
        description: Option<WandDescription>,
        /// Times seen zapped; `-1` once seen to be empty.
        used_count: i32,
    },
    /// A potion.
    Potion {
        /// Its appearance; `None` when only its shape was sensed.
        description: Option<PotionDescription>,
    },
    /// A book.
    Book {
        /// Its appearance; `None` when only its shape was sensed.
        description: Option<BookDescription>,
    },
    /// A weapon.
    Weapon {
        /// Weapons are recognized on sight.
        kind: WeaponKind,
    },
}

impl PerceivedKind {
    /// The category of the perceived thing.
    pub const fn thing_type(&self) -> ThingType {
        match self {
            Self::Individual { .. } => ThingType::Individual,
            Self::Wand { .. } => ThingType::Wand,
            Self::Potion { .. } => ThingType::Potion,
            Self::Book { .. } => ThingType::Book,
            Self::Weapon { .. } => ThingType::Weapon,
        }
    }
}

/// An observer's degraded copy of a thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceivedThing {
    /// Same id as the real thing.
    pub id: ThingId,
    /// Stands in for a suspected but unconfirmed presence.
    pub is_placeholder: bool,
    /// What the observer knows of its variant.
    pub kind: PerceivedKind,
    /// Where the observer last saw it.
    pub location: Location,
    /// Tick of the last sighting.
    pub last_seen_time: i64,
    /// Status effects the observer noticed.
    pub status_effects: BTreeSet<StatusEffectId>,
}

impl PerceivedThing {
    /// A freshly perceived thing with no noticed statuses.
    pub const fn new(
        id: ThingId,
        is_placeholder: bool,
        kind: PerceivedKind,
        location: Location,
        last_seen_time: i64,
    ) -> Self {
        Self {
            id,
            is_placeholder,
            kind,
            location,
            last_seen_time,
            status_effects: BTreeSet::new(),
        }
    }

    /// Whether it looks like an individual.
    pub const fn is_individual(&self) -> bool {
        matches!(self.kind, PerceivedKind::Individual { .. })
    }

    /// Whether the observer noticed this status.
    pub fn has_status(&self, id: StatusEffectId) -> bool {
        self.status_effects.contains(&id)
    }
}

// ---------------------------------------------------------------------------
// Knowledge
// ---------------------------------------------------------------------------

/// One individual's picture of the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Knowledge {
    /// Remembered terrain.
    pub tiles: MapMatrix<Tile>,
    /// Current vision per tile, recomputed by the vision engine.
    pub tile_is_visible: MapMatrix<VisionTypes>,
    /// Everything perceived, by id.
    pub perceived_things: BTreeMap<ThingId, PerceivedThing>,
    /// Identified wand descriptions. These are never wrong.
    pub wand_identities: BTreeMap<WandDescription, WandKind>,
    /// Identified potion descriptions.
    pub potion_identities: BTreeMap<PotionDescription, PotionKind>,
    /// Identified book descriptions.
    pub book_identities: BTreeMap<BookDescription, BookKind>,
    /// What this individual has witnessed, in words.
    pub narration: NarrationLog,
}

impl Default for Knowledge {
    fn default() -> Self {
        Self::new()
    }
}

impl Knowledge {
    /// Knowing nothing.
    pub fn new() -> Self {
        Self {
            tiles: MapMatrix::filled(Tile::UNKNOWN),
            tile_is_visible: MapMatrix::filled(VisionTypes::none()),
            perceived_things: BTreeMap::new(),
            wand_identities: BTreeMap::new(),
            potion_identities: BTreeMap::new(),
            book_identities: BTreeMap::new(),
            narration: NarrationLog::new(),
        }
    }

    /// Forget all terrain and current vision, as on arriving at a new level.
    pub fn reset_map(&mut self) {
        self.tiles.fill(&Tile::UNKNOWN);
        self.tile_is_visible.fill(&VisionTypes::none());
    }

    /// The remembered tile; out-of-bounds reads as unknown.
    pub fn tile(&self, coord: Coord) -> Tile {
        self.tiles.get(coord).copied().unwrap_or(Tile::UNKNOWN)
    }

    /// Current vision of a tile; out-of-bounds is never visible.
    pub fn vision_at(&self, coord: Coord) -> VisionTypes {
        self.tile_is_visible
            .get(coord)
            .copied()
            .unwrap_or_else(VisionTypes::none)
    }

    /// A perceived thing by id.
    pub fn perceived(&self, id: ThingId) -> Option<&PerceivedThing> {
        self.perceived_things.get(&id)
    }

    /// Perceived things on a tile (standing or in the pile), in location order.
    pub fn perceived_at(&self, coord: Coord) -> Vec<&PerceivedThing> {
        let mut found: Vec<&PerceivedThing> = self
            .perceived_things
            .values()
            .filter(|thing| thing.location.coord() == Some(coord))
            .collect();
        found.sort_by(|a, b| a.location.cmp(&b.location).then(a.id.cmp(&b.id)));
        found
    }

    /// The perceived individual standing on a tile, if any.
    pub fn perceived_individual_at(&self, coord: Coord) -> Option<&PerceivedThing> {
        self.perceived_things
            .values()
            .find(|thing| thing.location == Location::Standing(coord))
    }

    /// Perceived contents of a container, in z-order.
    pub fn perceived_inventory(&self, container: ThingId) -> Vec<&PerceivedThing> {
        let mut found: Vec<&PerceivedThing> = self
            .perceived_things
            .values()
            .filter(|thing| thing.location.container() == Some(container))
            .collect();
        found.sort_by(|a, b| a.location.cmp(&b.location).then(a.id.cmp(&b.id)));
        found
    }

    /// Forget a thing and, recursively, everything it was seen carrying.
    pub fn forget(&mut self, id: ThingId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if self.perceived_things.remove(&next).is_none() {
                continue;
            }
            pending.extend(
                self.perceived_things
                    .values()
                    .filter(|thing| thing.location.container() == Some(next))
                    .map(|thing| thing.id),
            );
        }
    }

    /// Renumber perceived z-orders densely within every pile and inventory.
    pub fn fix_z_orders(&mut self) {
        let mut piles: BTreeMap<Location, Vec<(usize, ThingId)>> = BTreeMap::new();
        for thing in self.perceived_things.values() {
            if let Some(z_order) = thing.location.z_order() {
                piles
                    .entry(thing.location.with_z_order(0))
                    .or_default()
                    .push((z_order, thing.id));
            }
        }
        for (pile, mut members) in piles {
            members.sort_unstable();
            for (dense, (_, id)) in members.into_iter().enumerate() {
                if let Some(thing) = self.perceived_things.get_mut(&id) {
                    thing.location = pile.with_z_order(dense);
                }
            }
        }
    }

    // ---- identification ----

    /// Record that a wand description means a kind.
    pub fn identify_wand(&mut self, description: WandDescription, kind: WandKind) {
        self.wand_identities.insert(description, kind);
    }

    /// Record that a potion description means a kind.
    pub fn identify_potion(&mut self, description: PotionDescription, kind: PotionKind) {
        self.potion_identities.insert(description, kind);
    }

    /// Record that a book description means a kind.
    pub fn identify_book(&mut self, description: BookDescription, kind: BookKind) {
        self.book_identities.insert(description, kind);
    }

    /// The signature this observer would give a perceived thing.
    pub fn signature_of(&self, thing: &PerceivedThing) -> ThingSignature {
        match thing.kind {
            PerceivedKind::Individual { species, .. } => ThingSignature::Individual(species),
            PerceivedKind::Wand { description, .. } => ThingSignature::Wand(
                description.and_then(|d| self.wand_identities.get(&d).copied()),
            ),
            PerceivedKind::Potion { description } => ThingSignature::Potion(
                description.and_then(|d| self.potion_identities.get(&d).copied()),
            ),
            PerceivedKind::Book { description } => ThingSignature::Book(
                description.and_then(|d| self.book_identities.get(&d).copied()),
            ),
            PerceivedKind::Weapon { kind } => ThingSignature::Weapon(kind),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wand(id: u64, location: Location) -> PerceivedThing {
        PerceivedThing::new(
            ThingId::from_u64(id),
            false,
            PerceivedKind::Wand {
                description: Some(WandDescription::Bone),
                used_count: 0,
            },
            location,
            0,
        )
    }

    #[test]
    fn narration_evicts_oldest_half() {
        let mut log = NarrationLog::new();
        for i in 0..NARRATION_CAPACITY {
            log.push_sentence(format!("line {i}"));
        }
        assert_eq!(log.forgotten(), 0);
        log.push_sentence("overflow");
        assert_eq!(log.forgotten(), 500);
        assert_eq!(log.entries().len(), 501);
        assert_eq!(log.total(), 1001);
        assert_eq!(
            log.entries().first(),
            Some(&Narration::Sentence("line 500".to_owned()))
        );
        assert_eq!(log.since(1000).len(), 1);
        assert_eq!(log.since(0).len(), 501);
    }

    #[test]
    fn separators_never_repeat() {
        let mut log = NarrationLog::new();
        log.push_separator();
        assert!(log.entries().is_empty());
        log.push_sentence("You wait.");
        log.push_separator();
        log.push_separator();
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.sentences().count(), 1);
    }

    #[test]
    fn forgetting_a_container_forgets_its_contents() {
        let mut knowledge = Knowledge::new();
        let holder = ThingId::from_u64(1);
        knowledge.perceived_things.insert(
            holder,
            PerceivedThing::new(
                holder,
                false,
                PerceivedKind::Individual {
                    species: SpeciesId::Ogre,
                    team: Team::Bad,
                },
                Location::Standing(Coord::new(2, 2)),
                0,
            ),
        );
        let carried = wand(
            2,
            Location::Inventory {
                container: holder,
                z_order: 0,
            },
        );
        knowledge.perceived_things.insert(carried.id, carried);
        knowledge.forget(holder);
        assert!(knowledge.perceived_things.is_empty());
    }

    #[test]
    fn z_orders_become_dense() {
        let mut knowledge = Knowledge::new();
        let coord = Coord::new(3, 3);
        for (id, z) in [(5, 4), (6, 9)] {
            let item = wand(id, Location::Floor { coord, z_order: z });
            knowledge.perceived_things.insert(item.id, item);
        }
        knowledge.fix_z_orders();
        let pile = knowledge.perceived_at(coord);
        assert_eq!(pile.len(), 2);
        assert_eq!(pile.first().unwrap().location.z_order(), Some(0));
        assert_eq!(pile.get(1).unwrap().location.z_order(), Some(1));
    }

    #[test]
    fn signatures_use_identification() {
        let mut knowledge = Knowledge::new();
        let item = wand(1, Location::Nowhere);
        assert_eq!(knowledge.signature_of(&item), ThingSignature::Wand(None));
        knowledge.identify_wand(WandDescription::Bone, WandKind::Digging);
        assert_eq!(
            knowledge.signature_of(&item),
            ThingSignature::Wand(Some(WandKind::Digging))
        );
    }
}
