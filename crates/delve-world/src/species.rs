//! The static species table and the cost constants.
//!
//! | species | move | hp | mana | atk | levels | mind | vision |
//! |---------|------|----|------|-----|--------|------|--------|
//! | human | 12 | 10 | 3 | 3 | 0-10 | civilized | normal |
//! | ogre | 24 | 15 | 0 | 2 | 4-10 | savage | normal |
//! | lich | 12 | 12 | 4 | 3 | 7-10 | civilized | normal |
//! | shapeshifter | 12 | 5 | 0 | 2 | 1-10 | civilized | normal |
//! | pink blob | 48 | 4 | 0 | 1 | 0-1 | none | ethereal |
//! | air elemental | 6 | 6 | 0 | 1 | 3-10 | none | ethereal |
//! | tar elemental | 24 | 10 | 0 | 1 | 3-10 | none | ethereal |
//! | dog | 12 | 4 | 0 | 2 | 1-2 | beast | normal |
//! | ant | 12 | 2 | 0 | 1 | 0-1 | beast | normal |
//! | bee | 12 | 2 | 0 | 3 | 1-2 | beast | normal |
//! | beetle | 24 | 6 | 0 | 1 | 0-1 | beast | normal |
//! | scorpion | 24 | 5 | 0 | 1 | 2-3 | beast | normal |
//! | snake | 24 | 4 | 0 | 2 | 1-2 | beast | normal |
//! | cobra | 24 | 2 | 0 | 1 | 2-3 | beast | normal |

use delve_types::{AbilityId, Mind, SpeciesId, VisionTypes};

/// Ticks every non-move action costs.
pub const ACTION_COST: i64 = 12;

/// Movement cost while sped up.
pub const SPEEDY_MOVEMENT_COST: i64 = 3;

/// Movement cost while slowed.
pub const SLOW_MOVEMENT_COST: i64 = 48;

/// Static properties of a species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    /// Which species this row describes.
    pub id: SpeciesId,
    /// Ticks one step costs.
    pub movement_cost: i64,
    /// Hitpoints at level zero.
    pub base_hitpoints: i32,
    /// Mana per level, counting level zero.
    pub base_mana: i32,
    /// Melee damage at level zero.
    pub base_attack_power: i32,
    /// Shallowest dungeon level where it spawns.
    pub min_level: i32,
    /// Deepest dungeon level where it spawns.
    pub max_level: i32,
    /// Sentience.
    pub mind: Mind,
    /// Innate vision (touch is added for everyone).
    pub vision: VisionTypes,
    /// Moving onto items engulfs them.
    pub sucks_up_items: bool,
    /// Randomly flings carried items around.
    pub auto_throws_items: bool,
    /// Melee hits poison, and the species is immune to poison.
    pub poison_attack: bool,
    /// Floats above the ground.
    pub flying: bool,
    /// Innate abilities.
    pub abilities: &'static [AbilityId],
}

macro_rules! species_row {
    (
        $id:ident, $movement:expr, $hp:expr, $mana:expr, $attack:expr, $min:expr, $max:expr,
        $mind:ident, $vision:ident, $sucks:expr, $throws:expr, $poison:expr, $flying:expr,
        $abilities:expr
    ) => {
        Species {
            id: SpeciesId::$id,
            movement_cost: $movement,
            base_hitpoints: $hp,
            base_mana: $mana,
            base_attack_power: $attack,
            min_level: $min,
            max_level: $max,
            mind: Mind::$mind,
            vision: VisionTypes::$vision,
            sucks_up_items: $sucks,
            auto_throws_items: $throws,
            poison_attack: $poison,
            flying: $flying,
            abilities: $abilities,
        }
    };
}

const NO_ABILITIES: &[AbilityId] = &[];

//                             move  hp mana atk min max mind       vision    sucks  throws poison flying
const HUMAN: Species = species_row!(Human, 12, 10, 3, 3, 0, 10, Civilized, NORMAL, false, false, false, false, NO_ABILITIES);
const OGRE: Species = species_row!(Ogre, 24, 15, 0, 2, 4, 10, Savage, NORMAL, false, false, false, false, NO_ABILITIES);
const LICH: Species = species_row!(Lich, 12, 12, 4, 3, 7, 10, Civilized, NORMAL, false, false, false, false, NO_ABILITIES);
const SHAPESHIFTER: Species = species_row!(Shapeshifter, 12, 5, 0, 2, 1, 10, Civilized, NORMAL, false, false, false, false, NO_ABILITIES);
const PINK_BLOB: Species = species_row!(PinkBlob, 48, 4, 0, 1, 0, 1, None, ETHEREAL, true, false, false, false, NO_ABILITIES);
const AIR_ELEMENTAL: Species = species_row!(AirElemental, 6, 6, 0, 1, 3, 10, None, ETHEREAL, true, true, false, true, NO_ABILITIES);
const TAR_ELEMENTAL: Species = species_row!(TarElemental, 24, 10, 0, 1, 3, 10, None, ETHEREAL, true, false, false, false, &[AbilityId::ThrowTar]);
const DOG: Species = species_row!(Dog, 12, 4, 0, 2, 1, 2, Beast, NORMAL, false, false, false, false, NO_ABILITIES);
const ANT: Species = species_row!(Ant, 12, 2, 0, 1, 0, 1, Beast, NORMAL, false, false, false, false, NO_ABILITIES);
const BEE: Species = species_row!(Bee, 12, 2, 0, 3, 1, 2, Beast, NORMAL, false, false, false, true, NO_ABILITIES);
const BEETLE: Species = species_row!(Beetle, 24, 6, 0, 1, 0, 1, Beast, NORMAL, false, false, false, false, NO_ABILITIES);
const SCORPION: Species = species_row!(Scorpion, 24, 5, 0, 1, 2, 3, Beast, NORMAL, false, false, true, false, NO_ABILITIES);
const SNAKE: Species = species_row!(Snake, 24, 4, 0, 2, 1, 2, Beast, NORMAL, false, false, false, false, NO_ABILITIES);
const COBRA: Species = species_row!(Cobra, 24, 2, 0, 1, 2, 3, Beast, NORMAL, false, false, false, false, &[AbilityId::SpitBlindingVenom]);

/// Look up the static row for a species.
pub const fn species(id: SpeciesId) -> &'static Species {
    match id {
        SpeciesId::Human => &HUMAN,
        SpeciesId::Ogre => &OGRE,
        SpeciesId::Lich => &LICH,
        SpeciesId::Shapeshifter => &SHAPESHIFTER,
        SpeciesId::PinkBlob => &PINK_BLOB,
        SpeciesId::AirElemental => &AIR_ELEMENTAL,
        SpeciesId::TarElemental => &TAR_ELEMENTAL,
        SpeciesId::Dog => &DOG,
        SpeciesId::Ant => &ANT,
        SpeciesId::Bee => &BEE,
        SpeciesId::Beetle => &BEETLE,
        SpeciesId::Scorpion => &SCORPION,
        SpeciesId::Snake => &SNAKE,
        SpeciesId::Cobra => &COBRA,
    }
}

impl Species {
    /// Whether the species has any mind at all.
    pub const fn has_mind(&self) -> bool {
        !matches!(self.mind, Mind::None)
    }

    /// Whether the species is born with an ability.
    pub fn has_ability(&self, ability: AbilityId) -> bool {
        self.abilities.contains(&ability)
    }

    /// Whether the species may spawn on a dungeon level.
    pub const fn spawns_on(&self, dungeon_level: i32) -> bool {
        self.min_level <= dungeon_level && dungeon_level <= self.max_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_match_their_ids() {
        for id in SpeciesId::ALL {
            assert_eq!(species(*id).id, *id);
        }
    }

    #[test]
    fn ethereal_species_are_mindless() {
        for id in SpeciesId::ALL {
            let row = species(*id);
            if row.vision.contains(VisionTypes::ETHEREAL) {
                assert!(!row.has_mind(), "{id}");
            }
        }
    }

    #[test]
    fn abilities_belong_to_their_species() {
        assert!(species(SpeciesId::Cobra).has_ability(AbilityId::SpitBlindingVenom));
        assert!(species(SpeciesId::TarElemental).has_ability(AbilityId::ThrowTar));
        assert!(!species(SpeciesId::Human).has_ability(AbilityId::ThrowTar));
    }

    #[test]
    fn every_level_has_something_to_spawn() {
        for level in 0..5 {
            assert!(
                SpeciesId::ALL
                    .iter()
                    .any(|id| *id != SpeciesId::Human && species(*id).spawns_on(level))
            );
        }
    }
}
