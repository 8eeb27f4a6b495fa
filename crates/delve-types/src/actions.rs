//! Actions an individual can take.
//!
//! A decision maker produces one [`Action`] per turn. Directions are unit
//! vectors from [`DIRECTIONS`](crate::geometry::DIRECTIONS); items are named
//! by the acting individual's knowledge of their id. Actions whose names
//! start with `!` are cheats: they take no time and exist for testing.

use serde::{Deserialize, Serialize};

use crate::enums::{
    AbilityId, BookKind, DecisionMakerType, PotionKind, SpeciesId, ThingType, WandKind, WeaponKind,
};
use crate::geometry::Coord;
use crate::ids::ThingId;

/// What kind of thing, and optionally which kind of it, a test or wish names.
///
/// `None` for an item kind means "whose description has not been seen".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingSignature {
    /// An individual of a species.
    Individual(SpeciesId),
    /// A wand.
    Wand(Option<WandKind>),
    /// A potion.
    Potion(Option<PotionKind>),
    /// A book.
    Book(Option<BookKind>),
    /// A weapon.
    Weapon(WeaponKind),
}

impl ThingSignature {
    /// The category this signature matches.
    pub const fn thing_type(self) -> ThingType {
        match self {
            Self::Individual(_) => ThingType::Individual,
            Self::Wand(_) => ThingType::Wand,
            Self::Potion(_) => ThingType::Potion,
            Self::Book(_) => ThingType::Book,
            Self::Weapon(_) => ThingType::Weapon,
        }
    }

    /// The second save-file token (`unknown` for an unseen description).
    pub const fn kind_name(self) -> &'static str {
        match self {
            Self::Individual(species) => species.name(),
            Self::Wand(Some(kind)) => kind.name(),
            Self::Potion(Some(kind)) => kind.name(),
            Self::Book(Some(kind)) => kind.name(),
            Self::Weapon(kind) => kind.name(),
            Self::Wand(None) | Self::Potion(None) | Self::Book(None) => "unknown",
        }
    }
}

/// One decision by one individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Step in a direction (bumping if blocked, attacking nothing).
    Move(Coord),
    /// Let time pass.
    Wait,
    /// Melee in a direction.
    Attack(Coord),
    /// Zap a carried wand in a direction.
    Zap {
        /// The wand.
        item: ThingId,
        /// Beam direction.
        direction: Coord,
    },
    /// Pick up an item from the floor underfoot.
    PickUp(ThingId),
    /// Drop a carried item underfoot.
    Drop(ThingId),
    /// Drink a carried potion.
    Quaff(ThingId),
    /// Cast the spell in a carried book.
    ReadBook {
        /// The book.
        item: ThingId,
        /// Spell direction.
        direction: Coord,
    },
    /// Throw a carried item.
    Throw {
        /// The item.
        item: ThingId,
        /// Throw direction.
        direction: Coord,
    },
    /// Descend the stairs underfoot.
    GoDown,
    /// Use an innate species ability.
    Ability {
        /// Which ability.
        ability: AbilityId,
        /// Direction of use.
        direction: Coord,
    },

    /// Restore full hitpoints.
    CheatHealth,
    /// Kill any individual instantly.
    CheatKill(ThingId),
    /// Permanently become another species.
    CheatPolymorph(SpeciesId),
    /// Create an individual.
    CheatGenerateMonster {
        /// Its species.
        species: SpeciesId,
        /// Its controller.
        decision_maker: DecisionMakerType,
        /// Where it stands.
        location: Coord,
    },
    /// Create an item in the actor's inventory.
    CheatWish(ThingSignature),
    /// Learn every item identity.
    CheatIdentify,
    /// Descend without stairs.
    CheatGoDown,
    /// Gain enough experience for the next level.
    CheatGainLevel,
}

impl Action {
    /// The save-file keyword for this action.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Wait => "wait",
            Self::Attack(_) => "attack",
            Self::Zap { .. } => "zap",
            Self::PickUp(_) => "pickup",
            Self::Drop(_) => "drop",
            Self::Quaff(_) => "quaff",
            Self::ReadBook { .. } => "read_book",
            Self::Throw { .. } => "throw",
            Self::GoDown => "down",
            Self::Ability { .. } => "ability",
            Self::CheatHealth => "!health",
            Self::CheatKill(_) => "!kill",
            Self::CheatPolymorph(_) => "!polymorph",
            Self::CheatGenerateMonster { .. } => "!monster",
            Self::CheatWish(_) => "!wish",
            Self::CheatIdentify => "!identify",
            Self::CheatGoDown => "!down",
            Self::CheatGainLevel => "!levelup",
        }
    }

    /// Cheats cost no time; the actor keeps its turn.
    pub const fn is_cheat(&self) -> bool {
        matches!(
            self,
            Self::CheatHealth
                | Self::CheatKill(_)
                | Self::CheatPolymorph(_)
                | Self::CheatGenerateMonster { .. }
                | Self::CheatWish(_)
                | Self::CheatIdentify
                | Self::CheatGoDown
                | Self::CheatGainLevel
        )
    }

    /// The direction this action points in, if it has one.
    pub const fn direction(&self) -> Option<Coord> {
        match self {
            Self::Move(direction)
            | Self::Attack(direction)
            | Self::Zap { direction, .. }
            | Self::ReadBook { direction, .. }
            | Self::Throw { direction, .. }
            | Self::Ability { direction, .. } => Some(*direction),
            _ => None,
        }
    }

    /// The item this action uses, if any.
    pub const fn item(&self) -> Option<ThingId> {
        match self {
            Self::Zap { item, .. }
            | Self::ReadBook { item, .. }
            | Self::Throw { item, .. }
            | Self::PickUp(item)
            | Self::Drop(item)
            | Self::Quaff(item) => Some(*item),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cheats_are_flagged() {
        assert!(Action::CheatIdentify.is_cheat());
        assert!(!Action::Wait.is_cheat());
        assert!(Action::CheatGoDown.name().starts_with('!'));
    }

    #[test]
    fn direction_and_item_accessors() {
        let item = ThingId::from_u64(9);
        let zap = Action::Zap {
            item,
            direction: Coord::new(1, 0),
        };
        assert_eq!(zap.direction(), Some(Coord::new(1, 0)));
        assert_eq!(zap.item(), Some(item));
        assert_eq!(Action::GoDown.direction(), None);
        assert_eq!(Action::Drop(item).item(), Some(item));
    }

    #[test]
    fn serializes_as_json() {
        let action = Action::Move(Coord::new(-1, 1));
        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn signature_kind_names() {
        assert_eq!(ThingSignature::Wand(None).kind_name(), "unknown");
        assert_eq!(ThingSignature::Individual(SpeciesId::Ogre).kind_name(), "ogre");
        assert_eq!(ThingSignature::Potion(Some(PotionKind::Healing)).thing_type(), ThingType::Potion);
    }
}
