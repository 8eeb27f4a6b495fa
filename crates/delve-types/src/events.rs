//! Authoritative state-change events.
//!
//! An [`Event`] always names participants by their true ids and coordinates.
//! It is never pre-filtered: deciding what a particular observer perceives of
//! it is the job of the perception pipeline, which may substitute
//! placeholder ids for participants the observer cannot see.
//!
//! `effect` fields carry the *observable* effect: `None` when nothing visibly
//! changed (for example a confusion beam hitting an already confused target),
//! which is also what stops a no-op from identifying an item.

use serde::{Deserialize, Serialize};

use crate::enums::{AbilityId, BookKind, PotionKind, SpeciesId, StatusEffectId, WandKind};
use crate::geometry::Coord;
use crate::ids::ThingId;

/// One authoritative state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    // ---- one individual ----
    /// An individual came into existence.
    Appear {
        /// The new individual.
        individual: ThingId,
    },
    /// An individual gained an experience level.
    LevelUp {
        /// Who leveled up.
        individual: ThingId,
    },
    /// An individual died of something other than a melee blow.
    Die {
        /// Who died.
        individual: ThingId,
    },
    /// A thing is about to be removed from the world for good.
    DeleteThing {
        /// What is being removed.
        thing: ThingId,
    },
    /// A status effect started. Only published when it actually changed.
    GainStatus {
        /// Who is affected.
        individual: ThingId,
        /// Which effect.
        status: StatusEffectId,
    },
    /// A status effect ended. Only published when it was present.
    LoseStatus {
        /// Who is affected.
        individual: ThingId,
        /// Which effect.
        status: StatusEffectId,
    },
    /// An individual changed species.
    Polymorph {
        /// Who transformed.
        individual: ThingId,
        /// What it became.
        new_species: SpeciesId,
    },

    // ---- an individual and a location ----
    /// An individual stepped from one tile to an adjacent one.
    Move {
        /// Who moved.
        actor: ThingId,
        /// Where it was.
        from: Coord,
        /// Where it is now.
        to: Coord,
    },
    /// An individual walked into a wall.
    BumpIntoLocation {
        /// Who bumped.
        actor: ThingId,
        /// The blocking tile.
        location: Coord,
    },
    /// An individual attacked an empty tile.
    AttackLocation {
        /// Who attacked.
        actor: ThingId,
        /// The empty tile.
        location: Coord,
    },

    // ---- two individuals ----
    /// An individual walked into another.
    BumpIntoIndividual {
        /// Who bumped.
        actor: ThingId,
        /// Who was bumped.
        target: ThingId,
    },
    /// A melee hit that did not kill.
    AttackIndividual {
        /// The attacker.
        actor: ThingId,
        /// The victim.
        target: ThingId,
    },
    /// A melee hit that killed.
    MeleeKill {
        /// The attacker.
        actor: ThingId,
        /// The victim.
        target: ThingId,
    },

    // ---- an individual and an item ----
    /// A wand was zapped and a beam fired.
    ZapWand {
        /// Who zapped.
        actor: ThingId,
        /// The wand.
        item: ThingId,
        /// Where the zapper stands.
        location: Coord,
    },
    /// A wand with no charges was zapped.
    ZapWandNoCharges {
        /// Who zapped.
        actor: ThingId,
        /// The wand.
        item: ThingId,
    },
    /// An overused wand crumbled.
    WandDisintegrates {
        /// Who zapped.
        actor: ThingId,
        /// The wand.
        item: ThingId,
    },
    /// A book was read.
    ReadBook {
        /// The reader.
        actor: ThingId,
        /// The book.
        item: ThingId,
        /// The spell, if its effect was observable.
        effect: Option<BookKind>,
    },
    /// An item was thrown.
    ThrowItem {
        /// The thrower.
        actor: ThingId,
        /// The item.
        item: ThingId,
        /// Where the thrower stands.
        location: Coord,
    },
    /// A thrown item hit an individual.
    ItemHitsIndividual {
        /// The item.
        item: ThingId,
        /// Who was hit.
        target: ThingId,
        /// Where the hit happened.
        location: Coord,
    },
    /// An individual picked up an item.
    PickUp {
        /// Who picked it up.
        actor: ThingId,
        /// The item.
        item: ThingId,
        /// Where it was lying.
        location: Coord,
    },
    /// A blob engulfed an item it moved onto.
    SuckUp {
        /// The blob.
        actor: ThingId,
        /// The item.
        item: ThingId,
        /// Where it was lying.
        location: Coord,
    },
    /// An individual dropped an item.
    DropItem {
        /// Who dropped it.
        actor: ThingId,
        /// The item.
        item: ThingId,
        /// Where it landed.
        location: Coord,
    },
    /// An individual drank a potion.
    QuaffPotion {
        /// Who drank.
        actor: ThingId,
        /// The potion.
        item: ThingId,
        /// Where the drinker stands.
        location: Coord,
        /// The observable effect.
        effect: Option<PotionKind>,
    },
    /// An individual used an innate ability.
    UseAbility {
        /// Who used it.
        actor: ThingId,
        /// Which ability.
        ability: AbilityId,
        /// Where the user stands.
        location: Coord,
    },

    // ---- beams ----
    /// A wand beam hit an individual.
    BeamHitIndividual {
        /// Who was hit.
        target: ThingId,
        /// Where.
        location: Coord,
        /// The observable effect.
        effect: Option<WandKind>,
    },
    /// A wand beam hit a wall.
    BeamHitWall {
        /// The wall.
        location: Coord,
        /// The observable effect.
        effect: Option<WandKind>,
    },
    /// A magic bullet spell hit an individual.
    MagicBulletHit {
        /// Who was hit.
        target: ThingId,
        /// Where.
        location: Coord,
    },

    // ---- an item and a location ----
    /// A flying item stopped at a wall.
    ItemHitsWall {
        /// The item.
        item: ThingId,
        /// The wall it hit.
        location: Coord,
    },
    /// A flying item fell to the floor.
    ItemDropsToFloor {
        /// The item.
        item: ThingId,
        /// Where it landed.
        location: Coord,
    },
    /// A thrown potion shattered, possibly splashing someone.
    PotionBreaks {
        /// The potion.
        item: ThingId,
        /// Where it broke.
        location: Coord,
        /// Who it splashed.
        target: Option<ThingId>,
        /// The observable effect on the target.
        effect: Option<PotionKind>,
    },
}

impl Event {
    /// A short label for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Appear { .. } => "appear",
            Self::LevelUp { .. } => "level_up",
            Self::Die { .. } => "die",
            Self::DeleteThing { .. } => "delete_thing",
            Self::GainStatus { .. } => "gain_status",
            Self::LoseStatus { .. } => "lose_status",
            Self::Polymorph { .. } => "polymorph",
            Self::Move { .. } => "move",
            Self::BumpIntoLocation { .. } => "bump_into_location",
            Self::AttackLocation { .. } => "attack_location",
            Self::BumpIntoIndividual { .. } => "bump_into_individual",
            Self::AttackIndividual { .. } => "attack_individual",
            Self::MeleeKill { .. } => "melee_kill",
            Self::ZapWand { .. } => "zap_wand",
            Self::ZapWandNoCharges { .. } => "zap_wand_no_charges",
            Self::WandDisintegrates { .. } => "wand_disintegrates",
            Self::ReadBook { .. } => "read_book",
            Self::ThrowItem { .. } => "throw_item",
            Self::ItemHitsIndividual { .. } => "item_hits_individual",
            Self::PickUp { .. } => "pick_up",
            Self::SuckUp { .. } => "suck_up",
            Self::DropItem { .. } => "drop_item",
            Self::QuaffPotion { .. } => "quaff_potion",
            Self::UseAbility { .. } => "use_ability",
            Self::BeamHitIndividual { .. } => "beam_hit_individual",
            Self::BeamHitWall { .. } => "beam_hit_wall",
            Self::MagicBulletHit { .. } => "magic_bullet_hit",
            Self::ItemHitsWall { .. } => "item_hits_wall",
            Self::ItemDropsToFloor { .. } => "item_drops_to_floor",
            Self::PotionBreaks { .. } => "potion_breaks",
        }
    }
}
