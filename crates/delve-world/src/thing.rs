//! Things: individuals and items.
//!
//! A [`Thing`] is owned by the [`World`](crate::world::World) arena and
//! referred to everywhere else by its [`ThingId`]. Individuals carry a boxed
//! [`Life`], which includes their private [`Knowledge`].

use delve_types::{
    AbilityId, BookKind, Coord, DecisionMakerType, Initiative, PotionKind, SpeciesId,
    StatusEffect, StatusEffectId, StatusKind, Team, ThingId, ThingSignature, ThingType,
    VisionTypes, WandKind, WeaponKind,
};
use serde::{Deserialize, Serialize};

use crate::knowledge::Knowledge;
use crate::species::{SLOW_MOVEMENT_COST, SPEEDY_MOVEMENT_COST, Species, species};

/// Where a thing is.
///
/// The derived ordering sorts by variant, then by coordinate or container,
/// then by z-order, which is the order piles are listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    /// Not in the world (freshly created, or being deleted).
    Nowhere,
    /// An individual standing on a tile.
    Standing(Coord),
    /// An item lying in a floor pile.
    Floor {
        /// The tile.
        coord: Coord,
        /// Position in the pile, dense from zero.
        z_order: usize,
    },
    /// An item carried by another thing.
    Inventory {
        /// The carrier.
        container: ThingId,
        /// Position in the inventory, dense from zero.
        z_order: usize,
    },
}

impl Location {
    /// The map tile, for standing individuals and floor items.
    pub const fn coord(&self) -> Option<Coord> {
        match self {
            Self::Standing(coord) | Self::Floor { coord, .. } => Some(*coord),
            Self::Nowhere | Self::Inventory { .. } => None,
        }
    }

    /// The carrier, for inventory items.
    pub const fn container(&self) -> Option<ThingId> {
        match self {
            Self::Inventory { container, .. } => Some(*container),
            _ => None,
        }
    }

    /// Position within a pile or inventory.
    pub const fn z_order(&self) -> Option<usize> {
        match self {
            Self::Floor { z_order, .. } | Self::Inventory { z_order, .. } => Some(*z_order),
            _ => None,
        }
    }

    /// The same place with a different z-order. Other variants are unchanged.
    #[must_use]
    pub const fn with_z_order(self, z_order: usize) -> Self {
        match self {
            Self::Floor { coord, .. } => Self::Floor { coord, z_order },
            Self::Inventory { container, .. } => Self::Inventory { container, z_order },
            other => other,
        }
    }
}

/// A pending ability cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilityCooldown {
    /// Which ability.
    pub ability: AbilityId,
    /// Tick at which it can be used again.
    pub expiration_time: i64,
}

/// The mutable part of a wand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WandInfo {
    /// What it really does.
    pub kind: WandKind,
    /// Charges left. `-1` once it has sputtered empty.
    pub charges: i32,
}

/// Everything an individual has that items don't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Life {
    /// Current hitpoints; zero or less means dead.
    pub hitpoints: i32,
    /// Tick of the next hitpoint regeneration.
    pub hp_regen_deadline: i64,
    /// Current mana.
    pub mana: i32,
    /// Tick of the next mana regeneration.
    pub mp_regen_deadline: i64,
    /// Experience points.
    pub experience: i32,
    /// Clock charged by moves.
    pub last_movement_time: i64,
    /// Clock charged by other actions.
    pub last_action_time: i64,
    /// Turn-order key.
    pub initiative: Initiative,
    /// Who decides for this individual.
    pub decision_maker: DecisionMakerType,
    /// Allegiance.
    pub team: Team,
    /// The species it was born as (the mind's species).
    pub original_species: SpeciesId,
    /// Abilities that cannot be used yet, sorted by ability.
    pub ability_cooldowns: Vec<AbilityCooldown>,
    /// The individual's private picture of the world.
    pub knowledge: Knowledge,
}

impl Life {
    /// A newborn at full health and mana.
    pub fn new(
        species_id: SpeciesId,
        decision_maker: DecisionMakerType,
        initiative: Initiative,
    ) -> Self {
        let row = species(species_id);
        let team = match decision_maker {
            DecisionMakerType::Player => Team::Good,
            DecisionMakerType::Ai => Team::Bad,
        };
        Self {
            hitpoints: row.base_hitpoints,
            hp_regen_deadline: 0,
            mana: row.base_mana,
            mp_regen_deadline: 0,
            experience: 0,
            last_movement_time: 0,
            last_action_time: 0,
            initiative,
            decision_maker,
            team,
            original_species: species_id,
            ability_cooldowns: Vec::new(),
            knowledge: Knowledge::new(),
        }
    }

    /// Whether an ability is still cooling down.
    pub fn is_cooling_down(&self, ability: AbilityId) -> bool {
        self.ability_cooldowns.iter().any(|c| c.ability == ability)
    }
}

/// Experience level: `floor(log2(experience))`, and zero for no experience.
pub fn experience_to_level(experience: i32) -> i32 {
    u32::try_from(experience)
        .ok()
        .and_then(u32::checked_ilog2)
        .and_then(|level| i32::try_from(level).ok())
        .unwrap_or(0)
}

/// The least experience that reaches `level`.
pub fn level_to_experience(level: i32) -> i32 {
    u32::try_from(level)
        .ok()
        .and_then(|level| 1_i32.checked_shl(level))
        .unwrap_or(i32::MAX)
}

/// Variant data of a thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThingKind {
    /// A living creature.
    Individual(Box<Life>),
    /// A wand.
    Wand(WandInfo),
    /// A potion.
    Potion(PotionKind),
    /// A book.
    Book(BookKind),
    /// A weapon.
    Weapon(WeaponKind),
}

/// An authoritative entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thing {
    /// Unique, never reused.
    pub id: ThingId,
    /// Variant data.
    pub kind: ThingKind,
    /// Where it is.
    pub location: Location,
    /// Cleared between destruction and removal from the arena.
    pub still_exists: bool,
    /// Active status effects, at most one per [`StatusEffectId`].
    pub status_effects: Vec<StatusEffect>,
}

impl Thing {
    /// A thing that is nowhere yet.
    pub const fn new(id: ThingId, kind: ThingKind) -> Self {
        Self {
            id,
            kind,
            location: Location::Nowhere,
            still_exists: true,
            status_effects: Vec::new(),
        }
    }

    /// The category of this thing.
    pub const fn thing_type(&self) -> ThingType {
        match self.kind {
            ThingKind::Individual(_) => ThingType::Individual,
            ThingKind::Wand(_) => ThingType::Wand,
            ThingKind::Potion(_) => ThingType::Potion,
            ThingKind::Book(_) => ThingType::Book,
            ThingKind::Weapon(_) => ThingType::Weapon,
        }
    }

    /// Whether this is an individual.
    pub const fn is_individual(&self) -> bool {
        matches!(self.kind, ThingKind::Individual(_))
    }

    /// The life of an individual.
    pub fn life(&self) -> Option<&Life> {
        match &self.kind {
            ThingKind::Individual(life) => Some(&**life),
            _ => None,
        }
    }

    /// The life of an individual, mutably.
    pub fn life_mut(&mut self) -> Option<&mut Life> {
        match &mut self.kind {
            ThingKind::Individual(life) => Some(&mut **life),
            _ => None,
        }
    }

    /// The true signature, as a wish or an expectation would name it.
    pub fn signature(&self) -> ThingSignature {
        match &self.kind {
            ThingKind::Individual(life) => {
                ThingSignature::Individual(self.physical_species().unwrap_or(life.original_species))
            }
            ThingKind::Wand(info) => ThingSignature::Wand(Some(info.kind)),
            ThingKind::Potion(kind) => ThingSignature::Potion(Some(*kind)),
            ThingKind::Book(kind) => ThingSignature::Book(Some(*kind)),
            ThingKind::Weapon(kind) => ThingSignature::Weapon(*kind),
        }
    }

    // ---- status effects ----

    /// The effect with this id, if present.
    pub fn status(&self, id: StatusEffectId) -> Option<&StatusEffect> {
        self.status_effects.iter().find(|s| s.id() == id)
    }

    /// The effect with this id, mutably.
    pub fn status_mut(&mut self, id: StatusEffectId) -> Option<&mut StatusEffect> {
        self.status_effects.iter_mut().find(|s| s.id() == id)
    }

    /// Whether the effect is present, whether or not it can apply.
    pub fn has_status_internally(&self, id: StatusEffectId) -> bool {
        self.status(id).is_some()
    }

    /// Whether the effect is present and can apply to this individual.
    pub fn has_status(&self, id: StatusEffectId) -> bool {
        self.can_have_status(id) && self.has_status_internally(id)
    }

    /// Remove an effect. Returns whether it was present.
    pub fn remove_status(&mut self, id: StatusEffectId) -> bool {
        let before = self.status_effects.len();
        self.status_effects.retain(|s| s.id() != id);
        self.status_effects.len() != before
    }

    /// Insert an effect or refresh its expiration and payload.
    pub fn put_status(&mut self, effect: StatusEffect) {
        match self.status_mut(effect.id()) {
            Some(existing) => *existing = effect,
            None => {
                self.status_effects.push(effect);
                self.status_effects.sort_by_key(StatusEffect::id);
            }
        }
    }

    /// Whether a status can have any effect on this individual at all.
    ///
    /// Items never have status effects.
    pub fn can_have_status(&self, id: StatusEffectId) -> bool {
        let (Some(physical), Some(mental)) = (self.physical_species_data(), self.mental_species_data())
        else {
            return false;
        };
        match id {
            StatusEffectId::Confusion => mental.has_mind(),
            StatusEffectId::Speed => physical.movement_cost != SPEEDY_MOVEMENT_COST,
            StatusEffectId::Slowing => physical.movement_cost != SLOW_MOVEMENT_COST,
            StatusEffectId::Blindness => physical.vision.contains(VisionTypes::NORMAL),
            StatusEffectId::EtherealVision => !physical.vision.contains(VisionTypes::ETHEREAL),
            StatusEffectId::Poison => !physical.poison_attack,
            StatusEffectId::Cogniscopy
            | StatusEffectId::Invisibility
            | StatusEffectId::Polymorph => true,
        }
    }

    // ---- species-derived numbers ----

    /// The body's species: the polymorph target if any, otherwise the original.
    pub fn physical_species(&self) -> Option<SpeciesId> {
        let life = self.life()?;
        Some(
            self.status_effects
                .iter()
                .find_map(|s| match s.kind {
                    StatusKind::Polymorph { species } => Some(species),
                    _ => None,
                })
                .unwrap_or(life.original_species),
        )
    }

    /// Row of the body's species.
    pub fn physical_species_data(&self) -> Option<&'static Species> {
        self.physical_species().map(species)
    }

    /// Row of the mind's species.
    pub fn mental_species_data(&self) -> Option<&'static Species> {
        self.life().map(|life| species(life.original_species))
    }

    /// Whether the mind is sentient enough for cogniscopy to sense it.
    pub fn has_mind(&self) -> bool {
        self.mental_species_data().is_some_and(Species::has_mind)
    }

    /// Current experience level.
    pub fn experience_level(&self) -> i32 {
        self.life().map_or(0, |life| experience_to_level(life.experience))
    }

    /// Maximum hitpoints: base plus two per level.
    pub fn max_hitpoints(&self) -> i32 {
        self.physical_species_data().map_or(0, |row| {
            row.base_hitpoints
                .saturating_add(self.experience_level().saturating_mul(2))
        })
    }

    /// Maximum mana: base times one more than the level.
    pub fn max_mana(&self) -> i32 {
        self.mental_species_data().map_or(0, |row| {
            row.base_mana
                .saturating_mul(self.experience_level().saturating_add(1))
        })
    }

    /// Melee damage: base plus half the level, at least one.
    pub fn attack_power(&self) -> i32 {
        self.physical_species_data().map_or(1, |row| {
            row.base_attack_power
                .saturating_add(self.experience_level() / 2)
                .max(1)
        })
    }

    /// Ticks one step costs right now.
    pub fn movement_cost(&self) -> i64 {
        let Some(row) = self.physical_species_data() else {
            return 0;
        };
        let speedy = self.has_status(StatusEffectId::Speed);
        let slow = self.has_status(StatusEffectId::Slowing);
        match (speedy, slow) {
            (true, false) => SPEEDY_MOVEMENT_COST,
            (false, true) => SLOW_MOVEMENT_COST,
            _ => row.movement_cost,
        }
    }

    /// Whether this thing is an individual that is still alive.
    pub fn is_alive_individual(&self) -> bool {
        self.still_exists && self.is_individual()
    }
}
