//! Execution handlers for actions.
//!
//! Each handler assumes the action has already passed the validation
//! pipeline. It mutates the world through the [`StepContext`] and publishes
//! an event for every state change as it happens, so observers always see
//! the world as it was at the moment of each event.
//!
//! Costs are not charged here; the scheduler charges them after the
//! handler returns.

use std::collections::BTreeSet;

use delve_types::{
    AbilityId, Action, BookKind, Coord, DIRECTIONS, DecisionMakerType, Event, SpeciesId,
    StatusEffectId, StatusKind, ThingId, ThingSignature, TileType, WandKind, WeaponKind,
};
use delve_world::map::generate_level;
use delve_world::random::choose;
use delve_world::spawn::{create_item, populate_level, random_spawn_location, spawn_individual};
use delve_world::thing::level_to_experience;
use delve_world::{AbilityCooldown, Location, ThingKind, WorldError};
use tracing::{debug, info};

use crate::context::StepContext;
use crate::error::CoreError;
use crate::vision::compute_vision;

use super::effects::{
    ABILITY_COOLDOWN, POISON_PERIOD, ability_status, apply_potion, apply_wand, destroy_item, die,
    gain_status, hurt, predict_potion, predict_wand,
};

/// Farthest a magic bullet flies.
pub const MAGIC_BULLET_RANGE: i32 = 10;

/// Farthest an ability reaches.
pub const ABILITY_RANGE: i32 = 8;

/// Execute a validated action.
///
/// # Errors
///
/// Propagates world, draw, and perception failures. Gameplay outcomes are
/// never errors.
pub fn execute_action(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    action: Action,
) -> Result<(), CoreError> {
    debug!(tick = ctx.world.time(), thing_id = %actor, action = action.name(), "Executing action");
    match action {
        Action::Move(direction) => execute_move(ctx, actor, direction),
        Action::Wait => Ok(()),
        Action::Attack(direction) => execute_attack(ctx, actor, direction),
        Action::Zap { item, direction } => execute_zap(ctx, actor, item, direction),
        Action::PickUp(item) => execute_pick_up(ctx, actor, item),
        Action::Drop(item) => execute_drop(ctx, actor, item),
        Action::Quaff(item) => execute_quaff(ctx, actor, item),
        Action::ReadBook { item, direction } => execute_read_book(ctx, actor, item, direction),
        Action::Throw { item, direction } => execute_throw(ctx, actor, item, direction),
        Action::GoDown | Action::CheatGoDown => execute_go_down(ctx, actor),
        Action::Ability { ability, direction } => execute_ability(ctx, actor, ability, direction),
        Action::CheatHealth => execute_cheat_health(ctx, actor),
        Action::CheatKill(target) => die(ctx, target, None, true),
        Action::CheatPolymorph(species) => execute_cheat_polymorph(ctx, actor, species),
        Action::CheatGenerateMonster {
            species,
            decision_maker,
            location,
        } => execute_cheat_generate_monster(ctx, species, decision_maker, location),
        Action::CheatWish(signature) => execute_cheat_wish(ctx, actor, signature),
        Action::CheatIdentify => execute_cheat_identify(ctx, actor),
        Action::CheatGainLevel => execute_cheat_gain_level(ctx, actor),
    }
}

fn position(ctx: &StepContext<'_>, actor: ThingId) -> Result<Coord, CoreError> {
    Ok(ctx
        .world
        .coord_of(actor)
        .ok_or(WorldError::ThingNotFound(actor))?)
}

/// Half the time, a confused individual goes a random way instead.
fn confused_direction(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    direction: Coord,
) -> Result<Coord, CoreError> {
    let confused = ctx.world.thing(actor)?.has_status(StatusEffectId::Confusion);
    if !confused || !ctx.rng.one_in(2, "confusion")? {
        return Ok(direction);
    }
    Ok(choose(&mut *ctx.rng, &DIRECTIONS, "confusion_direction")?.unwrap_or(direction))
}

/// The first individual along a line, within `range` steps, stopping at walls.
fn first_individual_in_line(
    ctx: &StepContext<'_>,
    from: Coord,
    direction: Coord,
    range: i32,
) -> Option<(ThingId, Coord)> {
    let mut cursor = from;
    for _ in 0..range {
        cursor = cursor + direction;
        if !ctx.world.tile(cursor).is_open_space() {
            return None;
        }
        if let Some(target) = ctx.world.individual_at(cursor) {
            return Some((target.id, cursor));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Movement and melee
// ---------------------------------------------------------------------------

/// Step in a direction. Walls and individuals in the way become bumps.
///
/// # Errors
///
/// Propagates world, draw, and perception failures.
pub fn execute_move(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    direction: Coord,
) -> Result<(), CoreError> {
    let direction = confused_direction(ctx, actor, direction)?;
    let from = position(ctx, actor)?;
    let to = from + direction;
    if !ctx.world.tile(to).is_open_space() {
        return ctx.publish(Event::BumpIntoLocation {
            actor,
            location: to,
        });
    }
    if let Some(target) = ctx.world.individual_at(to).map(|t| t.id) {
        return ctx.publish(Event::BumpIntoIndividual { actor, target });
    }
    ctx.world.place_standing(actor, to)?;
    compute_vision(ctx.world, actor)?;
    ctx.publish(Event::Move { actor, from, to })?;

    let sucks_up = ctx
        .world
        .thing(actor)?
        .physical_species_data()
        .is_some_and(|row| row.sucks_up_items);
    if sucks_up {
        for item in ctx.world.items_at(to) {
            ctx.world.place_in_inventory(item, actor)?;
            ctx.publish(Event::SuckUp {
                actor,
                item,
                location: to,
            })?;
        }
    }
    Ok(())
}

/// Melee in a direction.
///
/// # Errors
///
/// Propagates world, draw, and perception failures.
pub fn execute_attack(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    direction: Coord,
) -> Result<(), CoreError> {
    let direction = confused_direction(ctx, actor, direction)?;
    let location = position(ctx, actor)? + direction;
    let Some(target) = ctx.world.individual_at(location).map(|t| t.id) else {
        return ctx.publish(Event::AttackLocation { actor, location });
    };
    let attacker = ctx.world.thing(actor)?;
    let damage = attacker.attack_power();
    let poisons = attacker
        .physical_species_data()
        .is_some_and(|row| row.poison_attack);
    if hurt(ctx.world, target, damage)? {
        ctx.publish(Event::MeleeKill { actor, target })?;
        return die(ctx, target, Some(actor), false);
    }
    ctx.publish(Event::AttackIndividual { actor, target })?;
    if poisons {
        let next_damage_time = ctx.world.time().saturating_add(POISON_PERIOD);
        gain_status(
            ctx,
            target,
            StatusKind::Poison {
                next_damage_time,
                who_is_responsible: Some(actor),
            },
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Zap a wand. Empty wands sputter, and a sputtered wand may crumble.
///
/// # Errors
///
/// Propagates world, draw, and perception failures.
pub fn execute_zap(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    item: ThingId,
    direction: Coord,
) -> Result<(), CoreError> {
    let location = position(ctx, actor)?;
    let ThingKind::Wand(info) = &mut ctx.world.thing_mut(item)?.kind else {
        return Err(WorldError::NotAnItem(item).into());
    };
    let kind = info.kind;
    if info.charges > 0 {
        info.charges = info.charges.saturating_sub(1);
        ctx.publish(Event::ZapWand {
            actor,
            item,
            location,
        })?;
        let outcome = fire_beam(ctx, actor, location, direction, kind);
        ctx.end_zap();
        return outcome;
    }
    let sputtered_before = info.charges < 0;
    info.charges = -1;
    if sputtered_before && ctx.rng.one_in(2, "wand_disintegrates")? {
        ctx.publish(Event::WandDisintegrates { actor, item })?;
        info!(tick = ctx.world.time(), thing_id = %item, "Wand disintegrated");
        return destroy_item(ctx.world, item);
    }
    ctx.publish(Event::ZapWandNoCharges { actor, item })
}

/// Send a beam down a line. Beams pass through individuals and stop at the
/// first wall they cannot dig.
fn fire_beam(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    from: Coord,
    direction: Coord,
    kind: WandKind,
) -> Result<(), CoreError> {
    let range = ctx.rng.random_range(7, 14, "beam_length")?;
    let mut cursor = from;
    for _ in 0..range {
        cursor = cursor + direction;
        let tile_type = ctx.world.tile(cursor).tile_type;
        if !tile_type.is_open_space() {
            if kind == WandKind::Digging && tile_type.is_diggable() {
                ctx.world.set_tile_type(cursor, TileType::DirtFloor)?;
                ctx.publish(Event::BeamHitWall {
                    location: cursor,
                    effect: Some(WandKind::Digging),
                })?;
                continue;
            }
            return ctx.publish(Event::BeamHitWall {
                location: cursor,
                effect: None,
            });
        }
        if kind == WandKind::Digging {
            continue;
        }
        let Some(target) = ctx.world.individual_at(cursor).map(|t| t.id) else {
            continue;
        };
        let effect = predict_wand(ctx.world, target, kind);
        ctx.publish(Event::BeamHitIndividual {
            target,
            location: cursor,
            effect,
        })?;
        apply_wand(ctx, actor, target, kind)?;
    }
    Ok(())
}

/// Pick up an item lying underfoot.
///
/// # Errors
///
/// Propagates world and perception failures.
pub fn execute_pick_up(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    item: ThingId,
) -> Result<(), CoreError> {
    let location = position(ctx, actor)?;
    ctx.world.place_in_inventory(item, actor)?;
    ctx.publish(Event::PickUp {
        actor,
        item,
        location,
    })
}

/// Drop a carried item underfoot.
///
/// # Errors
///
/// Propagates world and perception failures.
pub fn execute_drop(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    item: ThingId,
) -> Result<(), CoreError> {
    let location = position(ctx, actor)?;
    ctx.world.place_on_floor(item, location)?;
    ctx.publish(Event::DropItem {
        actor,
        item,
        location,
    })
}

/// Drink a carried potion.
///
/// # Errors
///
/// Propagates world and perception failures.
pub fn execute_quaff(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    item: ThingId,
) -> Result<(), CoreError> {
    let location = position(ctx, actor)?;
    let ThingKind::Potion(kind) = ctx.world.thing(item)?.kind else {
        return Err(WorldError::NotAnItem(item).into());
    };
    let effect = predict_potion(ctx.world, actor, kind);
    ctx.publish(Event::QuaffPotion {
        actor,
        item,
        location,
        effect,
    })?;
    destroy_item(ctx.world, item)?;
    apply_potion(ctx, actor, kind, None)
}

/// Mana a spell takes.
const fn spell_cost(kind: BookKind) -> i32 {
    match kind {
        BookKind::MagicBullet => 1,
        BookKind::Speed => 2,
    }
}

/// Cast the spell in a carried book. Without enough mana nothing happens.
///
/// # Errors
///
/// Propagates world, draw, and perception failures.
pub fn execute_read_book(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    item: ThingId,
    direction: Coord,
) -> Result<(), CoreError> {
    let ThingKind::Book(kind) = ctx.world.thing(item)?.kind else {
        return Err(WorldError::NotAnItem(item).into());
    };
    let life = ctx
        .world
        .thing_mut(actor)?
        .life_mut()
        .ok_or(WorldError::NotAnIndividual(actor))?;
    let cost = spell_cost(kind);
    if life.mana < cost {
        return ctx.publish(Event::ReadBook {
            actor,
            item,
            effect: None,
        });
    }
    life.mana = life.mana.saturating_sub(cost);
    ctx.publish(Event::ReadBook {
        actor,
        item,
        effect: Some(kind),
    })?;
    match kind {
        BookKind::Speed => {
            gain_status(ctx, actor, StatusKind::Speed)?;
        }
        BookKind::MagicBullet => {
            let from = position(ctx, actor)?;
            if let Some((target, location)) =
                first_individual_in_line(ctx, from, direction, MAGIC_BULLET_RANGE)
            {
                ctx.publish(Event::MagicBulletHit { target, location })?;
                let damage = ctx.rng.random_range(2, 5, "magic_bullet_damage")?;
                if hurt(ctx.world, target, damage)? {
                    die(ctx, target, Some(actor), true)?;
                }
            }
        }
    }
    Ok(())
}

/// Damage a thrown item does to whoever it hits.
const fn thrown_damage(kind: &ThingKind) -> i32 {
    match kind {
        ThingKind::Weapon(WeaponKind::Dagger) => 2,
        ThingKind::Weapon(WeaponKind::Battleaxe) => 4,
        _ => 1,
    }
}

/// Throw a carried item. It flies until it hits a wall or an individual,
/// or runs out of range, then lands. Potions shatter where they land.
///
/// # Errors
///
/// Propagates world, draw, and perception failures.
pub fn execute_throw(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    item: ThingId,
    direction: Coord,
) -> Result<(), CoreError> {
    let from = position(ctx, actor)?;
    ctx.publish(Event::ThrowItem {
        actor,
        item,
        location: from,
    })?;
    ctx.world.detach(item)?;
    let kind = ctx.world.thing(item)?.kind.clone();
    let range = ctx.rng.random_range(4, 8, "throw_range")?;

    let mut landing = from;
    let mut target = None;
    for _ in 0..range {
        let next = landing + direction;
        if !ctx.world.tile(next).is_open_space() {
            if !matches!(kind, ThingKind::Potion(_)) {
                ctx.publish(Event::ItemHitsWall {
                    item,
                    location: next,
                })?;
            }
            break;
        }
        landing = next;
        if let Some(hit) = ctx.world.individual_at(next).map(|t| t.id) {
            target = Some(hit);
            break;
        }
    }

    if let ThingKind::Potion(potion) = kind {
        let effect = target.and_then(|t| predict_potion(ctx.world, t, potion));
        ctx.publish(Event::PotionBreaks {
            item,
            location: landing,
            target,
            effect,
        })?;
        destroy_item(ctx.world, item)?;
        if let Some(target) = target {
            apply_potion(ctx, target, potion, Some(actor))?;
        }
        return Ok(());
    }

    if let Some(target) = target {
        ctx.publish(Event::ItemHitsIndividual {
            item,
            target,
            location: landing,
        })?;
        if hurt(ctx.world, target, thrown_damage(&kind))? {
            die(ctx, target, Some(actor), true)?;
        }
    }
    ctx.world.place_on_floor(item, landing)?;
    ctx.publish(Event::ItemDropsToFloor {
        item,
        location: landing,
    })
}

// ---------------------------------------------------------------------------
// Stairs and abilities
// ---------------------------------------------------------------------------

/// Descend to a freshly generated level, taking only what the actor carries.
///
/// # Errors
///
/// Propagates generation, world, draw, and perception failures.
pub fn execute_go_down(ctx: &mut StepContext<'_>, actor: ThingId) -> Result<(), CoreError> {
    let dungeon_level = ctx.world.dungeon_level().saturating_add(1);
    let level = generate_level(&mut *ctx.rng, dungeon_level)?;

    let left_behind: Vec<ThingId> = ctx
        .world
        .things()
        .filter(|t| t.id != actor && t.location.container().is_none())
        .map(|t| t.id)
        .collect();
    for id in left_behind {
        ctx.world.remove(id)?;
    }
    let kept: BTreeSet<ThingId> = ctx.world.things().map(|t| t.id).collect();

    ctx.world.replace_level(level, dungeon_level);
    let start = random_spawn_location(ctx.world, &mut *ctx.rng, None)?;
    ctx.world.place_standing(actor, start)?;
    let life = ctx
        .world
        .thing_mut(actor)?
        .life_mut()
        .ok_or(WorldError::NotAnIndividual(actor))?;
    life.knowledge.reset_map();
    life.knowledge
        .perceived_things
        .retain(|id, _| kept.contains(id));
    compute_vision(ctx.world, actor)?;
    info!(tick = ctx.world.time(), dungeon_level, "Descended to a new level");

    let spawned = populate_level(
        ctx.world,
        &mut *ctx.rng,
        ctx.config.items_per_level,
        ctx.config.warm_up_monsters,
    )?;
    for individual in spawned {
        compute_vision(ctx.world, individual)?;
        ctx.publish(Event::Appear { individual })?;
    }
    Ok(())
}

/// Use an innate ability on the first individual in line.
///
/// # Errors
///
/// Propagates world and perception failures.
pub fn execute_ability(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    ability: AbilityId,
    direction: Coord,
) -> Result<(), CoreError> {
    let location = position(ctx, actor)?;
    let expiration_time = ctx.world.time().saturating_add(ABILITY_COOLDOWN);
    let life = ctx
        .world
        .thing_mut(actor)?
        .life_mut()
        .ok_or(WorldError::NotAnIndividual(actor))?;
    life.ability_cooldowns.push(AbilityCooldown {
        ability,
        expiration_time,
    });
    life.ability_cooldowns.sort_by_key(|cooldown| cooldown.ability);
    ctx.publish(Event::UseAbility {
        actor,
        ability,
        location,
    })?;
    if let Some((target, _)) = first_individual_in_line(ctx, location, direction, ABILITY_RANGE) {
        gain_status(ctx, target, ability_status(ability))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Cheats
// ---------------------------------------------------------------------------

fn execute_cheat_health(ctx: &mut StepContext<'_>, actor: ThingId) -> Result<(), CoreError> {
    let thing = ctx.world.thing_mut(actor)?;
    let max = thing.max_hitpoints();
    if let Some(life) = thing.life_mut() {
        life.hitpoints = max;
    }
    Ok(())
}

fn execute_cheat_polymorph(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    species: SpeciesId,
) -> Result<(), CoreError> {
    let thing = ctx.world.thing_mut(actor)?;
    thing.remove_status(StatusEffectId::Polymorph);
    if let Some(life) = thing.life_mut() {
        life.original_species = species;
    }
    compute_vision(ctx.world, actor)?;
    ctx.publish(Event::Polymorph {
        individual: actor,
        new_species: species,
    })
}

fn execute_cheat_generate_monster(
    ctx: &mut StepContext<'_>,
    species: SpeciesId,
    decision_maker: DecisionMakerType,
    location: Coord,
) -> Result<(), CoreError> {
    let individual = spawn_individual(
        ctx.world,
        &mut *ctx.rng,
        species,
        decision_maker,
        location,
    )?;
    compute_vision(ctx.world, individual)?;
    ctx.publish(Event::Appear { individual })
}

fn execute_cheat_wish(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    signature: ThingSignature,
) -> Result<(), CoreError> {
    let item = create_item(ctx.world, &mut *ctx.rng, signature, Location::Nowhere)?;
    ctx.world.place_in_inventory(item, actor)?;
    Ok(())
}

fn execute_cheat_identify(ctx: &mut StepContext<'_>, actor: ThingId) -> Result<(), CoreError> {
    let identities = ctx.world.identities().clone();
    let life = ctx
        .world
        .thing_mut(actor)?
        .life_mut()
        .ok_or(WorldError::NotAnIndividual(actor))?;
    for kind in WandKind::ALL {
        life.knowledge
            .identify_wand(identities.wand_description(*kind), *kind);
    }
    for kind in delve_types::PotionKind::ALL {
        life.knowledge
            .identify_potion(identities.potion_description(*kind), *kind);
    }
    for kind in BookKind::ALL {
        life.knowledge
            .identify_book(identities.book_description(*kind), *kind);
    }
    Ok(())
}

fn execute_cheat_gain_level(ctx: &mut StepContext<'_>, actor: ThingId) -> Result<(), CoreError> {
    let thing = ctx.world.thing_mut(actor)?;
    let next = level_to_experience(thing.experience_level().saturating_add(1));
    if let Some(life) = thing.life_mut() {
        life.experience = life.experience.max(next);
    }
    ctx.publish(Event::LevelUp { individual: actor })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_types::{PotionKind, VisionTypes};
    use delve_world::map::test_level;
    use delve_world::{ItemIdentities, SeededRandom, World};

    use super::*;
    use crate::config::WorldConfig;
    use crate::perception::refresh_all;

    struct Fixture {
        world: World,
        rng: SeededRandom,
        config: WorldConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(test_level(0), ItemIdentities::identity(), 0),
                rng: SeededRandom::test_mode(),
                config: WorldConfig::default(),
            }
        }

        fn spawn(&mut self, species: SpeciesId, at: Coord) -> ThingId {
            let id = spawn_individual(
                &mut self.world,
                &mut self.rng,
                species,
                DecisionMakerType::Ai,
                at,
            )
            .unwrap();
            if self.world.you().is_none() {
                self.world.set_you(id);
            }
            id
        }

        fn give(&mut self, owner: ThingId, signature: ThingSignature) -> ThingId {
            let item = create_item(&mut self.world, &mut self.rng, signature, Location::Nowhere)
                .unwrap();
            self.world.place_in_inventory(item, owner).unwrap();
            item
        }

        fn act(&mut self, actor: ThingId, action: Action) {
            let mut ctx = StepContext::new(&mut self.world, &mut self.rng, &self.config);
            refresh_all(&mut ctx, true).unwrap();
            execute_action(&mut ctx, actor, action).unwrap();
            refresh_all(&mut ctx, true).unwrap();
        }

        fn sentences(&self, id: ThingId) -> Vec<String> {
            self.world
                .thing(id)
                .unwrap()
                .life()
                .unwrap()
                .knowledge
                .narration
                .sentences()
                .map(str::to_owned)
                .collect()
        }
    }

    #[test]
    fn moving_into_a_wall_is_a_bump() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(1, 1));
        fx.act(hero, Action::Move(Coord::new(-1, 0)));
        assert_eq!(fx.world.coord_of(hero), Some(Coord::new(1, 1)));
        assert_eq!(fx.sentences(hero), vec!["You bump into a wall.".to_owned()]);
        fx.act(hero, Action::Move(Coord::new(1, 0)));
        assert_eq!(fx.world.coord_of(hero), Some(Coord::new(2, 1)));
    }

    #[test]
    fn blobs_suck_up_what_they_walk_over() {
        let mut fx = Fixture::new();
        let blob = fx.spawn(SpeciesId::PinkBlob, Coord::new(5, 5));
        let dagger = create_item(
            &mut fx.world,
            &mut fx.rng,
            ThingSignature::Weapon(WeaponKind::Dagger),
            Location::Floor {
                coord: Coord::new(6, 5),
                z_order: 0,
            },
        )
        .unwrap();
        fx.act(blob, Action::Move(Coord::new(1, 0)));
        assert_eq!(fx.world.inventory_of(blob), vec![dagger]);
    }

    #[test]
    fn melee_kills_grant_experience() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let ant = fx.spawn(SpeciesId::Ant, Coord::new(6, 5));
        fx.act(hero, Action::Attack(Coord::new(1, 0)));
        assert!(!fx.world.thing(ant).unwrap().still_exists);
        assert_eq!(fx.world.thing(hero).unwrap().life().unwrap().experience, 1);
        assert_eq!(fx.sentences(hero), vec!["You kill an ant.".to_owned()]);
        fx.act(hero, Action::Attack(Coord::new(0, 1)));
        assert_eq!(
            fx.sentences(hero).last().map(String::as_str),
            Some("You attack thin air.")
        );
    }

    #[test]
    fn scorpions_poison_what_they_sting() {
        let mut fx = Fixture::new();
        let scorpion = fx.spawn(SpeciesId::Scorpion, Coord::new(5, 5));
        let ogre = fx.spawn(SpeciesId::Ogre, Coord::new(6, 5));
        fx.act(scorpion, Action::Attack(Coord::new(1, 0)));
        let poison = fx.world.thing(ogre).unwrap().status(StatusEffectId::Poison).copied();
        assert!(matches!(
            poison.map(|p| p.kind),
            Some(StatusKind::Poison { who_is_responsible: Some(who), .. }) if who == scorpion
        ));
    }

    #[test]
    fn empty_wands_sputter_then_crumble() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let wand = fx.give(hero, ThingSignature::Wand(Some(WandKind::Speed)));
        if let ThingKind::Wand(info) = &mut fx.world.thing_mut(wand).unwrap().kind {
            info.charges = 0;
        }
        let zap = Action::Zap {
            item: wand,
            direction: Coord::new(1, 0),
        };
        fx.act(hero, zap);
        assert!(matches!(
            fx.world.thing(wand).unwrap().kind,
            ThingKind::Wand(info) if info.charges == -1
        ));
        assert_eq!(
            fx.sentences(hero),
            vec!["You zap a copper wand, but it just sputters.".to_owned()]
        );
        // Keep zapping until the coin flip comes up.
        for _ in 0..64 {
            if !fx.world.thing(wand).unwrap().still_exists {
                break;
            }
            fx.act(hero, zap);
        }
        assert!(!fx.world.thing(wand).unwrap().still_exists);
        assert_eq!(
            fx.sentences(hero).last().map(String::as_str),
            Some("A copper wand disintegrates.")
        );
    }

    #[test]
    fn digging_beams_open_brick_but_not_the_border() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        fx.world.set_tile_type(Coord::new(4, 5), TileType::GrayBrickWall).unwrap();
        let wand = fx.give(hero, ThingSignature::Wand(Some(WandKind::Digging)));
        fx.act(
            hero,
            Action::Zap {
                item: wand,
                direction: Coord::new(-1, 0),
            },
        );
        assert_eq!(fx.world.tile(Coord::new(4, 5)).tile_type, TileType::DirtFloor);
        assert_eq!(fx.world.tile(Coord::new(0, 5)).tile_type, TileType::BorderWall);
        let knowledge = &fx.world.thing(hero).unwrap().life().unwrap().knowledge;
        assert_eq!(
            knowledge.wand_identities.get(&fx.world.identities().wand_description(WandKind::Digging)),
            Some(&WandKind::Digging)
        );
    }

    #[test]
    fn beams_hit_everyone_in_line() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let first = fx.spawn(SpeciesId::Ogre, Coord::new(7, 5));
        let second = fx.spawn(SpeciesId::Ogre, Coord::new(9, 5));
        let wand = fx.give(hero, ThingSignature::Wand(Some(WandKind::Slowing)));
        fx.act(
            hero,
            Action::Zap {
                item: wand,
                direction: Coord::new(1, 0),
            },
        );
        for ogre in [first, second] {
            assert!(fx.world.thing(ogre).unwrap().has_status(StatusEffectId::Slowing));
        }
    }

    #[test]
    fn quaffing_identifies_by_effect() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let potion = fx.give(hero, ThingSignature::Potion(Some(PotionKind::EtherealVision)));
        fx.act(hero, Action::Quaff(potion));
        assert!(!fx.world.thing(potion).unwrap().still_exists);
        let thing = fx.world.thing(hero).unwrap();
        assert!(thing.has_status(StatusEffectId::EtherealVision));
        let knowledge = &thing.life().unwrap().knowledge;
        assert!(knowledge.vision_at(Coord::new(5, 9)).contains(VisionTypes::ETHEREAL));
        assert_eq!(
            fx.sentences(hero),
            vec![
                "You drink a red potion.".to_owned(),
                "You gain ethereal vision!".to_owned()
            ]
        );
    }

    #[test]
    fn spells_need_mana() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let book = fx.give(hero, ThingSignature::Book(Some(BookKind::Speed)));
        let read = Action::ReadBook {
            item: book,
            direction: Coord::new(1, 0),
        };
        fx.act(hero, read);
        assert!(fx.world.thing(hero).unwrap().has_status(StatusEffectId::Speed));
        assert_eq!(fx.world.thing(hero).unwrap().life().unwrap().mana, 1);
        fx.act(hero, read);
        assert_eq!(
            fx.sentences(hero).last().map(String::as_str),
            Some("You read a book of speed, but nothing happens.")
        );
    }

    #[test]
    fn thrown_daggers_land_under_their_target() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let ogre = fx.spawn(SpeciesId::Ogre, Coord::new(7, 5));
        let dagger = fx.give(hero, ThingSignature::Weapon(WeaponKind::Dagger));
        fx.act(
            hero,
            Action::Throw {
                item: dagger,
                direction: Coord::new(1, 0),
            },
        );
        assert_eq!(fx.world.items_at(Coord::new(7, 5)), vec![dagger]);
        assert_eq!(fx.world.thing(ogre).unwrap().life().unwrap().hitpoints, 13);
        assert_eq!(
            fx.sentences(hero),
            vec![
                "You throw a dagger.".to_owned(),
                "A dagger hits an ogre.".to_owned(),
                "A dagger drops to the floor.".to_owned()
            ]
        );
    }

    #[test]
    fn thrown_potions_splash() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let ogre = fx.spawn(SpeciesId::Ogre, Coord::new(6, 5));
        let potion = fx.give(hero, ThingSignature::Potion(Some(PotionKind::Blindness)));
        fx.act(
            hero,
            Action::Throw {
                item: potion,
                direction: Coord::new(1, 0),
            },
        );
        assert!(!fx.world.thing(potion).unwrap().still_exists);
        assert!(fx.world.thing(ogre).unwrap().has_status(StatusEffectId::Blindness));
    }

    #[test]
    fn going_down_keeps_only_the_traveller_and_its_pack() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(48, 23));
        let dog = fx.spawn(SpeciesId::Dog, Coord::new(5, 5));
        let wand = fx.give(hero, ThingSignature::Wand(Some(WandKind::Remedy)));
        fx.act(hero, Action::GoDown);
        assert_eq!(fx.world.dungeon_level(), 1);
        assert!(fx.world.get(dog).is_none());
        assert_eq!(fx.world.inventory_of(hero), vec![wand]);
        assert_eq!(fx.world.coord_of(hero), Some(Coord::new(1, 1)));
        let knowledge = &fx.world.thing(hero).unwrap().life().unwrap().knowledge;
        assert!(knowledge.perceived(dog).is_none());
        assert!(knowledge.perceived(wand).is_some());
    }

    #[test]
    fn abilities_cool_down() {
        let mut fx = Fixture::new();
        let cobra = fx.spawn(SpeciesId::Cobra, Coord::new(5, 5));
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 9));
        fx.act(
            cobra,
            Action::Ability {
                ability: AbilityId::SpitBlindingVenom,
                direction: Coord::new(0, 1),
            },
        );
        assert!(fx.world.thing(hero).unwrap().has_status(StatusEffectId::Blindness));
        let life = fx.world.thing(cobra).unwrap().life().unwrap();
        assert!(life.is_cooling_down(AbilityId::SpitBlindingVenom));
    }

    #[test]
    fn wishes_and_identification() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        fx.act(hero, Action::CheatWish(ThingSignature::Potion(Some(PotionKind::Healing))));
        assert_eq!(fx.world.inventory_of(hero).len(), 1);
        fx.act(hero, Action::CheatIdentify);
        let knowledge = &fx.world.thing(hero).unwrap().life().unwrap().knowledge;
        assert_eq!(knowledge.wand_identities.len(), WandKind::ALL.len());
        assert_eq!(knowledge.potion_identities.len(), PotionKind::ALL.len());
        fx.act(hero, Action::CheatGainLevel);
        assert_eq!(fx.world.thing(hero).unwrap().experience_level(), 1);
    }
}
