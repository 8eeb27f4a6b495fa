//! Passive aging: what happens to every individual on every tick, whether
//! or not it acts.
//!
//! In order: hitpoints and mana regenerate, poison bites, an air elemental
//! may fling something it carries, due status effects and ability cooldowns
//! expire, and finally the individual's knowledge is refreshed, which also
//! prunes stale placeholders.

use delve_types::{DIRECTIONS, StatusEffect, StatusEffectId, StatusKind, ThingId};
use delve_world::random::choose;
use delve_world::{Thing, World};
use tracing::debug;

use crate::actions::effects::{POISON_PERIOD, die, hurt, lose_status};
use crate::actions::handlers::execute_throw;
use crate::context::StepContext;
use crate::error::CoreError;
use crate::perception::refresh_knowledge;

/// Ticks between regenerated hitpoints.
pub const HP_REGEN_PERIOD: i64 = 84;

/// Ticks between regenerated points of mana.
pub const MP_REGEN_PERIOD: i64 = 120;

/// An auto-thrower flings something with probability `1 / AUTO_THROW_CHANCE`
/// per tick.
pub const AUTO_THROW_CHANCE: u32 = 60;

/// Age one individual by one tick. Things that are not living individuals
/// are left alone.
///
/// # Errors
///
/// Propagates world, draw, and perception failures.
pub fn age_individual(ctx: &mut StepContext<'_>, id: ThingId) -> Result<(), CoreError> {
    if !ctx.world.get(id).is_some_and(Thing::is_alive_individual) {
        return Ok(());
    }
    let now = ctx.world.time();
    regenerate(ctx.world, id, now)?;
    if poison_bites(ctx, id, now)? {
        return Ok(());
    }
    auto_throw(ctx, id)?;
    let expired = expire_statuses(ctx, id, now)?;
    let thing = ctx.world.thing_mut(id)?;
    if let Some(life) = thing.life_mut() {
        life.ability_cooldowns.retain(|c| c.expiration_time > now);
    }
    refresh_knowledge(ctx, id, expired)
}

// ---------------------------------------------------------------------------
// Regeneration
// ---------------------------------------------------------------------------

fn regenerate(world: &mut World, id: ThingId, now: i64) -> Result<(), CoreError> {
    let thing = world.thing_mut(id)?;
    let max_hitpoints = thing.max_hitpoints();
    let max_mana = thing.max_mana();
    if let Some(life) = thing.life_mut() {
        regenerate_pool(
            &mut life.hitpoints,
            &mut life.hp_regen_deadline,
            max_hitpoints,
            now,
            HP_REGEN_PERIOD,
        );
        regenerate_pool(
            &mut life.mana,
            &mut life.mp_regen_deadline,
            max_mana,
            now,
            MP_REGEN_PERIOD,
        );
    }
    Ok(())
}

/// A full pool keeps pushing its deadline ahead, so the first point comes
/// one full period after the pool was first drawn down.
const fn regenerate_pool(value: &mut i32, deadline: &mut i64, max: i32, now: i64, period: i64) {
    if *value >= max {
        *deadline = now.saturating_add(period);
    } else if now >= *deadline {
        *value = value.saturating_add(1);
        *deadline = now.saturating_add(period);
    }
}

// ---------------------------------------------------------------------------
// Poison
// ---------------------------------------------------------------------------

/// Returns whether the poison killed.
fn poison_bites(ctx: &mut StepContext<'_>, id: ThingId, now: i64) -> Result<bool, CoreError> {
    let thing = ctx.world.thing_mut(id)?;
    let Some(effect) = thing.status_mut(StatusEffectId::Poison) else {
        return Ok(false);
    };
    let StatusKind::Poison {
        next_damage_time,
        who_is_responsible,
    } = &mut effect.kind
    else {
        return Ok(false);
    };
    if *next_damage_time > now {
        return Ok(false);
    }
    *next_damage_time = next_damage_time.saturating_add(POISON_PERIOD);
    let responsible = *who_is_responsible;
    if !hurt(ctx.world, id, 1)? {
        return Ok(false);
    }
    // Credit only goes to someone still alive; ids are never reused.
    let killer = responsible.filter(|r| ctx.world.get(*r).is_some_and(Thing::is_alive_individual));
    debug!(tick = now, thing_id = %id, "Poison was lethal");
    die(ctx, id, killer, true)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Auto-throw
// ---------------------------------------------------------------------------

fn auto_throw(ctx: &mut StepContext<'_>, id: ThingId) -> Result<(), CoreError> {
    let throws = ctx
        .world
        .thing(id)?
        .physical_species_data()
        .is_some_and(|row| row.auto_throws_items);
    if !throws {
        return Ok(());
    }
    let carried = ctx.world.inventory_of(id);
    if carried.is_empty() || !ctx.rng.one_in(AUTO_THROW_CHANCE, "auto_throw")? {
        return Ok(());
    }
    let Some(item) = choose(&mut *ctx.rng, &carried, "auto_throw_item")? else {
        return Ok(());
    };
    let Some(direction) = choose(&mut *ctx.rng, &DIRECTIONS, "auto_throw_direction")? else {
        return Ok(());
    };
    execute_throw(ctx, id, item, direction)
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

/// Lose every status whose time is up. Returns whether anything expired.
fn expire_statuses(ctx: &mut StepContext<'_>, id: ThingId, now: i64) -> Result<bool, CoreError> {
    let due: Vec<StatusEffectId> = ctx
        .world
        .thing(id)?
        .status_effects
        .iter()
        .filter(|effect| effect.expiration_time <= now)
        .map(StatusEffect::id)
        .collect();
    if due.is_empty() {
        return Ok(false);
    }
    for status in due {
        lose_status(ctx, id, status)?;
    }
    // Turning back from a sturdier species can leave too many hitpoints.
    let thing = ctx.world.thing_mut(id)?;
    let max_hitpoints = thing.max_hitpoints();
    if let Some(life) = thing.life_mut() {
        life.hitpoints = life.hitpoints.min(max_hitpoints);
    }
    Ok(true)
}
