//! Effects shared by action handlers and passive aging.
//!
//! Status changes publish an event only when the status actually changed:
//! refreshing an effect that is already active, or removing one that never
//! applied, is invisible to everyone.

use delve_types::{
    AbilityId, Event, PotionKind, StatusEffect, StatusEffectId, StatusKind, ThingId, WandKind,
};
use delve_world::World;
use tracing::{debug, info};

use crate::context::StepContext;
use crate::error::CoreError;
use crate::vision::compute_vision;

/// Ticks between points of poison damage.
pub const POISON_PERIOD: i64 = 12;

/// Ticks before a used ability can be used again.
pub const ABILITY_COOLDOWN: i64 = 120;

/// How long a freshly gained status lasts.
pub const fn status_duration(status: StatusEffectId) -> i64 {
    match status {
        StatusEffectId::Confusion
        | StatusEffectId::Blindness
        | StatusEffectId::Poison
        | StatusEffectId::Slowing => 240,
        StatusEffectId::Speed
        | StatusEffectId::EtherealVision
        | StatusEffectId::Cogniscopy
        | StatusEffectId::Invisibility
        | StatusEffectId::Polymorph => 480,
    }
}

const fn affects_vision(status: StatusEffectId) -> bool {
    matches!(
        status,
        StatusEffectId::Blindness | StatusEffectId::EtherealVision | StatusEffectId::Cogniscopy
    )
}

/// Whether gaining `status` would visibly change an individual.
pub fn would_change(world: &World, id: ThingId, status: StatusEffectId) -> bool {
    world.get(id).is_some_and(|thing| {
        thing.is_alive_individual() && thing.can_have_status(status) && !thing.has_status(status)
    })
}

/// The status that undoes `status` instead of stacking with it.
const fn opposite_status(status: StatusEffectId) -> Option<StatusEffectId> {
    match status {
        StatusEffectId::Speed => Some(StatusEffectId::Slowing),
        StatusEffectId::Slowing => Some(StatusEffectId::Speed),
        _ => None,
    }
}

/// Give an individual a status, or refresh its expiration.
///
/// Speed and slowing cancel: gaining one while the other is in effect
/// removes the other instead, so movement cost only changes with an event.
///
/// Returns whether anything changed. Statuses the individual cannot have
/// are ignored.
///
/// # Errors
///
/// Propagates world and perception failures.
pub fn gain_status(ctx: &mut StepContext<'_>, id: ThingId, kind: StatusKind) -> Result<bool, CoreError> {
    let status = kind.id();
    let now = ctx.world.time();
    let thing = ctx.world.thing(id)?;
    if !thing.is_alive_individual() || !thing.can_have_status(status) {
        return Ok(false);
    }
    if let Some(opposite) = opposite_status(status) {
        if lose_status(ctx, id, opposite)? {
            return Ok(true);
        }
    }
    let thing = ctx.world.thing_mut(id)?;
    let changed = !thing.has_status(status);
    thing.put_status(StatusEffect {
        kind,
        expiration_time: now.saturating_add(status_duration(status)),
    });
    if !changed {
        return Ok(false);
    }
    debug!(tick = now, thing_id = %id, status = %status, "Status gained");
    if affects_vision(status) {
        compute_vision(ctx.world, id)?;
    }
    ctx.publish(Event::GainStatus {
        individual: id,
        status,
    })?;
    Ok(true)
}

/// Remove a status. Returns whether it had been in effect.
///
/// Losing a polymorph is announced as turning back into the original
/// species.
///
/// # Errors
///
/// Propagates world and perception failures.
pub fn lose_status(
    ctx: &mut StepContext<'_>,
    id: ThingId,
    status: StatusEffectId,
) -> Result<bool, CoreError> {
    let thing = ctx.world.thing_mut(id)?;
    let was_effective = thing.has_status(status);
    let original = thing.life().map(|life| life.original_species);
    if !thing.remove_status(status) || !was_effective {
        return Ok(false);
    }
    debug!(tick = ctx.world.time(), thing_id = %id, status = %status, "Status lost");
    if affects_vision(status) {
        compute_vision(ctx.world, id)?;
    }
    match (status, original) {
        (StatusEffectId::Polymorph, Some(new_species)) => ctx.publish(Event::Polymorph {
            individual: id,
            new_species,
        })?,
        _ => ctx.publish(Event::LoseStatus {
            individual: id,
            status,
        })?,
    }
    Ok(true)
}

/// Take hitpoints away. Returns whether the blow is lethal.
///
/// # Errors
///
/// Returns a world error if the victim is missing.
pub fn hurt(world: &mut World, victim: ThingId, amount: i32) -> Result<bool, CoreError> {
    let thing = world.thing_mut(victim)?;
    let Some(life) = thing.life_mut() else {
        return Ok(false);
    };
    life.hitpoints = life.hitpoints.saturating_sub(amount);
    Ok(life.hitpoints <= 0)
}

/// Kill an individual.
///
/// The victim drops everything it carries where it stands, and a living
/// killer gains the victim's level plus one in experience. The victim stays
/// in the arena, no longer existing, until the end of the tick.
///
/// # Errors
///
/// Propagates world and perception failures.
pub fn die(
    ctx: &mut StepContext<'_>,
    victim: ThingId,
    killer: Option<ThingId>,
    announce: bool,
) -> Result<(), CoreError> {
    if !ctx.world.thing(victim)?.still_exists {
        return Ok(());
    }
    if announce {
        ctx.publish(Event::Die { individual: victim })?;
    }
    let coord = ctx.world.coord_of(victim);
    let victim_level = ctx.world.thing(victim)?.experience_level();
    ctx.world.thing_mut(victim)?.still_exists = false;
    for item in ctx.world.inventory_of(victim) {
        match coord {
            Some(coord) => ctx.world.place_on_floor(item, coord)?,
            None => ctx.world.detach(item)?,
        }
    }
    info!(tick = ctx.world.time(), thing_id = %victim, "Individual died");

    let Some(killer) = killer.filter(|k| *k != victim) else {
        return Ok(());
    };
    let Some(thing) = ctx.world.get(killer).filter(|t| t.is_alive_individual()) else {
        return Ok(());
    };
    let level_before = thing.experience_level();
    let thing = ctx.world.thing_mut(killer)?;
    if let Some(life) = thing.life_mut() {
        life.experience = life.experience.saturating_add(victim_level.saturating_add(1));
    }
    if thing.experience_level() > level_before {
        info!(thing_id = %killer, level = thing.experience_level(), "Individual leveled up");
        ctx.publish(Event::LevelUp { individual: killer })?;
    }
    Ok(())
}

/// Mark an item destroyed, taking it out of wherever it was.
///
/// # Errors
///
/// Returns a world error if the item is missing.
pub fn destroy_item(world: &mut World, id: ThingId) -> Result<(), CoreError> {
    world.detach(id)?;
    world.thing_mut(id)?.still_exists = false;
    Ok(())
}

// ---------------------------------------------------------------------------
// Potions
// ---------------------------------------------------------------------------

/// The status a potion grants, for potions that grant one.
const fn potion_status(kind: PotionKind, now: i64, responsible: Option<ThingId>) -> Option<StatusKind> {
    Some(match kind {
        PotionKind::Healing => return None,
        PotionKind::Poison => StatusKind::Poison {
            next_damage_time: now.saturating_add(POISON_PERIOD),
            who_is_responsible: responsible,
        },
        PotionKind::EtherealVision => StatusKind::EtherealVision,
        PotionKind::Cogniscopy => StatusKind::Cogniscopy,
        PotionKind::Blindness => StatusKind::Blindness,
        PotionKind::Invisibility => StatusKind::Invisibility,
    })
}

/// The effect a potion will visibly have on `target`, or `None` if it would
/// change nothing.
pub fn predict_potion(world: &World, target: ThingId, kind: PotionKind) -> Option<PotionKind> {
    let thing = world.get(target).filter(|t| t.is_alive_individual())?;
    let visible = match potion_status(kind, 0, None) {
        Some(status) => would_change(world, target, status.id()),
        None => thing
            .life()
            .is_some_and(|life| life.hitpoints < thing.max_hitpoints()),
    };
    visible.then_some(kind)
}

/// Apply a potion's effect to an individual.
///
/// # Errors
///
/// Propagates world and perception failures.
pub fn apply_potion(
    ctx: &mut StepContext<'_>,
    target: ThingId,
    kind: PotionKind,
    responsible: Option<ThingId>,
) -> Result<(), CoreError> {
    if !ctx.world.get(target).is_some_and(|t| t.is_alive_individual()) {
        return Ok(());
    }
    match potion_status(kind, ctx.world.time(), responsible) {
        Some(status) => {
            gain_status(ctx, target, status)?;
        }
        None => {
            let thing = ctx.world.thing_mut(target)?;
            let max = thing.max_hitpoints();
            if let Some(life) = thing.life_mut() {
                life.hitpoints = max;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Wands and abilities
// ---------------------------------------------------------------------------

const REMEDIED: [StatusEffectId; 4] = [
    StatusEffectId::Confusion,
    StatusEffectId::Blindness,
    StatusEffectId::Poison,
    StatusEffectId::Slowing,
];

const fn wand_status(kind: WandKind) -> Option<StatusKind> {
    match kind {
        WandKind::Confusion => Some(StatusKind::Confusion),
        WandKind::Speed => Some(StatusKind::Speed),
        WandKind::Blinding => Some(StatusKind::Blindness),
        WandKind::Slowing => Some(StatusKind::Slowing),
        WandKind::Invisibility => Some(StatusKind::Invisibility),
        WandKind::Digging | WandKind::Striking | WandKind::Remedy => None,
    }
}

/// The effect a beam will visibly have on an individual it hits.
pub fn predict_wand(world: &World, target: ThingId, kind: WandKind) -> Option<WandKind> {
    let thing = world.get(target).filter(|t| t.is_alive_individual())?;
    let visible = match kind {
        WandKind::Striking => true,
        WandKind::Digging => false,
        WandKind::Remedy => REMEDIED.iter().any(|status| thing.has_status(*status)),
        other => wand_status(other).is_some_and(|status| would_change(world, target, status.id())),
    };
    visible.then_some(kind)
}

/// Apply a beam's effect to an individual it hit.
///
/// # Errors
///
/// Propagates world, draw, and perception failures.
pub fn apply_wand(
    ctx: &mut StepContext<'_>,
    actor: ThingId,
    target: ThingId,
    kind: WandKind,
) -> Result<(), CoreError> {
    match kind {
        WandKind::Striking => {
            let damage = ctx.rng.random_range(2, 6, "striking_damage")?;
            if hurt(ctx.world, target, damage)? {
                die(ctx, target, Some(actor), true)?;
            }
        }
        WandKind::Remedy => {
            for status in REMEDIED {
                lose_status(ctx, target, status)?;
            }
        }
        WandKind::Digging => {}
        other => {
            if let Some(status) = wand_status(other) {
                gain_status(ctx, target, status)?;
            }
        }
    }
    Ok(())
}

/// The status an ability inflicts on whoever it hits.
pub const fn ability_status(ability: AbilityId) -> StatusKind {
    match ability {
        AbilityId::SpitBlindingVenom => StatusKind::Blindness,
        AbilityId::ThrowTar => StatusKind::Slowing,
    }
}
