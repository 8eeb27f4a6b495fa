//! Time costs of actions.
//!
//! Every individual keeps two clocks. `last_action_time + ACTION_COST` and
//! `last_movement_time + movement_cost` both equal the tick at which the
//! individual may act again, so either clock answers "is it poised?". A move
//! costs the current movement cost, any other action costs [`ACTION_COST`],
//! and a wait costs whichever of the two is cheaper.
//!
//! Cheats cost nothing.

use delve_types::Action;
use delve_world::{ACTION_COST, Life, Thing};

/// Whether an individual can act at tick `now`.
pub const fn is_poised(life: &Life, now: i64) -> bool {
    life.last_action_time.saturating_add(ACTION_COST) <= now
}

/// The tick at which an individual becomes poised again.
pub const fn next_ready_time(life: &Life) -> i64 {
    life.last_action_time.saturating_add(ACTION_COST)
}

/// Ticks an action costs an individual with the given movement cost.
pub fn action_cost(action: &Action, movement_cost: i64) -> i64 {
    match action {
        Action::Move(_) => movement_cost,
        Action::Wait => movement_cost.min(ACTION_COST),
        _ if action.is_cheat() => 0,
        _ => ACTION_COST,
    }
}

/// Settle both clocks so the individual is next poised at `next_ready`.
const fn settle(life: &mut Life, next_ready: i64, movement_cost: i64) {
    life.last_action_time = next_ready.saturating_sub(ACTION_COST);
    life.last_movement_time = next_ready.saturating_sub(movement_cost);
}

/// Charge an individual for an action taken at tick `now`. Cheats and items
/// are left alone.
pub fn charge(thing: &mut Thing, action: &Action, now: i64) {
    if action.is_cheat() {
        return;
    }
    let movement_cost = thing.movement_cost();
    let cost = action_cost(action, movement_cost);
    if let Some(life) = thing.life_mut() {
        settle(life, now.saturating_add(cost), movement_cost);
    }
}
