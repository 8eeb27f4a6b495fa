//! Decision makers: who chooses what an individual does next.
//!
//! The scheduler asks a [`Decider`] for one action at a time, handing it
//! the acting individual (and through it, that individual's own
//! [`Knowledge`]). A decider never looks at the authoritative world, so
//! whatever it decides is based on what the individual believes.
//!
//! Two implementations exist:
//!
//! - [`HumanDecider`] replays actions queued by whoever drives the player
//!   (standard input, a test). An empty queue means "undecided" and
//!   suspends the scheduler.
//! - [`AiDecider`] chases the nearest enemy it knows of, attacking when
//!   adjacent and using its species' abilities when the enemy is in line.
//!   With no enemy in mind it picks things up or wanders.
//!
//! Every random choice goes through the supplied [`Randomness`], so AI
//! behavior replays exactly from the same draws.

use std::collections::VecDeque;

use delve_types::{AbilityId, Action, Coord, DIRECTIONS, Mind, ThingId};
use delve_world::random::choose;
use delve_world::{Knowledge, Life, Location, PerceivedKind, RandomError, Randomness, Thing};

use crate::actions::effects::ability_status;
use crate::actions::handlers::ABILITY_RANGE;
use crate::path::find_path;

/// Errors that can occur while deciding.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// The decider was asked about something that cannot decide.
    #[error("decision source error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },

    /// A random draw failed.
    #[error("random draw failed: {source}")]
    Random {
        /// The underlying draw error.
        #[from]
        source: RandomError,
    },
}

/// A source of actions for individuals.
pub trait Decider {
    /// Choose the next action for `actor`. `Ok(None)` means undecided.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError`] if the decider cannot work at all. A poor
    /// or invalid choice is not an error; the scheduler validates it.
    fn decide(
        &mut self,
        actor: &Thing,
        rng: &mut dyn Randomness,
    ) -> Result<Option<Action>, DecisionError>;
}

// ---------------------------------------------------------------------------
// Human
// ---------------------------------------------------------------------------

/// Actions queued by the presentation layer, handed out first in first out.
#[derive(Debug, Default, Clone)]
pub struct HumanDecider {
    queued: VecDeque<Action>,
}

impl HumanDecider {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            queued: VecDeque::new(),
        }
    }

    /// Queue an action for the player.
    pub fn push(&mut self, action: Action) {
        self.queued.push_back(action);
    }

    /// Number of queued actions.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

impl Decider for HumanDecider {
    fn decide(
        &mut self,
        _actor: &Thing,
        _rng: &mut dyn Randomness,
    ) -> Result<Option<Action>, DecisionError> {
        Ok(self.queued.pop_front())
    }
}

// ---------------------------------------------------------------------------
// AI
// ---------------------------------------------------------------------------

/// The heuristic monster brain. It keeps no memory between decisions.
#[derive(Debug, Default, Clone, Copy)]
pub struct AiDecider;

impl AiDecider {
    /// A new brain.
    pub const fn new() -> Self {
        Self
    }
}

impl Decider for AiDecider {
    fn decide(
        &mut self,
        actor: &Thing,
        rng: &mut dyn Randomness,
    ) -> Result<Option<Action>, DecisionError> {
        let life = actor.life().ok_or_else(|| DecisionError::Internal {
            message: format!("{} is not an individual", actor.id),
        })?;
        let Some(here) = actor.location.coord() else {
            return Ok(Some(Action::Wait));
        };
        let knowledge = &life.knowledge;

        if let Some((target, there)) = closest_enemy(actor.id, life, here, &mut *rng)? {
            let delta = there - here;
            let distance = here.king_distance(there);
            if distance <= 1 {
                return Ok(Some(Action::Attack(delta)));
            }
            if let Some(ability) = usable_ability(actor, life, target, delta, distance) {
                return Ok(Some(Action::Ability {
                    ability,
                    direction: delta.signum(),
                }));
            }
            let step = find_path(knowledge, here, there).and_then(|path| path.first().copied());
            if let Some(step) = step {
                return Ok(Some(Action::Move(step - here)));
            }
        }

        if let Some(item) = item_worth_taking(actor, knowledge, here) {
            return Ok(Some(Action::PickUp(item)));
        }
        wander(knowledge, here, rng)
    }
}

/// The nearest perceived individual on the other side, by king distance.
/// Ties go to a random pick among the tied, taken in id order.
fn closest_enemy(
    me: ThingId,
    life: &Life,
    here: Coord,
    rng: &mut dyn Randomness,
) -> Result<Option<(ThingId, Coord)>, RandomError> {
    let enemies: Vec<(ThingId, Coord)> = life
        .knowledge
        .perceived_things
        .values()
        .filter(|thing| thing.id != me)
        .filter(|thing| {
            matches!(thing.kind, PerceivedKind::Individual { team, .. } if team != life.team)
        })
        .filter_map(|thing| match thing.location {
            Location::Standing(coord) => Some((thing.id, coord)),
            _ => None,
        })
        .collect();
    let Some(nearest) = enemies.iter().map(|(_, c)| here.king_distance(*c)).min() else {
        return Ok(None);
    };
    let tied: Vec<(ThingId, Coord)> = enemies
        .into_iter()
        .filter(|(_, c)| here.king_distance(*c) == nearest)
        .collect();
    if tied.len() == 1 {
        return Ok(tied.first().copied());
    }
    choose(rng, &tied, "ai_target")
}

/// The first ability that is ready, reaches the target along a straight
/// line, and would do something the target is not known to suffer already.
fn usable_ability(
    actor: &Thing,
    life: &Life,
    target: ThingId,
    delta: Coord,
    distance: i32,
) -> Option<AbilityId> {
    let in_line = delta.x == 0 || delta.y == 0 || delta.x.unsigned_abs() == delta.y.unsigned_abs();
    if !in_line || distance > ABILITY_RANGE {
        return None;
    }
    let suffers = |ability: AbilityId| {
        life.knowledge
            .perceived(target)
            .is_some_and(|thing| thing.has_status(ability_status(ability).id()))
    };
    actor
        .physical_species_data()?
        .abilities
        .iter()
        .copied()
        .find(|ability| !life.is_cooling_down(*ability) && !suffers(*ability))
}

/// Something lying underfoot, for minds that care about belongings.
fn item_worth_taking(actor: &Thing, knowledge: &Knowledge, here: Coord) -> Option<ThingId> {
    let mind = actor.mental_species_data()?.mind;
    if !matches!(mind, Mind::Savage | Mind::Civilized) {
        return None;
    }
    knowledge
        .perceived_at(here)
        .into_iter()
        .find(|thing| !thing.is_individual() && matches!(thing.location, Location::Floor { .. }))
        .map(|thing| thing.id)
}

/// Step somewhere open and unoccupied, or wait when boxed in.
fn wander(
    knowledge: &Knowledge,
    here: Coord,
    rng: &mut dyn Randomness,
) -> Result<Option<Action>, DecisionError> {
    let open: Vec<Coord> = DIRECTIONS
        .iter()
        .copied()
        .filter(|d| {
            let next = here + *d;
            knowledge.tile(next).is_open_space() && knowledge.perceived_individual_at(next).is_none()
        })
        .collect();
    Ok(Some(match choose(rng, &open, "ai_wander")? {
        Some(direction) => Action::Move(direction),
        None => Action::Wait,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_types::{
        DecisionMakerType, SpeciesId, StatusEffect, StatusKind, ThingSignature, WeaponKind,
    };
    use delve_world::map::test_level;
    use delve_world::spawn::{create_item, spawn_individual};
    use delve_world::{AbilityCooldown, ItemIdentities, SeededRandom, World};

    use super::*;
    use crate::config::WorldConfig;
    use crate::context::StepContext;
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

        fn spawn(&mut self, species: SpeciesId, maker: DecisionMakerType, at: Coord) -> ThingId {
            spawn_individual(&mut self.world, &mut self.rng, species, maker, at).unwrap()
        }

        fn decide(&mut self, actor: ThingId) -> Option<Action> {
            {
                let mut ctx = StepContext::new(&mut self.world, &mut self.rng, &self.config);
                refresh_all(&mut ctx, true).unwrap();
            }
            let thing = self.world.thing(actor).unwrap();
            AiDecider::new().decide(thing, &mut self.rng).unwrap()
        }
    }

    #[test]
    fn adjacent_enemies_are_attacked() {
        let mut fx = Fixture::new();
        let ant = fx.spawn(SpeciesId::Ant, DecisionMakerType::Ai, Coord::new(5, 5));
        fx.spawn(SpeciesId::Human, DecisionMakerType::Player, Coord::new(6, 6));
        assert_eq!(fx.decide(ant), Some(Action::Attack(Coord::new(1, 1))));
    }

    #[test]
    fn allies_are_not_enemies() {
        let mut fx = Fixture::new();
        let ant = fx.spawn(SpeciesId::Ant, DecisionMakerType::Ai, Coord::new(5, 5));
        fx.spawn(SpeciesId::Dog, DecisionMakerType::Ai, Coord::new(6, 5));
        assert!(matches!(fx.decide(ant), Some(Action::Move(d)) if d != Coord::new(1, 0)));
    }

    #[test]
    fn distant_enemies_are_approached() {
        let mut fx = Fixture::new();
        let ant = fx.spawn(SpeciesId::Ant, DecisionMakerType::Ai, Coord::new(5, 5));
        fx.spawn(SpeciesId::Human, DecisionMakerType::Player, Coord::new(9, 5));
        assert!(matches!(fx.decide(ant), Some(Action::Move(d)) if d.x == 1));
    }

    #[test]
    fn ties_pick_one_of_the_nearest() {
        let mut fx = Fixture::new();
        let ant = fx.spawn(SpeciesId::Ant, DecisionMakerType::Ai, Coord::new(5, 5));
        fx.spawn(SpeciesId::Human, DecisionMakerType::Player, Coord::new(4, 5));
        fx.spawn(SpeciesId::Human, DecisionMakerType::Player, Coord::new(6, 5));
        fx.spawn(SpeciesId::Human, DecisionMakerType::Player, Coord::new(9, 9));
        let action = fx.decide(ant);
        assert!(
            action == Some(Action::Attack(Coord::new(-1, 0)))
                || action == Some(Action::Attack(Coord::new(1, 0)))
        );
    }

    #[test]
    fn cobras_spit_along_lines() {
        let mut fx = Fixture::new();
        let cobra = fx.spawn(SpeciesId::Cobra, DecisionMakerType::Ai, Coord::new(5, 5));
        fx.spawn(SpeciesId::Human, DecisionMakerType::Player, Coord::new(8, 8));
        assert_eq!(
            fx.decide(cobra),
            Some(Action::Ability {
                ability: AbilityId::SpitBlindingVenom,
                direction: Coord::new(1, 1),
            })
        );
        fx.world
            .thing_mut(cobra)
            .unwrap()
            .life_mut()
            .unwrap()
            .ability_cooldowns
            .push(AbilityCooldown {
                ability: AbilityId::SpitBlindingVenom,
                expiration_time: 500,
            });
        assert!(matches!(fx.decide(cobra), Some(Action::Move(_))));
    }

    #[test]
    fn cobras_leave_the_blinded_alone() {
        let mut fx = Fixture::new();
        let cobra = fx.spawn(SpeciesId::Cobra, DecisionMakerType::Ai, Coord::new(5, 5));
        let hero = fx.spawn(SpeciesId::Human, DecisionMakerType::Player, Coord::new(8, 8));
        fx.world.thing_mut(hero).unwrap().put_status(StatusEffect {
            kind: StatusKind::Blindness,
            expiration_time: 500,
        });
        assert!(matches!(fx.decide(cobra), Some(Action::Move(_))));
    }

    #[test]
    fn savages_pick_up_what_they_stand_on() {
        let mut fx = Fixture::new();
        let ogre = fx.spawn(SpeciesId::Ogre, DecisionMakerType::Ai, Coord::new(5, 5));
        let club = create_item(
            &mut fx.world,
            &mut fx.rng,
            ThingSignature::Weapon(WeaponKind::Battleaxe),
            Location::Floor {
                coord: Coord::new(5, 5),
                z_order: 0,
            },
        )
        .unwrap();
        assert_eq!(fx.decide(ogre), Some(Action::PickUp(club)));
    }

    #[test]
    fn boxed_in_wanderers_wait() {
        let mut fx = Fixture::new();
        let ant = fx.spawn(SpeciesId::Ant, DecisionMakerType::Ai, Coord::new(1, 1));
        fx.spawn(SpeciesId::Beetle, DecisionMakerType::Ai, Coord::new(2, 1));
        fx.spawn(SpeciesId::Beetle, DecisionMakerType::Ai, Coord::new(1, 2));
        fx.spawn(SpeciesId::Beetle, DecisionMakerType::Ai, Coord::new(2, 2));
        assert_eq!(fx.decide(ant), Some(Action::Wait));
    }

    #[test]
    fn humans_take_queued_actions_in_order() {
        let mut fx = Fixture::new();
        let hero = fx.spawn(SpeciesId::Human, DecisionMakerType::Player, Coord::new(5, 5));
        let mut human = HumanDecider::new();
        human.push(Action::Wait);
        human.push(Action::Move(Coord::new(0, 1)));
        assert_eq!(human.len(), 2);
        let thing = fx.world.thing(hero).unwrap();
        assert_eq!(human.decide(thing, &mut fx.rng).unwrap(), Some(Action::Wait));
        assert_eq!(
            human.decide(thing, &mut fx.rng).unwrap(),
            Some(Action::Move(Coord::new(0, 1)))
        );
        assert_eq!(human.decide(thing, &mut fx.rng).unwrap(), None);
        assert!(human.is_empty());
    }
}
