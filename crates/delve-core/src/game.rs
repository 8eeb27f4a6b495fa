//! The scheduler and the explicit game context.
//!
//! A [`Game`] owns everything one simulation needs: the world, the replay
//! log (which is also the random source), the configuration, and the two
//! decision makers. There is no global state, so several games can run side
//! by side in one process.
//!
//! Each tick runs these phases:
//!
//! 1. **Clock** -- advance the global tick.
//! 2. **Spawn** -- outside test mode, a new monster may appear.
//! 3. **Aging** -- every living individual, in initiative order, ages; those
//!    able to act are queued as poised.
//! 4. **Turns** -- each poised individual, in initiative order, is asked for
//!    an action, which is validated, applied, and charged. Cheats cost
//!    nothing, so the same individual is asked again after one.
//! 5. **Cleanup** -- things that stopped existing are announced and
//!    removed.
//!
//! [`Game::advance`] runs ticks until the player's individual needs a
//! decision nobody has queued, a replayed action has been applied, or the
//! player is dead.

use std::collections::VecDeque;

use delve_events::{ReplayLog, Snapshot};
use delve_types::{Action, DecisionMakerType, Event, SpeciesId, ThingId};
use delve_world::map::generate_level;
use delve_world::spawn::{populate_level, random_spawn_location, spawn_individual, spawn_random_monster};
use delve_world::{ItemIdentities, Thing, World, WorldError};
use tracing::{debug, info, warn};

use crate::actions::costs::{charge, is_poised};
use crate::actions::handlers::execute_action;
use crate::actions::validation::validate_action;
use crate::aging::age_individual;
use crate::config::SimulationConfig;
use crate::context::StepContext;
use crate::decision::{AiDecider, Decider, HumanDecider};
use crate::error::CoreError;
use crate::perception::refresh_all;
use crate::vision::compute_vision;

/// What [`Game::advance`] stopped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The player's individual is poised and no action is queued for it.
    NeedsDecision {
        /// The individual waiting for input.
        actor: ThingId,
    },
    /// An action was read from the save file and applied.
    Replayed {
        /// Who acted.
        actor: ThingId,
        /// What it did.
        action: Action,
    },
    /// The player's individual is dead. The game is over.
    PlayerDied,
}

/// How one request for an action went.
enum Turn {
    /// Nobody has decided yet.
    Undecided,
    /// The actor cannot act any more this tick.
    Skipped,
    /// A human action was rejected; ask again.
    Rejected,
    /// An action was applied.
    Acted {
        /// The action.
        action: Action,
        /// Whether it came from the save file.
        replayed: bool,
    },
}

/// One running simulation.
#[derive(Debug)]
pub struct Game {
    world: World,
    log: ReplayLog,
    config: SimulationConfig,
    human: HumanDecider,
    ai: AiDecider,
    poised: VecDeque<ThingId>,
    in_tick: bool,
    over: bool,
}

impl Game {
    /// Start the game the log's header describes: generate the first
    /// level, place the player, and populate the dungeon.
    ///
    /// When the log is replaying, the same draws come back out of it, so
    /// the world is rebuilt exactly as it was.
    ///
    /// # Errors
    ///
    /// Propagates world generation, draw, and perception failures.
    pub fn new(mut log: ReplayLog, config: SimulationConfig) -> Result<Self, CoreError> {
        let identities = ItemIdentities::random(&mut log)?;
        let level = generate_level(&mut log, 0)?;
        let mut world = World::new(level, identities, 0);
        let start = random_spawn_location(&world, &mut log, None)?;
        let you = spawn_individual(
            &mut world,
            &mut log,
            SpeciesId::Human,
            DecisionMakerType::Player,
            start,
        )?;
        world.set_you(you);
        {
            let mut ctx = StepContext::new(&mut world, &mut log, &config.world);
            compute_vision(ctx.world, you)?;
            let spawned = populate_level(
                ctx.world,
                &mut *ctx.rng,
                ctx.config.items_per_level,
                ctx.config.warm_up_monsters,
            )?;
            for id in spawned {
                compute_vision(ctx.world, id)?;
                ctx.publish(Event::Appear { individual: id })?;
            }
            refresh_all(&mut ctx, true)?;
        }
        info!(
            header = ?log.header(),
            mode = ?log.mode(),
            things = world.thing_count(),
            "Game started"
        );
        Ok(Self {
            world,
            log,
            config,
            human: HumanDecider::new(),
            ai: AiDecider::new(),
            poised: VecDeque::new(),
            in_tick: false,
            over: false,
        })
    }

    // ---- accessors ----

    /// The authoritative world.
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The replay log.
    pub const fn log(&self) -> &ReplayLog {
        &self.log
    }

    /// The configuration the game runs with.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Queue of actions for the player's individual.
    pub const fn human_mut(&mut self) -> &mut HumanDecider {
        &mut self.human
    }

    /// Whether the player's individual has died.
    pub const fn is_over(&self) -> bool {
        self.over
    }

    /// A canonical capture of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.world, self.log.random_state(), self.world.you())
    }

    fn player_is_dead(&self) -> bool {
        self.world
            .you()
            .is_none_or(|you| !self.world.get(you).is_some_and(|t| t.still_exists))
    }

    // ---- scheduling ----

    /// Run the simulation until something outside it is needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] when the world is inconsistent, the log is
    /// malformed or diverged, or a replayed action is invalid.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, CoreError> {
        if self.over {
            return Ok(AdvanceOutcome::PlayerDied);
        }
        loop {
            if !self.in_tick {
                self.start_tick()?;
                self.in_tick = true;
            }
            while let Some(&actor) = self.poised.front() {
                match self.take_turn(actor)? {
                    Turn::Undecided => return Ok(AdvanceOutcome::NeedsDecision { actor }),
                    Turn::Skipped => {
                        self.poised.pop_front();
                    }
                    Turn::Rejected => {}
                    Turn::Acted { action, replayed } => {
                        if !action.is_cheat() {
                            self.poised.pop_front();
                        }
                        if replayed {
                            return Ok(AdvanceOutcome::Replayed { actor, action });
                        }
                    }
                }
            }
            let player_died = self.player_is_dead();
            self.end_tick()?;
            self.in_tick = false;
            if player_died {
                return self.game_over();
            }
        }
    }

    fn start_tick(&mut self) -> Result<(), CoreError> {
        let tick = self.world.advance_clock()?;
        let mut ctx = StepContext::new(&mut self.world, &mut self.log, &self.config.world);

        let spawn_chance = ctx.config.spawn_chance;
        if !ctx.rng.is_test_mode()
            && spawn_chance > 0
            && ctx.rng.one_in(spawn_chance, "spawn_monster")?
        {
            match spawn_random_monster(ctx.world, &mut *ctx.rng) {
                Ok(id) => {
                    compute_vision(ctx.world, id)?;
                    ctx.publish(Event::Appear { individual: id })?;
                    info!(tick, thing_id = %id, "Monster spawned");
                }
                Err(WorldError::NoSpawnLocation { attempts }) => {
                    debug!(tick, attempts, "No room for a new monster");
                }
                Err(e) => return Err(e.into()),
            }
        }

        for id in ctx.world.individuals_by_initiative() {
            age_individual(&mut ctx, id)?;
            let Ok(thing) = ctx.world.thing_mut(id) else {
                continue;
            };
            if !thing.is_alive_individual() {
                continue;
            }
            let Some(life) = thing.life_mut() else {
                continue;
            };
            if is_poised(life, tick) {
                life.knowledge.narration.push_separator();
                self.poised.push_back(id);
            }
        }
        debug!(tick, poised = self.poised.len(), "Tick started");
        Ok(())
    }

    /// Ask one poised individual for an action and apply it.
    fn take_turn(&mut self, actor: ThingId) -> Result<Turn, CoreError> {
        let Some(thing) = self.world.get(actor).filter(|t| t.is_alive_individual()) else {
            return Ok(Turn::Skipped);
        };
        let (action, replayed) = if is_player(thing) {
            if let Some(action) = self.log.read_action(&self.world, actor)? {
                if validate_action(&self.world, actor, &action).is_err() {
                    warn!(thing_id = %actor, action = action.name(), "Replayed action is invalid");
                    return Err(self.log.invalid_action().into());
                }
                (action, true)
            } else {
                let Some(action) = self.human.decide(thing, &mut self.log)? else {
                    return Ok(Turn::Undecided);
                };
                if let Err(rejection) = validate_action(&self.world, actor, &action) {
                    debug!(thing_id = %actor, action = action.name(), %rejection, "Ignoring invalid action");
                    return Ok(Turn::Rejected);
                }
                self.log.record_action(&self.world, actor, &action)?;
                (action, false)
            }
        } else {
            let decided = self.ai.decide(thing, &mut self.log)?;
            let action = decided
                .filter(|action| validate_action(&self.world, actor, action).is_ok())
                .unwrap_or(Action::Wait);
            (action, false)
        };

        let now = self.world.time();
        let mut ctx = StepContext::new(&mut self.world, &mut self.log, &self.config.world);
        execute_action(&mut ctx, actor, action)?;
        if let Ok(thing) = ctx.world.thing_mut(actor) {
            charge(thing, &action, now);
        }
        refresh_all(&mut ctx, true)?;
        Ok(Turn::Acted { action, replayed })
    }

    fn end_tick(&mut self) -> Result<(), CoreError> {
        self.poised.clear();
        let mut ctx = StepContext::new(&mut self.world, &mut self.log, &self.config.world);
        let dead = ctx.world.dead_things();
        for id in &dead {
            if ctx.world.get(*id).is_none() {
                continue;
            }
            ctx.publish(Event::DeleteThing { thing: *id })?;
            ctx.world.remove(*id)?;
        }
        debug!(
            tick = ctx.world.time(),
            removed = dead.len(),
            things = ctx.world.thing_count(),
            "Tick finished"
        );
        Ok(())
    }

    fn game_over(&mut self) -> Result<AdvanceOutcome, CoreError> {
        self.over = true;
        info!(tick = self.world.time(), "The player died");
        self.log.finish(&self.world)?;
        self.log.delete_save_file()?;
        Ok(AdvanceOutcome::PlayerDied)
    }

    /// Run any test directives left in the log once play has stopped.
    ///
    /// # Errors
    ///
    /// Returns a failed expectation or a stray action.
    pub fn finish(&mut self) -> Result<(), CoreError> {
        if self.over {
            return Ok(());
        }
        Ok(self.log.finish(&self.world)?)
    }
}

/// Whether the log and the human decider speak for this individual.
fn is_player(thing: &Thing) -> bool {
    thing
        .life()
        .is_some_and(|life| life.decision_maker == DecisionMakerType::Player)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_events::{Header, SaveMode};
    use delve_types::{Coord, Initiative};
    use delve_world::Location;

    use super::*;

    fn test_game() -> Game {
        Game::new(ReplayLog::recording(Header::Test, 0), SimulationConfig::default()).unwrap()
    }

    #[test]
    fn the_player_starts_in_the_corner_and_is_asked_first() {
        let mut game = test_game();
        let you = game.world().you().unwrap();
        assert_eq!(game.world().coord_of(you), Some(Coord::new(1, 1)));
        assert_eq!(
            game.advance().unwrap(),
            AdvanceOutcome::NeedsDecision { actor: you }
        );
        assert_eq!(game.world().time(), 1);
    }

    #[test]
    fn later_individuals_see_what_earlier_ones_did() {
        let mut game = test_game();
        let you = game.world().you().unwrap();
        let dog = spawn_individual(
            &mut game.world,
            &mut game.log,
            SpeciesId::Dog,
            DecisionMakerType::Ai,
            Coord::new(5, 1),
        )
        .unwrap();
        game.world.thing_mut(dog).unwrap().life_mut().unwrap().initiative =
            Initiative::from_u64(0);
        {
            let mut ctx = StepContext::new(&mut game.world, &mut game.log, &game.config.world);
            compute_vision(ctx.world, dog).unwrap();
            refresh_all(&mut ctx, true).unwrap();
        }
        assert_eq!(game.world().individuals_by_initiative(), vec![dog, you]);

        assert_eq!(
            game.advance().unwrap(),
            AdvanceOutcome::NeedsDecision { actor: you }
        );
        let moved_to = game.world().coord_of(dog).unwrap();
        assert_ne!(moved_to, Coord::new(5, 1));
        let knowledge = &game.world().thing(you).unwrap().life().unwrap().knowledge;
        assert_eq!(
            knowledge.perceived(dog).unwrap().location,
            Location::Standing(moved_to)
        );
    }

    #[test]
    fn accepted_actions_are_recorded() {
        let mut game = test_game();
        game.advance().unwrap();
        game.human_mut().push(Action::Move(Coord::new(1, 0)));
        game.advance().unwrap();
        assert_eq!(game.log().transcript(), ["@test", "move 1 0"]);
        assert_eq!(game.world().time(), 13);
    }

    #[test]
    fn rejected_human_actions_are_dropped() {
        let mut game = test_game();
        let you = game.world().you().unwrap();
        game.advance().unwrap();
        game.human_mut().push(Action::Move(Coord::new(3, 0)));
        assert_eq!(
            game.advance().unwrap(),
            AdvanceOutcome::NeedsDecision { actor: you }
        );
        assert!(game.human_mut().is_empty());
        assert_eq!(game.log().transcript(), ["@test"]);
        assert_eq!(game.world().time(), 1);
    }

    #[test]
    fn cheats_keep_the_turn() {
        let mut game = test_game();
        let you = game.world().you().unwrap();
        game.advance().unwrap();
        game.human_mut().push(Action::CheatIdentify);
        assert_eq!(
            game.advance().unwrap(),
            AdvanceOutcome::NeedsDecision { actor: you }
        );
        assert_eq!(game.world().time(), 1);
    }

    #[test]
    fn the_game_ends_when_the_player_dies() {
        let mut game = test_game();
        let you = game.world().you().unwrap();
        game.advance().unwrap();
        game.human_mut().push(Action::CheatKill(you));
        assert_eq!(game.advance().unwrap(), AdvanceOutcome::PlayerDied);
        assert!(game.is_over());
        assert!(game.world().get(you).is_none());
        assert_eq!(game.advance().unwrap(), AdvanceOutcome::PlayerDied);
    }

    #[test]
    fn replayed_actions_are_reported_one_at_a_time() {
        let log =
            ReplayLog::from_script("moves", "@test\nmove 1 0\nmove 0 1\n", SaveMode::Read).unwrap();
        let mut game = Game::new(log, SimulationConfig::default()).unwrap();
        let you = game.world().you().unwrap();
        assert_eq!(
            game.advance().unwrap(),
            AdvanceOutcome::Replayed {
                actor: you,
                action: Action::Move(Coord::new(1, 0)),
            }
        );
        assert_eq!(
            game.advance().unwrap(),
            AdvanceOutcome::Replayed {
                actor: you,
                action: Action::Move(Coord::new(0, 1)),
            }
        );
        assert_eq!(
            game.advance().unwrap(),
            AdvanceOutcome::NeedsDecision { actor: you }
        );
        assert_eq!(game.world().coord_of(you), Some(Coord::new(2, 2)));
        assert!(!game.log().is_replaying());
    }

    #[test]
    fn invalid_replayed_actions_are_errors() {
        let log = ReplayLog::from_script("bad", "@test\ndown\n", SaveMode::Read).unwrap();
        let mut game = Game::new(log, SimulationConfig::default()).unwrap();
        let error = game.advance().unwrap_err();
        assert!(error.to_string().contains("invalid action"));
    }
}
