//! The event/perception pipeline.
//!
//! [`publish`] hands every authoritative [`Event`] to each living
//! individual in turn. The observer's own vision decides whether it notices
//! the event at all, which participants it can identify, and which it can
//! only guess at. Anything noticed is recorded into the observer's
//! [`Knowledge`] and narrated into its log.
//!
//! Participants the observer cannot see are never named. A hidden
//! individual is replaced by a *placeholder*: a perceived thing with a fresh
//! id standing where the observer suspects something is. Placeholders are
//! reused while they last and pruned by [`refresh_knowledge`].

use std::collections::{BTreeMap, BTreeSet};

use delve_types::{
    AbilityId, Coord, Event, PotionKind, SpeciesId, StatusEffectId, Team, ThingId, VisionTypes,
    WandDescription, WandKind,
};
use delve_world::{
    Knowledge, Location, PLACEHOLDER_TIMEOUT, PerceivedKind, PerceivedThing, Randomness, Thing,
    ThingKind, World, WorldError,
};
use tracing::debug;

use crate::context::StepContext;
use crate::error::CoreError;
use crate::narration::{
    act, capitalize, describe, gain_status_phrases, lose_status_phrases, with_article, words,
};
use crate::vision::{compute_vision, remember_tile, thing_vision};

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Deliver an event to every living individual, in initiative order.
///
/// # Errors
///
/// Propagates world inconsistencies and failed random draws.
pub fn publish(ctx: &mut StepContext<'_>, event: Event) -> Result<(), CoreError> {
    debug!(tick = ctx.world.time(), event = event.name(), "Publishing event");
    for observer in ctx.world.individuals_by_initiative() {
        let mut knowledge = take_knowledge(ctx.world, observer)?;
        let outcome = Perceiver {
            world: &*ctx.world,
            rng: &mut *ctx.rng,
            observer,
            knowledge: &mut knowledge,
            witnessed_zaps: &mut ctx.witnessed_zaps,
        }
        .perceive(event);
        restore_knowledge(ctx.world, observer, knowledge)?;
        outcome?;
    }
    Ok(())
}

/// Bring one individual's knowledge up to date with what it senses now.
///
/// Everything visible is re-recorded. Remembered things that the observer
/// can now tell are gone are forgotten, as are placeholders that timed out
/// or whose tile is now felt or seen ethereally. Mindless individuals keep
/// nothing they cannot sense right now.
///
/// # Errors
///
/// Propagates world inconsistencies and failed random draws.
pub fn refresh_knowledge(
    ctx: &mut StepContext<'_>,
    observer: ThingId,
    recompute_vision: bool,
) -> Result<(), CoreError> {
    if recompute_vision {
        compute_vision(ctx.world, observer)?;
    }
    let mut knowledge = take_knowledge(ctx.world, observer)?;
    let outcome = Perceiver {
        world: &*ctx.world,
        rng: &mut *ctx.rng,
        observer,
        knowledge: &mut knowledge,
        witnessed_zaps: &mut ctx.witnessed_zaps,
    }
    .refresh();
    restore_knowledge(ctx.world, observer, knowledge)?;
    outcome
}

/// [`refresh_knowledge`] for every living individual.
///
/// # Errors
///
/// As [`refresh_knowledge`].
pub fn refresh_all(ctx: &mut StepContext<'_>, recompute_vision: bool) -> Result<(), CoreError> {
    for observer in ctx.world.individuals_by_initiative() {
        refresh_knowledge(ctx, observer, recompute_vision)?;
    }
    Ok(())
}

fn take_knowledge(world: &mut World, observer: ThingId) -> Result<Knowledge, CoreError> {
    let life = world
        .thing_mut(observer)?
        .life_mut()
        .ok_or(WorldError::NotAnIndividual(observer))?;
    Ok(std::mem::take(&mut life.knowledge))
}

fn restore_knowledge(
    world: &mut World,
    observer: ThingId,
    knowledge: Knowledge,
) -> Result<(), CoreError> {
    let life = world
        .thing_mut(observer)?
        .life_mut()
        .ok_or(WorldError::NotAnIndividual(observer))?;
    life.knowledge = knowledge;
    Ok(())
}

const fn opposing(team: Team) -> Team {
    match team {
        Team::Good => Team::Bad,
        Team::Bad => Team::Good,
    }
}

/// What `vision` of `thing` reveals about its variant, on top of what was
/// already known.
fn perceived_kind(
    world: &World,
    thing: &Thing,
    vision: VisionTypes,
    previous: Option<PerceivedKind>,
) -> PerceivedKind {
    let identities = world.identities();
    let color = vision.can_see_color();
    match &thing.kind {
        ThingKind::Individual(life) => {
            // Cogniscopy alone senses the mind, which keeps its original species.
            let species = if vision.can_see_shape() {
                thing.physical_species().unwrap_or(life.original_species)
            } else {
                life.original_species
            };
            PerceivedKind::Individual {
                species,
                team: life.team,
            }
        }
        ThingKind::Wand(info) => {
            let (known, used_count) = match previous {
                Some(PerceivedKind::Wand {
                    description,
                    used_count,
                }) => (description, used_count),
                _ => (None, 0),
            };
            PerceivedKind::Wand {
                description: if color {
                    Some(identities.wand_description(info.kind))
                } else {
                    known
                },
                used_count,
            }
        }
        ThingKind::Potion(kind) => {
            let known = match previous {
                Some(PerceivedKind::Potion { description }) => description,
                _ => None,
            };
            PerceivedKind::Potion {
                description: if color {
                    Some(identities.potion_description(*kind))
                } else {
                    known
                },
            }
        }
        ThingKind::Book(kind) => {
            let known = match previous {
                Some(PerceivedKind::Book { description }) => description,
                _ => None,
            };
            PerceivedKind::Book {
                description: if color {
                    Some(identities.book_description(*kind))
                } else {
                    known
                },
            }
        }
        ThingKind::Weapon(kind) => PerceivedKind::Weapon { kind: *kind },
    }
}

// ---------------------------------------------------------------------------
// Perceiver
// ---------------------------------------------------------------------------

/// One observer's view while it processes an event or a refresh.
///
/// The observer's knowledge is taken out of the world for the duration, so
/// the world can be read freely.
struct Perceiver<'p, R: Randomness + ?Sized> {
    world: &'p World,
    rng: &'p mut R,
    observer: ThingId,
    knowledge: &'p mut Knowledge,
    witnessed_zaps: &'p mut BTreeMap<ThingId, WandDescription>,
}

impl<R: Randomness + ?Sized> Perceiver<'_, R> {
    const fn now(&self) -> i64 {
        self.world.time()
    }

    fn vision_of(&self, target: ThingId) -> VisionTypes {
        thing_vision(self.world, self.observer, self.knowledge, target)
    }

    fn sees(&self, target: ThingId) -> bool {
        self.vision_of(target).any()
    }

    fn sees_location(&self, coord: Coord) -> bool {
        self.knowledge.vision_at(coord).can_see_shape()
    }

    fn name(&self, id: Option<ThingId>) -> String {
        describe(self.knowledge, self.observer, id)
    }

    fn say(&mut self, sentence: &str) {
        self.knowledge.narration.push_sentence(capitalize(sentence));
    }

    fn forget_unless_self(&mut self, id: Option<ThingId>) {
        if let Some(id) = id.filter(|id| *id != self.observer) {
            self.knowledge.forget(id);
        }
    }

    // ---- recording ----

    /// Record a thing, its containers first, then its visible contents.
    fn record(&mut self, target: ThingId) -> Result<(), CoreError> {
        let mut containers = Vec::new();
        let mut cursor = self.world.get(target).and_then(|t| t.location.container());
        while let Some(container) = cursor {
            containers.push(container);
            cursor = self.world.get(container).and_then(|t| t.location.container());
        }
        for container in containers.into_iter().rev() {
            self.record_single(container)?;
        }
        self.record_tree(target)
    }

    fn record_tree(&mut self, target: ThingId) -> Result<(), CoreError> {
        let Some(vision) = self.record_single(target)? else {
            return Ok(());
        };
        if vision.can_see_shape() {
            for item in self.world.inventory_of(target) {
                self.record_tree(item)?;
            }
        }
        Ok(())
    }

    /// Record one thing if it is sensed. Returns the vision it was sensed by.
    fn record_single(&mut self, target: ThingId) -> Result<Option<VisionTypes>, CoreError> {
        let world = self.world;
        let vision = self.vision_of(target);
        if !vision.any() {
            return Ok(None);
        }
        let thing = world.thing(target)?;
        let previous = self.knowledge.perceived(target).map(|p| p.kind);
        let kind = perceived_kind(world, thing, vision, previous);
        let statuses: BTreeSet<StatusEffectId> = thing
            .status_effects
            .iter()
            .map(|effect| effect.id())
            .filter(|id| thing.has_status(*id) && id.is_visible_with(vision))
            .collect();
        let location = thing.location;
        let now = self.now();
        let entry = self
            .knowledge
            .perceived_things
            .entry(target)
            .or_insert_with(|| PerceivedThing::new(target, false, kind, location, now));
        entry.is_placeholder = false;
        entry.kind = kind;
        entry.location = location;
        entry.last_seen_time = now;
        entry.status_effects = statuses;
        if let Location::Standing(coord) = location {
            self.drop_placeholders_at(coord);
        }
        Ok(Some(vision))
    }

    /// A confirmed individual on a tile explains any suspicion about it.
    fn drop_placeholders_at(&mut self, coord: Coord) {
        let stale: Vec<ThingId> = self
            .knowledge
            .perceived_things
            .values()
            .filter(|p| p.is_placeholder && p.location == Location::Standing(coord))
            .map(|p| p.id)
            .collect();
        for id in stale {
            self.knowledge.forget(id);
        }
    }

    /// The perceived individual the observer attributes a presence at
    /// `coord` to, minting a placeholder when it knows of none.
    fn placeholder_at(&mut self, coord: Coord) -> Result<ThingId, CoreError> {
        let now = self.now();
        if let Some(existing) = self
            .knowledge
            .perceived_things
            .values_mut()
            .find(|p| p.is_individual() && p.location == Location::Standing(coord))
        {
            existing.last_seen_time = now;
            return Ok(existing.id);
        }
        let id = self.rng.random_id()?;
        let team = self
            .world
            .thing(self.observer)?
            .life()
            .map_or(Team::Good, |life| opposing(life.team));
        let mut placeholder = PerceivedThing::new(
            id,
            true,
            PerceivedKind::Individual {
                species: SpeciesId::Human,
                team,
            },
            Location::Standing(coord),
            now,
        );
        // Sensing nothing on a tile in plain sight means it is invisible.
        if self.knowledge.vision_at(coord).contains(VisionTypes::NORMAL) {
            placeholder.status_effects.insert(StatusEffectId::Invisibility);
        }
        self.knowledge.perceived_things.insert(id, placeholder);
        debug!(observer = %self.observer, placeholder = %id, x = coord.x, y = coord.y, "Placeholder created");
        Ok(id)
    }

    /// An item the observer only knows `holder` is using, kept as a
    /// placeholder in the holder's perceived inventory.
    fn unseen_item_of(
        &mut self,
        holder: Option<ThingId>,
        kind: PerceivedKind,
    ) -> Result<Option<ThingId>, CoreError> {
        let Some(holder) = holder else {
            return Ok(None);
        };
        let now = self.now();
        if let Some(existing) = self.knowledge.perceived_things.values_mut().find(|p| {
            p.is_placeholder
                && p.location.container() == Some(holder)
                && std::mem::discriminant(&p.kind) == std::mem::discriminant(&kind)
        }) {
            existing.last_seen_time = now;
            return Ok(Some(existing.id));
        }
        let z_order = self.knowledge.perceived_inventory(holder).len();
        let id = self.rng.random_id()?;
        let location = Location::Inventory {
            container: holder,
            z_order,
        };
        self.knowledge
            .perceived_things
            .insert(id, PerceivedThing::new(id, true, kind, location, now));
        Ok(Some(id))
    }

    /// The id the observer uses for an individual taking part in an event.
    fn individual(&mut self, id: ThingId) -> Result<Option<ThingId>, CoreError> {
        if self.sees(id) {
            self.record(id)?;
            return Ok(Some(id));
        }
        match self.world.get(id).and_then(|t| t.location.coord()) {
            Some(coord) => self.placeholder_at(coord).map(Some),
            None => Ok(None),
        }
    }

    /// The id the observer uses for an item taking part in an event at
    /// `coord`. Items in flight are glimpsed by the vision of their tile.
    fn item(&mut self, id: ThingId, coord: Coord) -> Result<Option<ThingId>, CoreError> {
        if self.sees(id) {
            self.record(id)?;
            return Ok(Some(id));
        }
        let vision = self
            .knowledge
            .vision_at(coord)
            .without(VisionTypes::COGNISCOPY);
        if !vision.can_see_shape() {
            return Ok(None);
        }
        let world = self.world;
        let thing = world.thing(id)?;
        let previous = self.knowledge.perceived(id).map(|p| p.kind);
        let kind = perceived_kind(world, thing, vision, previous);
        let now = self.now();
        let entry = self
            .knowledge
            .perceived_things
            .entry(id)
            .or_insert_with(|| PerceivedThing::new(id, false, kind, Location::Nowhere, now));
        entry.kind = kind;
        entry.location = Location::Nowhere;
        entry.last_seen_time = now;
        Ok(Some(id))
    }

    // ---- identification ----

    fn identify_zapped_wand(&mut self, kind: WandKind) {
        if let Some(description) = self.witnessed_zaps.get(&self.observer).copied() {
            self.knowledge.identify_wand(description, kind);
        }
    }

    fn identify_potion(&mut self, item: Option<ThingId>, kind: PotionKind) {
        let description = item
            .and_then(|id| self.knowledge.perceived(id))
            .and_then(|p| match p.kind {
                PerceivedKind::Potion { description } => description,
                _ => None,
            });
        if let Some(description) = description {
            self.knowledge.identify_potion(description, kind);
        }
    }

    // ---- events ----

    #[allow(clippy::too_many_lines)]
    fn perceive(&mut self, event: Event) -> Result<(), CoreError> {
        match event {
            Event::Appear { individual } => {
                if self.sees(individual) {
                    let who = self.individual(individual)?;
                    let text = act(&self.name(who), "appear.", "appears.");
                    self.say(&text);
                }
            }
            Event::LevelUp { individual } => {
                if individual == self.observer || self.vision_of(individual).can_see_shape() {
                    let who = self.individual(individual)?;
                    let text = act(&self.name(who), "level up.", "levels up.");
                    self.say(&text);
                }
            }
            Event::Die { individual } => {
                if self.sees(individual) {
                    let who = self.individual(individual)?;
                    let text = act(&self.name(who), "die.", "dies.");
                    self.say(&text);
                    self.forget_unless_self(who);
                }
            }
            Event::DeleteThing { thing } => {
                if thing != self.observer {
                    self.knowledge.forget(thing);
                }
            }
            Event::GainStatus { individual, status } => self.gain_status(individual, status)?,
            Event::LoseStatus { individual, status } => {
                let noticed = individual == self.observer
                    || status.is_visible_with(self.vision_of(individual));
                if noticed {
                    let who = self.individual(individual)?;
                    if let Some((you_form, third_form)) = lose_status_phrases(status) {
                        let text = act(&self.name(who), you_form, third_form);
                        self.say(&text);
                    }
                }
            }
            Event::Polymorph {
                individual,
                new_species,
            } => {
                if individual == self.observer || self.vision_of(individual).can_see_shape() {
                    let before = self.name(Some(individual));
                    let species = with_article(&words(new_species.name()));
                    let text = act(
                        &before,
                        &format!("turn into {species}!"),
                        &format!("turns into {species}!"),
                    );
                    self.record(individual)?;
                    self.say(&text);
                }
            }
            Event::Move { actor, .. } => {
                if self.sees(actor) {
                    self.record(actor)?;
                }
            }
            Event::BumpIntoLocation { actor, location } => {
                if actor == self.observer {
                    remember_tile(
                        self.knowledge,
                        location,
                        self.world.tile(location),
                        VisionTypes::TOUCH,
                    );
                }
                if self.sees(actor) {
                    let who = self.individual(actor)?;
                    let text = act(&self.name(who), "bump into a wall.", "bumps into a wall.");
                    self.say(&text);
                }
            }
            Event::AttackLocation { actor, location } => {
                if self.sees(actor) {
                    let who = self.individual(actor)?;
                    let (you_form, third_form) = if self.world.tile(location).is_open_space() {
                        ("attack thin air.", "attacks thin air.")
                    } else {
                        ("attack a wall.", "attacks a wall.")
                    };
                    let text = act(&self.name(who), you_form, third_form);
                    self.say(&text);
                }
            }
            Event::BumpIntoIndividual { actor, target } => {
                self.between(actor, target, ("bump into", "bumps into"))?;
            }
            Event::AttackIndividual { actor, target } => {
                self.between(actor, target, ("hit", "hits"))?;
            }
            Event::MeleeKill { actor, target } => {
                if let Some(target) = self.between(actor, target, ("kill", "kills"))? {
                    self.forget_unless_self(Some(target));
                }
            }
            Event::ZapWand {
                actor,
                item,
                location,
            } => {
                let actor_seen = self.sees(actor);
                if actor_seen || self.sees_location(location) {
                    let who = self.individual(actor)?;
                    let wand = if actor_seen {
                        self.item(item, location)?
                    } else {
                        self.unseen_item_of(who, PerceivedKind::Wand {
                            description: None,
                            used_count: 0,
                        })?
                    };
                    let mut description = None;
                    if let Some(PerceivedThing {
                        kind:
                            PerceivedKind::Wand {
                                description: seen,
                                used_count,
                            },
                        ..
                    }) = wand.and_then(|id| self.knowledge.perceived_things.get_mut(&id))
                    {
                        if *used_count != -1 {
                            *used_count = used_count.saturating_add(1);
                        }
                        description = *seen;
                    }
                    match description {
                        Some(description) => {
                            self.witnessed_zaps.insert(self.observer, description);
                        }
                        None => {
                            self.witnessed_zaps.remove(&self.observer);
                        }
                    }
                    let wand_name = self.name(wand);
                    let text = act(
                        &self.name(who),
                        &format!("zap {wand_name}."),
                        &format!("zaps {wand_name}."),
                    );
                    self.say(&text);
                }
            }
            Event::ZapWandNoCharges { actor, item } => {
                if self.sees(actor) {
                    let who = self.individual(actor)?;
                    let wand = match self.world.coord_of(actor) {
                        Some(coord) => self.item(item, coord)?,
                        None => None,
                    };
                    if let Some(PerceivedThing {
                        kind: PerceivedKind::Wand { used_count, .. },
                        ..
                    }) = wand.and_then(|id| self.knowledge.perceived_things.get_mut(&id))
                    {
                        *used_count = -1;
                    }
                    let wand_name = self.name(wand);
                    let text = act(
                        &self.name(who),
                        &format!("zap {wand_name}, but it just sputters."),
                        &format!("zaps {wand_name}, but it just sputters."),
                    );
                    self.say(&text);
                }
            }
            Event::WandDisintegrates { actor, item } => {
                if self.sees(actor) || self.sees(item) {
                    let wand = match self.world.coord_of(item) {
                        Some(coord) => self.item(item, coord)?,
                        None => None,
                    };
                    let text = format!("{} disintegrates.", self.name(wand));
                    self.say(&text);
                    self.forget_unless_self(wand);
                }
            }
            Event::ReadBook {
                actor,
                item,
                effect,
            } => {
                // A spell that fizzles only happens in the reader's mind.
                let noticed = match effect {
                    Some(_) => self.sees(actor),
                    None => self.vision_of(actor).can_see_thoughts(),
                };
                if noticed {
                    let who = self.individual(actor)?;
                    let book = match self.world.coord_of(item) {
                        Some(coord) => self.item(item, coord)?,
                        None => None,
                    };
                    let book_name = self.name(book);
                    if let Some(kind) = effect {
                        let description = book
                            .and_then(|id| self.knowledge.perceived(id))
                            .and_then(|p| match p.kind {
                                PerceivedKind::Book { description } => description,
                                _ => None,
                            });
                        if let Some(description) = description {
                            self.knowledge.identify_book(description, kind);
                        }
                    }
                    let text = match effect {
                        Some(_) => act(
                            &self.name(who),
                            &format!("read {book_name}."),
                            &format!("reads {book_name}."),
                        ),
                        None => act(
                            &self.name(who),
                            &format!("read {book_name}, but nothing happens."),
                            &format!("reads {book_name}, but nothing happens."),
                        ),
                    };
                    self.say(&text);
                }
            }
            Event::ThrowItem {
                actor,
                item,
                location,
            } => {
                if self.sees(actor) || self.sees_location(location) {
                    let who = self.individual(actor)?;
                    let thrown = self.item(item, location)?;
                    let thrown_name = self.name(thrown);
                    let text = act(
                        &self.name(who),
                        &format!("throw {thrown_name}."),
                        &format!("throws {thrown_name}."),
                    );
                    self.say(&text);
                }
            }
            Event::ItemHitsIndividual {
                item,
                target,
                location,
            } => {
                if self.sees(target) || self.sees_location(location) {
                    let thrown = self.item(item, location)?;
                    let who = self.individual(target)?;
                    let text = format!("{} hits {}.", self.name(thrown), self.name(who));
                    self.say(&text);
                }
            }
            Event::PickUp {
                actor,
                item,
                location,
            } => self.handle_item(actor, item, location, ("pick up", "picks up"))?,
            Event::SuckUp {
                actor,
                item,
                location,
            } => self.handle_item(actor, item, location, ("suck up", "sucks up"))?,
            Event::DropItem {
                actor,
                item,
                location,
            } => self.handle_item(actor, item, location, ("drop", "drops"))?,
            Event::QuaffPotion {
                actor,
                item,
                location,
                effect,
            } => {
                if self.sees(actor) {
                    let who = self.individual(actor)?;
                    let potion = self.item(item, location)?;
                    let subject = self.name(who);
                    let potion_name = self.name(potion);
                    if let Some(kind) = effect {
                        self.identify_potion(potion, kind);
                    }
                    let suffix = potion_suffix(&subject, effect);
                    let text = act(
                        &subject,
                        &format!("drink {potion_name}{suffix}"),
                        &format!("drinks {potion_name}{suffix}"),
                    );
                    self.say(&text);
                    self.forget_unless_self(potion);
                }
            }
            Event::UseAbility {
                actor,
                ability,
                location,
            } => {
                if self.sees(actor) || self.sees_location(location) {
                    let who = self.individual(actor)?;
                    let (you_form, third_form) = match ability {
                        AbilityId::SpitBlindingVenom => {
                            ("spit blinding venom!", "spits blinding venom!")
                        }
                        AbilityId::ThrowTar => ("throw tar!", "throws tar!"),
                    };
                    let text = act(&self.name(who), you_form, third_form);
                    self.say(&text);
                }
            }
            Event::BeamHitIndividual {
                target,
                location,
                effect,
            } => {
                if self.sees(target) || self.sees_location(location) {
                    let target = self.individual(target)?;
                    let who = self.name(target);
                    if let Some(kind) = effect {
                        self.identify_zapped_wand(kind);
                    }
                    let text = match effect {
                        Some(WandKind::Striking) => format!("a magic beam strikes {who}!"),
                        Some(_) => format!("a magic beam hits {who}."),
                        None => format!("a magic beam hits {who}, but nothing happens."),
                    };
                    self.say(&text);
                }
            }
            Event::BeamHitWall { location, effect } => {
                if self.sees_location(location) {
                    let vision = self.knowledge.vision_at(location);
                    remember_tile(self.knowledge, location, self.world.tile(location), vision);
                    if let Some(kind) = effect {
                        self.identify_zapped_wand(kind);
                    }
                    let text = if effect == Some(WandKind::Digging) {
                        "a magic beam digs away a wall!"
                    } else {
                        "a magic beam hits a wall."
                    };
                    self.say(text);
                }
            }
            Event::MagicBulletHit { target, location } => {
                if self.sees(target) || self.sees_location(location) {
                    let target = self.individual(target)?;
                    let who = self.name(target);
                    self.say(&format!("a magic bullet hits {who}!"));
                }
            }
            Event::ItemHitsWall { item, location } => {
                if self.sees_location(location) {
                    let thrown = self.item(item, location)?;
                    let text = format!("{} hits a wall.", self.name(thrown));
                    self.say(&text);
                }
            }
            Event::ItemDropsToFloor { item, location } => {
                if self.sees_location(location) {
                    let dropped = self.item(item, location)?;
                    let text = format!("{} drops to the floor.", self.name(dropped));
                    self.say(&text);
                }
            }
            Event::PotionBreaks {
                item,
                location,
                target,
                effect,
            } => {
                let seen_target = target.filter(|id| self.sees(*id));
                if seen_target.is_some() || self.sees_location(location) {
                    let potion = self.item(item, location)?;
                    let potion_name = self.name(potion);
                    let text = match seen_target {
                        Some(target) => {
                            let target = self.individual(target)?;
                            let who = self.name(target);
                            if let Some(kind) = effect {
                                self.identify_potion(potion, kind);
                            }
                            let suffix = potion_suffix(&who, effect);
                            format!("{potion_name} breaks and splashes on {who}{suffix}")
                        }
                        // A splash on something unseen shows no effect.
                        None => format!("{potion_name} breaks."),
                    };
                    self.say(&text);
                    self.forget_unless_self(potion);
                }
            }
        }
        Ok(())
    }

    fn gain_status(&mut self, individual: ThingId, status: StatusEffectId) -> Result<(), CoreError> {
        let coord = self.world.coord_of(individual);
        let vanished = status == StatusEffectId::Invisibility && individual != self.observer;
        let noticed = if individual == self.observer {
            true
        } else if vanished {
            // Watching something turn invisible needs plain sight of its tile.
            coord.is_some_and(|c| self.knowledge.vision_at(c).contains(VisionTypes::NORMAL))
        } else {
            status.is_visible_with(self.vision_of(individual))
        };
        if !noticed {
            return Ok(());
        }
        let who = if vanished && !self.sees(individual) {
            let now = self.now();
            let remembered = self.knowledge.perceived(individual).is_some();
            match coord {
                Some(coord) if remembered => {
                    if let Some(known) = self.knowledge.perceived_things.get_mut(&individual) {
                        known.location = Location::Standing(coord);
                        known.last_seen_time = now;
                    }
                    Some(individual)
                }
                Some(coord) => Some(self.placeholder_at(coord)?),
                None => None,
            }
        } else {
            self.individual(individual)?
        };
        if let Some(known) = who.and_then(|id| self.knowledge.perceived_things.get_mut(&id)) {
            known.status_effects.insert(status);
        }
        if let Some((you_form, third_form)) = gain_status_phrases(status) {
            let text = act(&self.name(who), you_form, third_form);
            self.say(&text);
        }
        Ok(())
    }

    /// An event between two individuals: "X verbs Y." Returns the id used
    /// for the target, if noticed.
    fn between(
        &mut self,
        actor: ThingId,
        target: ThingId,
        (you_verb, third_verb): (&str, &str),
    ) -> Result<Option<ThingId>, CoreError> {
        if !(self.sees(actor) || self.sees(target)) {
            return Ok(None);
        }
        let who = self.individual(actor)?;
        let whom = self.individual(target)?;
        let object = self.name(whom);
        let text = act(
            &self.name(who),
            &format!("{you_verb} {object}."),
            &format!("{third_verb} {object}."),
        );
        self.say(&text);
        Ok(whom)
    }

    fn handle_item(
        &mut self,
        actor: ThingId,
        item: ThingId,
        location: Coord,
        (you_verb, third_verb): (&str, &str),
    ) -> Result<(), CoreError> {
        if self.sees(actor) || self.sees_location(location) {
            let who = self.individual(actor)?;
            let handled = self.item(item, location)?;
            let object = self.name(handled);
            let text = act(
                &self.name(who),
                &format!("{you_verb} {object}."),
                &format!("{third_verb} {object}."),
            );
            self.say(&text);
        }
        Ok(())
    }

    // ---- refresh ----

    fn refresh(&mut self) -> Result<(), CoreError> {
        let visible: Vec<ThingId> = self
            .world
            .things()
            .filter(|t| t.location.container().is_none())
            .map(|t| t.id)
            .filter(|id| self.sees(*id))
            .collect();
        for id in visible {
            self.record_tree(id)?;
        }
        let stale: Vec<ThingId> = self
            .knowledge
            .perceived_things
            .values()
            .filter(|p| self.should_forget(p))
            .map(|p| p.id)
            .collect();
        for id in stale {
            self.knowledge.forget(id);
        }
        self.knowledge.fix_z_orders();
        Ok(())
    }

    fn should_forget(&self, perceived: &PerceivedThing) -> bool {
        if perceived.id == self.observer {
            return false;
        }
        if perceived.is_placeholder {
            let age = self.now().saturating_sub(perceived.last_seen_time);
            if let Some(holder) = perceived.location.container() {
                return age >= PLACEHOLDER_TIMEOUT || self.knowledge.perceived(holder).is_none();
            }
            let felt = perceived
                .location
                .coord()
                .is_none_or(|c| self.knowledge.vision_at(c).can_see_physical_presence());
            return age >= PLACEHOLDER_TIMEOUT || felt;
        }
        if self.sees(perceived.id) {
            return false;
        }
        let mindless = self.world.get(self.observer).is_some_and(|t| !t.has_mind());
        if mindless {
            return true;
        }
        match perceived.location {
            Location::Nowhere => true,
            Location::Standing(coord) => {
                let vision = self.knowledge.vision_at(coord);
                let could_be_invisible = perceived.has_status(StatusEffectId::Invisibility)
                    && !vision.can_see_physical_presence();
                vision.can_see_shape() && !could_be_invisible
            }
            Location::Floor { coord, .. } => self.knowledge.vision_at(coord).can_see_shape(),
            Location::Inventory { container, .. } => self.vision_of(container).can_see_shape(),
        }
    }
}

/// The end of a drinking or splashing sentence.
fn potion_suffix(subject: &str, effect: Option<PotionKind>) -> String {
    match effect {
        Some(PotionKind::Healing) => format!("; {}", act(subject, "are healed!", "is healed!")),
        Some(_) => ".".to_owned(),
        None => ", but nothing happens.".to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_types::{BookKind, DecisionMakerType, StatusEffect, StatusKind, ThingSignature, TileType};
    use delve_world::map::test_level;
    use delve_world::spawn::{create_item, spawn_individual};
    use delve_world::{ItemIdentities, SeededRandom};

    use super::*;
    use crate::config::WorldConfig;

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
            spawn_individual(&mut self.world, &mut self.rng, species, DecisionMakerType::Ai, at)
                .unwrap()
        }

        fn give(&mut self, owner: ThingId, signature: ThingSignature) -> ThingId {
            create_item(
                &mut self.world,
                &mut self.rng,
                signature,
                Location::Inventory {
                    container: owner,
                    z_order: 0,
                },
            )
            .unwrap()
        }

        fn afflict(&mut self, id: ThingId, kind: StatusKind) {
            self.world.thing_mut(id).unwrap().put_status(StatusEffect {
                kind,
                expiration_time: 1000,
            });
        }

        fn with_context<T>(&mut self, f: impl FnOnce(&mut StepContext<'_>) -> T) -> T {
            let mut ctx = StepContext::new(&mut self.world, &mut self.rng, &self.config);
            f(&mut ctx)
        }

        fn refresh(&mut self) {
            self.with_context(|ctx| refresh_all(ctx, true)).unwrap();
        }

        fn publish(&mut self, event: Event) {
            self.with_context(|ctx| ctx.publish(event)).unwrap();
        }

        fn knowledge(&self, id: ThingId) -> &Knowledge {
            &self.world.thing(id).unwrap().life().unwrap().knowledge
        }

        fn sentences(&self, id: ThingId) -> Vec<String> {
            self.knowledge(id)
                .narration
                .sentences()
                .map(str::to_owned)
                .collect()
        }
    }

    #[test]
    fn visible_events_are_narrated_to_every_watcher() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let dog = fx.spawn(SpeciesId::Dog, Coord::new(9, 5));
        fx.refresh();
        fx.publish(Event::AttackIndividual {
            actor: dog,
            target: watcher,
        });
        assert_eq!(fx.sentences(watcher), vec!["A dog hits you.".to_owned()]);
        assert_eq!(fx.sentences(dog), vec!["You hit a human.".to_owned()]);
    }

    #[test]
    fn invisible_targets_become_placeholders() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let ogre = fx.spawn(SpeciesId::Ogre, Coord::new(12, 5));
        fx.afflict(ogre, StatusKind::Invisibility);
        fx.refresh();
        assert!(fx.knowledge(watcher).perceived(ogre).is_none());

        fx.publish(Event::BeamHitIndividual {
            target: ogre,
            location: Coord::new(12, 5),
            effect: None,
        });
        let knowledge = fx.knowledge(watcher);
        assert!(knowledge.perceived(ogre).is_none());
        let placeholder = knowledge.perceived_individual_at(Coord::new(12, 5)).unwrap();
        assert!(placeholder.is_placeholder);
        assert!(placeholder.has_status(StatusEffectId::Invisibility));
        assert_eq!(
            fx.sentences(watcher),
            vec!["A magic beam hits something, but nothing happens.".to_owned()]
        );
    }

    #[test]
    fn placeholders_are_reused_then_time_out() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let ogre = fx.spawn(SpeciesId::Ogre, Coord::new(12, 5));
        fx.afflict(ogre, StatusKind::Invisibility);
        fx.refresh();
        let hit = Event::MagicBulletHit {
            target: ogre,
            location: Coord::new(12, 5),
        };
        fx.publish(hit);
        fx.publish(hit);
        let placeholders = fx
            .knowledge(watcher)
            .perceived_things
            .values()
            .filter(|p| p.is_placeholder)
            .count();
        assert_eq!(placeholders, 1);

        fx.refresh();
        assert!(fx.knowledge(watcher).perceived_individual_at(Coord::new(12, 5)).is_some());
        fx.world.set_time(PLACEHOLDER_TIMEOUT);
        fx.refresh();
        assert!(fx.knowledge(watcher).perceived_individual_at(Coord::new(12, 5)).is_none());
    }

    #[test]
    fn watching_a_zap_identifies_the_wand() {
        let mut fx = Fixture::new();
        let zapper = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let target = fx.spawn(SpeciesId::Dog, Coord::new(8, 5));
        let wand = fx.give(zapper, ThingSignature::Wand(Some(WandKind::Confusion)));
        fx.refresh();
        fx.with_context(|ctx| {
            ctx.publish(Event::ZapWand {
                actor: zapper,
                item: wand,
                location: Coord::new(5, 5),
            })?;
            ctx.publish(Event::BeamHitIndividual {
                target,
                location: Coord::new(8, 5),
                effect: Some(WandKind::Confusion),
            })?;
            ctx.end_zap();
            Ok::<(), CoreError>(())
        })
        .unwrap();

        let knowledge = fx.knowledge(zapper);
        assert_eq!(
            knowledge.wand_identities.get(&WandDescription::Bone),
            Some(&WandKind::Confusion)
        );
        assert!(matches!(
            knowledge.perceived(wand).unwrap().kind,
            PerceivedKind::Wand { used_count: 1, .. }
        ));
        assert_eq!(
            fx.sentences(zapper),
            vec![
                "You zap a bone wand.".to_owned(),
                "A magic beam hits a dog.".to_owned()
            ]
        );
        // The dog watched the whole thing from the other end.
        assert_eq!(
            fx.knowledge(target).wand_identities.get(&WandDescription::Bone),
            Some(&WandKind::Confusion)
        );
    }

    #[test]
    fn hidden_zappers_keep_their_wands_hidden() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let zapper = fx.spawn(SpeciesId::Human, Coord::new(12, 5));
        let dog = fx.spawn(SpeciesId::Dog, Coord::new(8, 5));
        let wand = fx.give(zapper, ThingSignature::Wand(Some(WandKind::Confusion)));
        fx.afflict(zapper, StatusKind::Invisibility);
        fx.refresh();
        fx.with_context(|ctx| {
            ctx.publish(Event::ZapWand {
                actor: zapper,
                item: wand,
                location: Coord::new(12, 5),
            })?;
            ctx.publish(Event::BeamHitIndividual {
                target: dog,
                location: Coord::new(8, 5),
                effect: Some(WandKind::Confusion),
            })?;
            ctx.end_zap();
            Ok::<(), CoreError>(())
        })
        .unwrap();
        fx.refresh();

        let knowledge = fx.knowledge(watcher);
        assert!(knowledge.perceived(wand).is_none());
        assert!(knowledge.wand_identities.is_empty());
        let holder = knowledge.perceived_individual_at(Coord::new(12, 5)).unwrap();
        assert!(holder.is_placeholder);
        let carried = knowledge.perceived_inventory(holder.id);
        assert_eq!(carried.len(), 1);
        let unseen = carried.first().unwrap();
        assert!(unseen.is_placeholder);
        assert!(matches!(
            unseen.kind,
            PerceivedKind::Wand {
                description: None,
                used_count: 1
            }
        ));
        assert_eq!(
            fx.sentences(watcher),
            vec![
                "Something zaps a wand.".to_owned(),
                "A magic beam hits a dog.".to_owned()
            ]
        );
    }

    #[test]
    fn splashing_something_unseen_reveals_nothing() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let ogre = fx.spawn(SpeciesId::Ogre, Coord::new(12, 5));
        fx.afflict(ogre, StatusKind::Invisibility);
        let potion = create_item(
            &mut fx.world,
            &mut fx.rng,
            ThingSignature::Potion(Some(PotionKind::Blindness)),
            Location::Floor {
                coord: Coord::new(12, 5),
                z_order: 0,
            },
        )
        .unwrap();
        fx.refresh();
        fx.publish(Event::PotionBreaks {
            item: potion,
            location: Coord::new(12, 5),
            target: Some(ogre),
            effect: Some(PotionKind::Blindness),
        });

        let knowledge = fx.knowledge(watcher);
        assert!(knowledge.potion_identities.is_empty());
        assert!(knowledge.perceived_individual_at(Coord::new(12, 5)).is_none());
        assert_eq!(
            fx.sentences(watcher),
            vec!["An orange potion breaks.".to_owned()]
        );
    }

    #[test]
    fn bumps_by_the_unseen_go_unnoticed() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let ogre = fx.spawn(SpeciesId::Ogre, Coord::new(12, 5));
        fx.world
            .set_tile_type(Coord::new(13, 5), TileType::BrownBrickWall)
            .unwrap();
        fx.afflict(ogre, StatusKind::Invisibility);
        fx.refresh();
        fx.publish(Event::BumpIntoLocation {
            actor: ogre,
            location: Coord::new(13, 5),
        });
        fx.publish(Event::AttackLocation {
            actor: ogre,
            location: Coord::new(13, 5),
        });

        assert!(fx.sentences(watcher).is_empty());
        assert!(
            fx.knowledge(watcher)
                .perceived_individual_at(Coord::new(12, 5))
                .is_none()
        );
        assert_eq!(
            fx.sentences(ogre),
            vec![
                "You bump into a wall.".to_owned(),
                "You attack a wall.".to_owned()
            ]
        );
    }

    #[test]
    fn items_are_named_as_they_looked_before_use() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let reader = fx.spawn(SpeciesId::Human, Coord::new(7, 5));
        let book = fx.give(reader, ThingSignature::Book(Some(BookKind::Speed)));
        let potion = fx.give(reader, ThingSignature::Potion(Some(PotionKind::Cogniscopy)));
        fx.refresh();
        fx.publish(Event::ReadBook {
            actor: reader,
            item: book,
            effect: Some(BookKind::Speed),
        });
        fx.publish(Event::QuaffPotion {
            actor: reader,
            item: potion,
            location: Coord::new(7, 5),
            effect: Some(PotionKind::Cogniscopy),
        });

        assert_eq!(
            fx.sentences(watcher),
            vec![
                "A human reads a blue book.".to_owned(),
                "A human drinks a yellow potion.".to_owned()
            ]
        );
        let knowledge = fx.knowledge(watcher);
        assert_eq!(
            knowledge.book_identities.values().collect::<Vec<_>>(),
            vec![&BookKind::Speed]
        );
        assert_eq!(
            knowledge.potion_identities.values().collect::<Vec<_>>(),
            vec![&PotionKind::Cogniscopy]
        );
    }

    #[test]
    fn fizzled_spells_are_only_noticed_by_the_reader() {
        let mut fx = Fixture::new();
        let reader = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(7, 5));
        let book = fx.give(reader, ThingSignature::Book(Some(BookKind::MagicBullet)));
        fx.refresh();
        fx.publish(Event::ReadBook {
            actor: reader,
            item: book,
            effect: None,
        });
        assert_eq!(
            fx.sentences(reader),
            vec!["You read a purple book, but nothing happens.".to_owned()]
        );
        assert!(fx.sentences(watcher).is_empty());
    }

    #[test]
    fn status_changes_need_the_right_vision() {
        let mut fx = Fixture::new();
        let human = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(7, 5));
        fx.refresh();
        fx.publish(Event::GainStatus {
            individual: human,
            status: StatusEffectId::Cogniscopy,
        });
        fx.publish(Event::GainStatus {
            individual: human,
            status: StatusEffectId::Confusion,
        });
        assert_eq!(
            fx.sentences(human),
            vec!["You gain cogniscopy!".to_owned(), "You are confused!".to_owned()]
        );
        assert_eq!(fx.sentences(watcher), vec!["A human is confused!".to_owned()]);
    }

    #[test]
    fn turning_invisible_is_seen_and_remembered() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let ogre = fx.spawn(SpeciesId::Ogre, Coord::new(12, 5));
        fx.refresh();
        fx.afflict(ogre, StatusKind::Invisibility);
        fx.publish(Event::GainStatus {
            individual: ogre,
            status: StatusEffectId::Invisibility,
        });
        assert_eq!(fx.sentences(watcher), vec!["An ogre turns invisible!".to_owned()]);
        fx.refresh();
        let known = fx.knowledge(watcher).perceived(ogre).unwrap();
        assert!(known.has_status(StatusEffectId::Invisibility));
        assert_eq!(known.location, Location::Standing(Coord::new(12, 5)));
    }

    #[test]
    fn remembered_things_are_forgotten_once_seen_gone() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let dog = fx.spawn(SpeciesId::Dog, Coord::new(20, 5));
        fx.refresh();
        assert!(fx.knowledge(watcher).perceived(dog).is_some());

        // Behind a wall the dog is remembered where it was last seen.
        fx.world.set_tile_type(Coord::new(6, 5), TileType::BrownBrickWall).unwrap();
        fx.world.set_tile_type(Coord::new(6, 4), TileType::BrownBrickWall).unwrap();
        fx.world.set_tile_type(Coord::new(6, 6), TileType::BrownBrickWall).unwrap();
        fx.world.place_standing(dog, Coord::new(21, 5)).unwrap();
        fx.refresh();
        assert_eq!(
            fx.knowledge(watcher).perceived(dog).unwrap().location,
            Location::Standing(Coord::new(20, 5))
        );

        // With the wall gone, the empty tile proves it left. The watcher never
        // saw it turn invisible, so nothing suggests it is still around.
        fx.afflict(dog, StatusKind::Invisibility);
        fx.world.set_tile_type(Coord::new(6, 5), TileType::DirtFloor).unwrap();
        fx.world.set_tile_type(Coord::new(6, 4), TileType::DirtFloor).unwrap();
        fx.world.set_tile_type(Coord::new(6, 6), TileType::DirtFloor).unwrap();
        fx.refresh();
        assert!(fx.knowledge(watcher).perceived(dog).is_none());
    }

    #[test]
    fn deleted_things_are_forgotten_by_everyone() {
        let mut fx = Fixture::new();
        let watcher = fx.spawn(SpeciesId::Human, Coord::new(5, 5));
        let dog = fx.spawn(SpeciesId::Dog, Coord::new(9, 5));
        fx.refresh();
        fx.publish(Event::DeleteThing { thing: dog });
        assert!(fx.knowledge(watcher).perceived(dog).is_none());
    }
}
