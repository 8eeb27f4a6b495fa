//! Test-script expectations.
//!
//! Test scripts are ordinary save files with extra directives interleaved
//! between the actions. Each directive checks what the player's individual
//! knows at that point of the replay:
//!
//! - `@mark_events` forgets all narration so far;
//! - `@expect_event "text"` consumes the next narrated sentence;
//! - `@expect_no_events` requires that nothing new was narrated;
//! - `@find_things_at x y` lists the things the player perceives on a tile;
//! - `@expect_thing <type> <name>` consumes the next listed thing and lists
//!   what it is seen carrying;
//! - `@expect_nothing` requires the list to be used up;
//! - `@expect_carrying <type> <name>` and `@expect_carrying_nothing` do the
//!   same for the carried list.
//!
//! Item names compare against the true description of that kind in this
//! game, so a script can say `wand digging` before the player has
//! identified anything; `unknown` matches an item whose description was
//! never seen.

use std::collections::VecDeque;

use delve_types::{ThingId, ThingSignature};
use delve_world::{ItemIdentities, Knowledge, Narration, PerceivedKind, PerceivedThing, World};

use crate::codec::{parse_coord, parse_quoted, parse_signature, signature};
use crate::error::Diagnostic;
use crate::token::Line;

/// Every directive keyword handled here.
pub const TEST_DIRECTIVES: &[&str] = &[
    "@mark_events",
    "@expect_event",
    "@expect_no_events",
    "@find_things_at",
    "@expect_thing",
    "@expect_nothing",
    "@expect_carrying",
    "@expect_carrying_nothing",
];

/// Whether a perceived thing looks like a signature, judged with the true
/// item identities.
pub fn matches_signature(
    thing: &PerceivedThing,
    expected: ThingSignature,
    identities: &ItemIdentities,
) -> bool {
    match (thing.kind, expected) {
        (PerceivedKind::Individual { species, .. }, ThingSignature::Individual(want)) => {
            !thing.is_placeholder && species == want
        }
        (PerceivedKind::Wand { description, .. }, ThingSignature::Wand(want)) => {
            description == want.map(|kind| identities.wand_description(kind))
        }
        (PerceivedKind::Potion { description }, ThingSignature::Potion(want)) => {
            description == want.map(|kind| identities.potion_description(kind))
        }
        (PerceivedKind::Book { description }, ThingSignature::Book(want)) => {
            description == want.map(|kind| identities.book_description(kind))
        }
        (PerceivedKind::Weapon { kind }, ThingSignature::Weapon(want)) => kind == want,
        _ => false,
    }
}

/// The signature a perceived thing would be written as in a script.
pub fn signature_of(thing: &PerceivedThing, identities: &ItemIdentities) -> ThingSignature {
    match thing.kind {
        PerceivedKind::Individual { species, .. } => ThingSignature::Individual(species),
        PerceivedKind::Wand { description, .. } => {
            ThingSignature::Wand(description.and_then(|d| identities.wand_kind_of(d)))
        }
        PerceivedKind::Potion { description } => {
            ThingSignature::Potion(description.and_then(|d| identities.potion_kind_of(d)))
        }
        PerceivedKind::Book { description } => {
            ThingSignature::Book(description.and_then(|d| identities.book_kind_of(d)))
        }
        PerceivedKind::Weapon { kind } => ThingSignature::Weapon(kind),
    }
}

/// How a failed expectation names a perceived thing. Placeholders have no
/// species to name.
fn describe(thing: &PerceivedThing, identities: &ItemIdentities) -> String {
    if thing.is_placeholder {
        "something".to_owned()
    } else {
        signature(signature_of(thing, identities))
    }
}

/// Progress through a test script's expectations.
#[derive(Debug, Clone, Default)]
pub struct Expectations {
    event_cursor: u64,
    found: VecDeque<ThingId>,
    carrying: VecDeque<ThingId>,
}

fn player_knowledge(world: &World) -> Result<&Knowledge, Diagnostic> {
    world
        .you()
        .and_then(|you| world.get(you))
        .and_then(|thing| thing.life())
        .map(|life| &life.knowledge)
        .ok_or_else(|| Diagnostic::line("no player individual"))
}

fn expected_signature(line: &Line) -> Result<ThingSignature, Diagnostic> {
    match line.expect_args(2)? {
        [thing_type, name] => parse_signature(thing_type, name),
        _ => Err(Diagnostic::line("expected 2 arguments")),
    }
}

impl Expectations {
    /// Fresh state: no mark, empty lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one test directive against the live world.
    ///
    /// # Errors
    ///
    /// Returns the failed expectation, or a malformed-argument diagnostic.
    pub fn run(&mut self, line: &Line, world: &World) -> Result<(), Diagnostic> {
        let knowledge = player_knowledge(world)?;
        let identities = world.identities();
        match line.keyword() {
            "@mark_events" => {
                line.expect_args(0)?;
                self.event_cursor = knowledge.narration.total();
            }
            "@expect_event" => {
                let expected = match line.expect_args(1)? {
                    [text] => parse_quoted(text)?,
                    _ => return Err(Diagnostic::line("expected 1 arguments")),
                };
                let actual = self
                    .next_sentence(knowledge)
                    .ok_or_else(|| Diagnostic::line("no new events."))?;
                if actual != expected {
                    return Err(Diagnostic::line(format!(
                        "expected event text \"{expected}\". got \"{actual}\"."
                    )));
                }
            }
            "@expect_no_events" => {
                line.expect_args(0)?;
                if let Some(actual) = self.next_sentence(knowledge) {
                    return Err(Diagnostic::line(format!(
                        "expected no events. got \"{actual}\"."
                    )));
                }
            }
            "@find_things_at" => {
                let coord = match line.expect_args(2)? {
                    [x, y] => parse_coord(x, y)?,
                    _ => return Err(Diagnostic::line("expected 2 arguments")),
                };
                self.found = knowledge
                    .perceived_at(coord)
                    .into_iter()
                    .map(|thing| thing.id)
                    .collect();
            }
            "@expect_thing" => {
                let expected = expected_signature(line)?;
                let thing = Self::take_matching(&mut self.found, knowledge, identities, expected)?;
                self.carrying = knowledge
                    .perceived_inventory(thing)
                    .into_iter()
                    .map(|item| item.id)
                    .collect();
            }
            "@expect_carrying" => {
                let expected = expected_signature(line)?;
                Self::take_matching(&mut self.carrying, knowledge, identities, expected)?;
            }
            "@expect_nothing" | "@expect_carrying_nothing" => {
                line.expect_args(0)?;
                let list = if line.keyword() == "@expect_nothing" {
                    &self.found
                } else {
                    &self.carrying
                };
                if let Some(thing) = list.front().and_then(|id| knowledge.perceived(*id)) {
                    return Err(Diagnostic::line(format!(
                        "expected nothing. found at least: {}.",
                        describe(thing, identities)
                    )));
                }
            }
            _ => return Err(Diagnostic::line("undefined directive")),
        }
        Ok(())
    }

    /// The next narrated sentence after the cursor, skipping separators.
    fn next_sentence(&mut self, knowledge: &Knowledge) -> Option<String> {
        for entry in knowledge.narration.since(self.event_cursor) {
            self.event_cursor = self.event_cursor.saturating_add(1);
            if let Narration::Sentence(text) = entry {
                return Some(text.clone());
            }
        }
        None
    }

    fn take_matching(
        list: &mut VecDeque<ThingId>,
        knowledge: &Knowledge,
        identities: &ItemIdentities,
        expected: ThingSignature,
    ) -> Result<ThingId, Diagnostic> {
        let wanted = signature(expected);
        let id = list
            .front()
            .copied()
            .ok_or_else(|| Diagnostic::line(format!("expected {wanted}, found nothing.")))?;
        let matched = knowledge
            .perceived(id)
            .is_some_and(|thing| matches_signature(thing, expected, identities));
        if !matched {
            return Err(Diagnostic::line(format!(
                "expected {wanted}, found other things."
            )));
        }
        list.pop_front();
        Ok(id)
    }
}
