//! Sentences for the narration log.
//!
//! Everything here describes things the way a particular observer knows
//! them: the observer itself is "you", placeholders and unknown things are
//! "something", and items are named by identified kind, then by seen
//! description, then by category alone.

use delve_types::{StatusEffectId, ThingId};
use delve_world::{Knowledge, PerceivedKind};

/// Name used for a participant the observer cannot identify.
pub const SOMETHING: &str = "something";

/// Name used for the observer itself.
pub const YOU: &str = "you";

/// A snake_case token as words.
pub fn words(token: &str) -> String {
    token.replace('_', " ")
}

/// Prefix a noun phrase with "a" or "an".
pub fn with_article(noun: &str) -> String {
    let vowel = noun
        .chars()
        .next()
        .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'));
    if vowel {
        format!("an {noun}")
    } else {
        format!("a {noun}")
    }
}

/// Upper-case the first letter of a sentence.
pub fn capitalize(sentence: &str) -> String {
    let mut chars = sentence.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// How `observer` refers to a participant. `None` is a participant nobody
/// could make out.
pub fn describe(knowledge: &Knowledge, observer: ThingId, id: Option<ThingId>) -> String {
    let Some(id) = id else {
        return SOMETHING.to_owned();
    };
    if id == observer {
        return YOU.to_owned();
    }
    let Some(thing) = knowledge.perceived(id) else {
        return SOMETHING.to_owned();
    };
    if thing.is_placeholder && thing.is_individual() {
        return SOMETHING.to_owned();
    }
    match thing.kind {
        PerceivedKind::Individual { species, .. } => with_article(&words(species.name())),
        PerceivedKind::Wand { description, .. } => {
            match (
                description,
                description.and_then(|d| knowledge.wand_identities.get(&d)),
            ) {
                (_, Some(kind)) => format!("a wand of {}", words(kind.name())),
                (Some(description), None) => {
                    with_article(&format!("{} wand", words(description.name())))
                }
                (None, None) => "a wand".to_owned(),
            }
        }
        PerceivedKind::Potion { description } => {
            match (
                description,
                description.and_then(|d| knowledge.potion_identities.get(&d)),
            ) {
                (_, Some(kind)) => format!("a potion of {}", words(kind.name())),
                (Some(description), None) => {
                    with_article(&format!("{} potion", words(description.name())))
                }
                (None, None) => "a potion".to_owned(),
            }
        }
        PerceivedKind::Book { description } => {
            match (
                description,
                description.and_then(|d| knowledge.book_identities.get(&d)),
            ) {
                (_, Some(kind)) => format!("a book of {}", words(kind.name())),
                (Some(description), None) => {
                    with_article(&format!("{} book", words(description.name())))
                }
                (None, None) => "a book".to_owned(),
            }
        }
        PerceivedKind::Weapon { kind } => with_article(&words(kind.name())),
    }
}

/// A subject and its verb phrase, conjugated for "you" or a third person.
pub fn act(subject: &str, you_form: &str, third_form: &str) -> String {
    if subject == YOU {
        format!("{subject} {you_form}")
    } else {
        format!("{subject} {third_form}")
    }
}

/// The verb phrases for gaining a status: `(you form, third-person form)`.
pub const fn gain_status_phrases(status: StatusEffectId) -> Option<(&'static str, &'static str)> {
    Some(match status {
        StatusEffectId::Confusion => ("are confused!", "is confused!"),
        StatusEffectId::Speed => ("speed up!", "speeds up!"),
        StatusEffectId::EtherealVision => ("gain ethereal vision!", "gains ethereal vision!"),
        StatusEffectId::Cogniscopy => ("gain cogniscopy!", "gains cogniscopy!"),
        StatusEffectId::Blindness => ("are blinded!", "is blinded!"),
        StatusEffectId::Invisibility => ("turn invisible!", "turns invisible!"),
        StatusEffectId::Poison => ("are poisoned!", "is poisoned!"),
        StatusEffectId::Slowing => ("slow down!", "slows down!"),
        StatusEffectId::Polymorph => return None,
    })
}

/// The verb phrases for losing a status: `(you form, third-person form)`.
pub const fn lose_status_phrases(status: StatusEffectId) -> Option<(&'static str, &'static str)> {
    Some(match status {
        StatusEffectId::Confusion => ("are no longer confused.", "is no longer confused."),
        StatusEffectId::Speed => (
            "slow back down to normal speed.",
            "slows back down to normal speed.",
        ),
        StatusEffectId::EtherealVision => (
            "no longer have ethereal vision.",
            "no longer has ethereal vision.",
        ),
        StatusEffectId::Cogniscopy => ("are no longer cogniscopic.", "is no longer cogniscopic."),
        StatusEffectId::Blindness => ("are no longer blind.", "is no longer blind."),
        StatusEffectId::Invisibility => ("are no longer invisible.", "is no longer invisible."),
        StatusEffectId::Poison => ("are no longer poisoned.", "is no longer poisoned."),
        StatusEffectId::Slowing => (
            "speed back up to normal speed.",
            "speeds back up to normal speed.",
        ),
        StatusEffectId::Polymorph => return None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_types::{
        Coord, PotionDescription, PotionKind, SpeciesId, Team, WandDescription, WandKind,
    };
    use delve_world::{Location, PerceivedThing};

    use super::*;

    fn observe(knowledge: &mut Knowledge, id: u64, kind: PerceivedKind, placeholder: bool) -> ThingId {
        let id = ThingId::from_u64(id);
        knowledge.perceived_things.insert(
            id,
            PerceivedThing::new(id, placeholder, kind, Location::Standing(Coord::new(1, 1)), 0),
        );
        id
    }

    #[test]
    fn articles_follow_the_first_letter() {
        assert_eq!(with_article("ogre"), "an ogre");
        assert_eq!(with_article("pink blob"), "a pink blob");
        assert_eq!(capitalize("an ant bites you."), "An ant bites you.");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn the_observer_is_you_and_strangers_are_something() {
        let mut knowledge = Knowledge::new();
        let me = observe(
            &mut knowledge,
            1,
            PerceivedKind::Individual {
                species: SpeciesId::Human,
                team: Team::Good,
            },
            false,
        );
        let ghost = observe(
            &mut knowledge,
            2,
            PerceivedKind::Individual {
                species: SpeciesId::Human,
                team: Team::Bad,
            },
            true,
        );
        assert_eq!(describe(&knowledge, me, Some(me)), "you");
        assert_eq!(describe(&knowledge, me, Some(ghost)), "something");
        assert_eq!(describe(&knowledge, me, Some(ThingId::from_u64(9))), "something");
        assert_eq!(describe(&knowledge, me, None), "something");
        assert_eq!(act("you", "are confused!", "is confused!"), "you are confused!");
    }

    #[test]
    fn items_are_named_by_what_is_known() {
        let mut knowledge = Knowledge::new();
        let me = ThingId::from_u64(1);
        let wand = observe(
            &mut knowledge,
            2,
            PerceivedKind::Wand {
                description: Some(WandDescription::ShinyBone),
                used_count: 0,
            },
            false,
        );
        let potion = observe(
            &mut knowledge,
            3,
            PerceivedKind::Potion {
                description: Some(PotionDescription::Orange),
            },
            false,
        );
        let blurry = observe(&mut knowledge, 4, PerceivedKind::Potion { description: None }, false);
        assert_eq!(describe(&knowledge, me, Some(wand)), "a shiny bone wand");
        assert_eq!(describe(&knowledge, me, Some(potion)), "an orange potion");
        assert_eq!(describe(&knowledge, me, Some(blurry)), "a potion");
        knowledge.identify_wand(WandDescription::ShinyBone, WandKind::Digging);
        knowledge.identify_potion(PotionDescription::Orange, PotionKind::EtherealVision);
        assert_eq!(describe(&knowledge, me, Some(wand)), "a wand of digging");
        assert_eq!(describe(&knowledge, me, Some(potion)), "a potion of ethereal vision");
    }

    #[test]
    fn every_status_but_polymorph_has_phrases() {
        for status in StatusEffectId::ALL {
            let expected = *status != StatusEffectId::Polymorph;
            assert_eq!(gain_status_phrases(*status).is_some(), expected);
            assert_eq!(lose_status_phrases(*status).is_some(), expected);
        }
    }
}
