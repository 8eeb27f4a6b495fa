//! Canonical full-state snapshots.
//!
//! A [`Snapshot`] is everything about the authoritative world that must
//! come out the same when a game is replayed: the item identity permutation,
//! the clock, the terrain, the random generator's position, and every thing
//! with its life and knowledge. Narration and current vision are left out;
//! they are derived.
//!
//! Snapshots are embedded in save files as a block of directive lines:
//!
//! ```text
//! @snapshot <wand descriptions> . <potion descriptions> . <book descriptions> . <you> <actor> <time> <things> <level>
//! @map_tiles <one char per tile>
//! @aesthetics <two hex digits per tile>
//! @rng_state seeded <seed> <draws>
//! @thing <id> <exists> <location> <type> <payload> <statuses>
//! @status_effect <name> <expiration> [<next damage> <responsible> | <species>]
//! @life <hp> <hp deadline> <mana> <mp deadline> <exp> <last move> <last action> <initiative> <controller> <team> <cooldowns>
//! @ability_cooldown <name> <expiration>
//! @knowledge <wand kinds> . <potion kinds> . <book kinds> . <perceived>
//! @map_tiles <one char per remembered tile>
//! @perceived_thing <id> <placeholder> <last seen> <location> <type> <payload> <statuses> <names...>
//! ```
//!
//! Locations are `nowhere`, `standing x y`, `floor x y z`, or
//! `inventory <container> z`. On replay the block is parsed back into a
//! [`Snapshot`] and compared with a capture of the live world.

use delve_types::{
    AbilityId, BookDescription, BookKind, Coord, DecisionMakerType, Initiative, MAP_HEIGHT,
    MAP_WIDTH, MapMatrix, PotionDescription, PotionKind, SpeciesId, StatusEffect, StatusEffectId,
    StatusKind, Team, ThingId, TileType, WandDescription, WandKind, WeaponKind,
};
use delve_world::{
    AbilityCooldown, Knowledge, Location, PerceivedKind, PerceivedThing, RandomState, Thing,
    ThingKind, Tile, World,
};
use serde::{Deserialize, Serialize};

use crate::codec::{
    flag, hex_u32, optional_id, parse_flag, parse_hex_u32, parse_i32, parse_i64, parse_named,
    parse_optional_id, parse_thing_id, parse_u64, parse_uint256, parse_usize,
};
use crate::error::{Diagnostic, ReplayError};
use crate::token::{Line, Script, Token};

/// Directive keywords that only make sense inside a snapshot block.
pub const SNAPSHOT_DIRECTIVES: &[&str] = &[
    "@map_tiles",
    "@aesthetics",
    "@rng_state",
    "@thing",
    "@status_effect",
    "@life",
    "@ability_cooldown",
    "@knowledge",
    "@perceived_thing",
];

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The variant payload of a recorded thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindRecord {
    /// An individual and its original species.
    Individual(SpeciesId),
    /// A wand and its remaining charges.
    Wand {
        /// True kind.
        kind: WandKind,
        /// Charges left.
        charges: i32,
    },
    /// A potion.
    Potion(PotionKind),
    /// A book.
    Book(BookKind),
    /// A weapon.
    Weapon(WeaponKind),
}

/// An individual's knowledge, minus narration and current vision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// Identified kind per wand description, in canonical order.
    pub wand_identities: Vec<Option<WandKind>>,
    /// Identified kind per potion description.
    pub potion_identities: Vec<Option<PotionKind>>,
    /// Identified kind per book description.
    pub book_identities: Vec<Option<BookKind>>,
    /// Remembered terrain, one char per tile.
    pub map_tiles: String,
    /// Perceived things in id order.
    pub perceived: Vec<PerceivedThing>,
}

/// An individual's life data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeRecord {
    /// Current hitpoints.
    pub hitpoints: i32,
    /// Next hitpoint regeneration tick.
    pub hp_regen_deadline: i64,
    /// Current mana.
    pub mana: i32,
    /// Next mana regeneration tick.
    pub mp_regen_deadline: i64,
    /// Experience points.
    pub experience: i32,
    /// Last movement bookkeeping tick.
    pub last_movement_time: i64,
    /// Last action bookkeeping tick.
    pub last_action_time: i64,
    /// Turn-order key.
    pub initiative: Initiative,
    /// Controller.
    pub decision_maker: DecisionMakerType,
    /// Allegiance.
    pub team: Team,
    /// Cooling abilities.
    pub ability_cooldowns: Vec<AbilityCooldown>,
    /// What it knows.
    pub knowledge: KnowledgeRecord,
}

/// One thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingRecord {
    /// Its id.
    pub id: ThingId,
    /// False once destroyed but not yet removed.
    pub still_exists: bool,
    /// Where it is.
    pub location: Location,
    /// Variant payload.
    pub kind: KindRecord,
    /// Active status effects, in id order.
    pub status_effects: Vec<StatusEffect>,
    /// Life data for individuals.
    pub life: Option<LifeRecord>,
}

/// A canonical capture of the whole authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Description of each wand kind.
    pub wand_descriptions: Vec<WandDescription>,
    /// Description of each potion kind.
    pub potion_descriptions: Vec<PotionDescription>,
    /// Description of each book kind.
    pub book_descriptions: Vec<BookDescription>,
    /// The player's individual.
    pub you: Option<ThingId>,
    /// Whose decision was about to be recorded.
    pub actor: Option<ThingId>,
    /// The tick.
    pub time: i64,
    /// Current depth.
    pub dungeon_level: i32,
    /// Terrain, one char per tile.
    pub map_tiles: String,
    /// Aesthetic indices, two hex digits per tile.
    pub aesthetics: String,
    /// Random generator position.
    pub rng: RandomState,
    /// Every thing, in id order.
    pub things: Vec<ThingRecord>,
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

fn tile_chars(tiles: &MapMatrix<Tile>) -> String {
    tiles.iter().map(|tile| tile.tile_type.short_char()).collect()
}

fn capture_knowledge(knowledge: &Knowledge) -> KnowledgeRecord {
    KnowledgeRecord {
        wand_identities: WandDescription::ALL
            .iter()
            .map(|d| knowledge.wand_identities.get(d).copied())
            .collect(),
        potion_identities: PotionDescription::ALL
            .iter()
            .map(|d| knowledge.potion_identities.get(d).copied())
            .collect(),
        book_identities: BookDescription::ALL
            .iter()
            .map(|d| knowledge.book_identities.get(d).copied())
            .collect(),
        map_tiles: tile_chars(&knowledge.tiles),
        perceived: knowledge.perceived_things.values().cloned().collect(),
    }
}

fn capture_thing(thing: &Thing) -> ThingRecord {
    let (kind, life) = match &thing.kind {
        ThingKind::Individual(life) => (
            KindRecord::Individual(life.original_species),
            Some(LifeRecord {
                hitpoints: life.hitpoints,
                hp_regen_deadline: life.hp_regen_deadline,
                mana: life.mana,
                mp_regen_deadline: life.mp_regen_deadline,
                experience: life.experience,
                last_movement_time: life.last_movement_time,
                last_action_time: life.last_action_time,
                initiative: life.initiative,
                decision_maker: life.decision_maker,
                team: life.team,
                ability_cooldowns: life.ability_cooldowns.clone(),
                knowledge: capture_knowledge(&life.knowledge),
            }),
        ),
        ThingKind::Wand(info) => (
            KindRecord::Wand {
                kind: info.kind,
                charges: info.charges,
            },
            None,
        ),
        ThingKind::Potion(kind) => (KindRecord::Potion(*kind), None),
        ThingKind::Book(kind) => (KindRecord::Book(*kind), None),
        ThingKind::Weapon(kind) => (KindRecord::Weapon(*kind), None),
    };
    ThingRecord {
        id: thing.id,
        still_exists: thing.still_exists,
        location: thing.location,
        kind,
        status_effects: thing.status_effects.clone(),
        life,
    }
}

impl Snapshot {
    /// Capture the live world.
    pub fn capture(world: &World, rng: RandomState, actor: Option<ThingId>) -> Self {
        let identities = world.identities();
        Self {
            wand_descriptions: identities.wands.clone(),
            potion_descriptions: identities.potions.clone(),
            book_descriptions: identities.books.clone(),
            you: world.you(),
            actor,
            time: world.time(),
            dungeon_level: world.dungeon_level(),
            map_tiles: tile_chars(world.tiles()),
            aesthetics: world
                .tiles()
                .iter()
                .map(|tile| format!("{:02x}", tile.aesthetic_index))
                .collect(),
            rng,
            things: world.things().map(capture_thing).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Text form
// ---------------------------------------------------------------------------

fn names<T: Copy>(values: &[T], name: fn(T) -> &'static str) -> String {
    values.iter().map(|v| name(*v)).collect::<Vec<_>>().join(" ")
}

fn identity_names<T: Copy>(values: &[Option<T>], name: fn(T) -> &'static str) -> String {
    values
        .iter()
        .map(|v| v.map_or("unknown", name))
        .collect::<Vec<_>>()
        .join(" ")
}

fn location_text(location: Location) -> String {
    match location {
        Location::Nowhere => "nowhere".to_owned(),
        Location::Standing(c) => format!("standing {} {}", c.x, c.y),
        Location::Floor { coord, z_order } => format!("floor {} {} {z_order}", coord.x, coord.y),
        Location::Inventory { container, z_order } => format!("inventory {container} {z_order}"),
    }
}

fn status_text(effect: &StatusEffect) -> String {
    let head = format!("@status_effect {} {}", effect.id(), effect.expiration_time);
    match effect.kind {
        StatusKind::Poison {
            next_damage_time,
            who_is_responsible,
        } => format!("{head} {next_damage_time} {}", optional_id(who_is_responsible)),
        StatusKind::Polymorph { species } => format!("{head} {species}"),
        _ => head,
    }
}

fn perceived_text(thing: &PerceivedThing) -> String {
    let payload = match thing.kind {
        PerceivedKind::Individual { species, team } => format!("individual {species} {team}"),
        PerceivedKind::Wand {
            description,
            used_count,
        } => format!(
            "wand {} {used_count}",
            description.map_or("unknown", WandDescription::name)
        ),
        PerceivedKind::Potion { description } => {
            format!("potion {}", description.map_or("unknown", PotionDescription::name))
        }
        PerceivedKind::Book { description } => {
            format!("book {}", description.map_or("unknown", BookDescription::name))
        }
        PerceivedKind::Weapon { kind } => format!("weapon {kind}"),
    };
    let mut line = format!(
        "@perceived_thing {} {} {} {} {payload} {}",
        thing.id,
        flag(thing.is_placeholder),
        thing.last_seen_time,
        location_text(thing.location),
        thing.status_effects.len()
    );
    for status in &thing.status_effects {
        line.push(' ');
        line.push_str(status.name());
    }
    line
}

impl Snapshot {
    /// The canonical text form, one directive per element.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "@snapshot {} . {} . {} . {} {} {} {} {}",
                names(&self.wand_descriptions, WandDescription::name),
                names(&self.potion_descriptions, PotionDescription::name),
                names(&self.book_descriptions, BookDescription::name),
                optional_id(self.you),
                optional_id(self.actor),
                self.time,
                self.things.len(),
                self.dungeon_level
            ),
            format!("@map_tiles {}", self.map_tiles),
            format!("@aesthetics {}", self.aesthetics),
            match self.rng {
                RandomState::Seeded { seed, draws } => {
                    format!("@rng_state seeded {} {draws}", hex_u32(seed))
                }
                RandomState::Counters {
                    next_id,
                    next_initiative,
                } => format!("@rng_state test {next_id} {next_initiative}"),
            },
        ];
        for thing in &self.things {
            let payload = match thing.kind {
                KindRecord::Individual(species) => format!("individual {species}"),
                KindRecord::Wand { kind, charges } => format!("wand {kind} {charges}"),
                KindRecord::Potion(kind) => format!("potion {kind}"),
                KindRecord::Book(kind) => format!("book {kind}"),
                KindRecord::Weapon(kind) => format!("weapon {kind}"),
            };
            lines.push(format!(
                "@thing {} {} {} {payload} {}",
                thing.id,
                flag(thing.still_exists),
                location_text(thing.location),
                thing.status_effects.len()
            ));
            lines.extend(thing.status_effects.iter().map(status_text));
            let Some(life) = &thing.life else {
                continue;
            };
            lines.push(format!(
                "@life {} {} {} {} {} {} {} {} {} {} {}",
                life.hitpoints,
                life.hp_regen_deadline,
                life.mana,
                life.mp_regen_deadline,
                life.experience,
                life.last_movement_time,
                life.last_action_time,
                life.initiative,
                life.decision_maker,
                life.team,
                life.ability_cooldowns.len()
            ));
            lines.extend(life.ability_cooldowns.iter().map(|cooldown| {
                format!(
                    "@ability_cooldown {} {}",
                    cooldown.ability, cooldown.expiration_time
                )
            }));
            let knowledge = &life.knowledge;
            lines.push(format!(
                "@knowledge {} . {} . {} . {}",
                identity_names(&knowledge.wand_identities, WandKind::name),
                identity_names(&knowledge.potion_identities, PotionKind::name),
                identity_names(&knowledge.book_identities, BookKind::name),
                knowledge.perceived.len()
            ));
            lines.push(format!("@map_tiles {}", knowledge.map_tiles));
            lines.extend(knowledge.perceived.iter().map(perceived_text));
        }
        lines
    }

    /// The canonical text form as one newline-terminated string.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in self.to_lines() {
            text.push_str(&line);
            text.push('\n');
        }
        text
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Sequential reader over a line's arguments.
struct Fields<'a> {
    tokens: &'a [Token],
    next: usize,
    end_column: usize,
}

impl<'a> Fields<'a> {
    fn new(line: &'a Line) -> Self {
        let end_column = line
            .tokens
            .last()
            .map_or(1, |t| t.column.saturating_add(t.text.chars().count()));
        Self {
            tokens: line.args(),
            next: 0,
            end_column,
        }
    }

    fn token(&mut self) -> Result<&'a Token, Diagnostic> {
        let token = self
            .tokens
            .get(self.next)
            .ok_or_else(|| Diagnostic::new(self.end_column, "expected more arguments"))?;
        self.next = self.next.saturating_add(1);
        Ok(token)
    }

    fn dot(&mut self) -> Result<(), Diagnostic> {
        let token = self.token()?;
        if token.text == "." {
            Ok(())
        } else {
            Err(token.error("expected ."))
        }
    }

    fn named<T>(&mut self, from_name: fn(&str) -> Option<T>, what: &str) -> Result<T, Diagnostic> {
        parse_named(self.token()?, from_name, what)
    }

    fn optional_named<T>(
        &mut self,
        from_name: fn(&str) -> Option<T>,
        what: &str,
    ) -> Result<Option<T>, Diagnostic> {
        let token = self.token()?;
        if token.text == "unknown" {
            Ok(None)
        } else {
            parse_named(token, from_name, what).map(Some)
        }
    }

    fn list<T>(
        &mut self,
        count: usize,
        mut parse: impl FnMut(&mut Self) -> Result<T, Diagnostic>,
    ) -> Result<Vec<T>, Diagnostic> {
        (0..count).map(|_| parse(self)).collect()
    }

    fn i32(&mut self) -> Result<i32, Diagnostic> {
        parse_i32(self.token()?)
    }

    fn i64(&mut self) -> Result<i64, Diagnostic> {
        parse_i64(self.token()?)
    }

    fn u64(&mut self) -> Result<u64, Diagnostic> {
        parse_u64(self.token()?)
    }

    fn usize(&mut self) -> Result<usize, Diagnostic> {
        parse_usize(self.token()?)
    }

    fn flag(&mut self) -> Result<bool, Diagnostic> {
        parse_flag(self.token()?)
    }

    fn id(&mut self) -> Result<ThingId, Diagnostic> {
        parse_thing_id(self.token()?)
    }

    fn optional_id(&mut self) -> Result<Option<ThingId>, Diagnostic> {
        parse_optional_id(self.token()?)
    }

    fn location(&mut self) -> Result<Location, Diagnostic> {
        let token = self.token()?;
        Ok(match token.text.as_str() {
            "nowhere" => Location::Nowhere,
            "standing" => Location::Standing(Coord::new(self.i32()?, self.i32()?)),
            "floor" => Location::Floor {
                coord: Coord::new(self.i32()?, self.i32()?),
                z_order: self.usize()?,
            },
            "inventory" => Location::Inventory {
                container: self.id()?,
                z_order: self.usize()?,
            },
            _ => return Err(token.error("undefined location")),
        })
    }

    fn finish(&self) -> Result<(), Diagnostic> {
        match self.tokens.get(self.next) {
            Some(extra) => Err(extra.error("unexpected argument")),
            None => Ok(()),
        }
    }
}

fn tile_string(token: &Token) -> Result<String, Diagnostic> {
    let expected = usize::try_from(MAP_WIDTH.saturating_mul(MAP_HEIGHT)).unwrap_or(0);
    for (index, c) in token.text.chars().enumerate() {
        if TileType::from_short_char(c).is_none() {
            return Err(Diagnostic::new(
                token.column.saturating_add(index),
                "undefined tile",
            ));
        }
    }
    if token.text.chars().count() == expected {
        Ok(token.text.clone())
    } else {
        Err(token.error(format!("expected {expected} tiles")))
    }
}

fn aesthetics_string(token: &Token) -> Result<String, Diagnostic> {
    let expected = usize::try_from(MAP_WIDTH.saturating_mul(MAP_HEIGHT))
        .unwrap_or(0)
        .saturating_mul(2);
    if let Some(index) = token
        .text
        .bytes()
        .position(|b| !matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return Err(Diagnostic::new(
            token.column.saturating_add(index),
            "hex digit out of range [0-9a-f]",
        ));
    }
    if token.text.len() == expected {
        Ok(token.text.clone())
    } else {
        Err(token.error(format!("expected {expected} hex digits")))
    }
}

/// Pulls the lines of a block out of a script.
struct BlockReader<'s> {
    script: &'s mut Script,
}

impl BlockReader<'_> {
    fn expect(&mut self, keyword: &str) -> Result<Line, ReplayError> {
        let at = self.script.current_line();
        let line = self.script.next_line()?.ok_or_else(|| {
            self.script
                .locate(at, Diagnostic::line("unexpected EOF"))
        })?;
        if line.keyword() == keyword {
            Ok(line)
        } else {
            Err(self
                .script
                .error(&line, Diagnostic::line(format!("expected {keyword}"))))
        }
    }

    fn fields<T>(
        &mut self,
        keyword: &str,
        parse: impl FnOnce(&mut Fields<'_>) -> Result<T, Diagnostic>,
    ) -> Result<T, ReplayError> {
        let line = self.expect(keyword)?;
        let mut fields = Fields::new(&line);
        parse(&mut fields)
            .and_then(|value| fields.finish().map(|()| value))
            .map_err(|diagnostic| self.script.error(&line, diagnostic))
    }
}

fn parse_status(fields: &mut Fields<'_>) -> Result<StatusEffect, Diagnostic> {
    let id = fields.named(StatusEffectId::from_name, "status effect")?;
    let expiration_time = fields.i64()?;
    let kind = match id {
        StatusEffectId::Confusion => StatusKind::Confusion,
        StatusEffectId::Speed => StatusKind::Speed,
        StatusEffectId::EtherealVision => StatusKind::EtherealVision,
        StatusEffectId::Cogniscopy => StatusKind::Cogniscopy,
        StatusEffectId::Blindness => StatusKind::Blindness,
        StatusEffectId::Invisibility => StatusKind::Invisibility,
        StatusEffectId::Slowing => StatusKind::Slowing,
        StatusEffectId::Poison => StatusKind::Poison {
            next_damage_time: fields.i64()?,
            who_is_responsible: fields.optional_id()?,
        },
        StatusEffectId::Polymorph => StatusKind::Polymorph {
            species: fields.named(SpeciesId::from_name, "species id")?,
        },
    };
    Ok(StatusEffect {
        kind,
        expiration_time,
    })
}

fn parse_perceived(fields: &mut Fields<'_>) -> Result<PerceivedThing, Diagnostic> {
    let id = fields.id()?;
    let is_placeholder = fields.flag()?;
    let last_seen_time = fields.i64()?;
    let location = fields.location()?;
    let type_token = fields.token()?;
    let kind = match type_token.text.as_str() {
        "individual" => PerceivedKind::Individual {
            species: fields.named(SpeciesId::from_name, "species id")?,
            team: fields.named(Team::from_name, "team")?,
        },
        "wand" => PerceivedKind::Wand {
            description: fields.optional_named(WandDescription::from_name, "wand description")?,
            used_count: fields.i32()?,
        },
        "potion" => PerceivedKind::Potion {
            description: fields
                .optional_named(PotionDescription::from_name, "potion description")?,
        },
        "book" => PerceivedKind::Book {
            description: fields.optional_named(BookDescription::from_name, "book description")?,
        },
        "weapon" => PerceivedKind::Weapon {
            kind: fields.named(WeaponKind::from_name, "weapon id")?,
        },
        _ => return Err(type_token.error("undefined thing type")),
    };
    let mut thing = PerceivedThing::new(id, is_placeholder, kind, location, last_seen_time);
    let count = fields.usize()?;
    for _ in 0..count {
        thing
            .status_effects
            .insert(fields.named(StatusEffectId::from_name, "status effect")?);
    }
    Ok(thing)
}

fn parse_thing(reader: &mut BlockReader<'_>) -> Result<ThingRecord, ReplayError> {
    let (id, still_exists, location, kind, status_count) = reader.fields("@thing", |f| {
        let id = f.id()?;
        let still_exists = f.flag()?;
        let location = f.location()?;
        let type_token = f.token()?;
        let kind = match type_token.text.as_str() {
            "individual" => KindRecord::Individual(f.named(SpeciesId::from_name, "species id")?),
            "wand" => KindRecord::Wand {
                kind: f.named(WandKind::from_name, "wand id")?,
                charges: f.i32()?,
            },
            "potion" => KindRecord::Potion(f.named(PotionKind::from_name, "potion id")?),
            "book" => KindRecord::Book(f.named(BookKind::from_name, "book id")?),
            "weapon" => KindRecord::Weapon(f.named(WeaponKind::from_name, "weapon id")?),
            _ => return Err(type_token.error("undefined thing type")),
        };
        Ok((id, still_exists, location, kind, f.usize()?))
    })?;
    let status_effects = (0..status_count)
        .map(|_| reader.fields("@status_effect", parse_status))
        .collect::<Result<Vec<_>, _>>()?;
    let life = if matches!(kind, KindRecord::Individual(_)) {
        Some(parse_life(reader)?)
    } else {
        None
    };
    Ok(ThingRecord {
        id,
        still_exists,
        location,
        kind,
        status_effects,
        life,
    })
}

fn parse_life(reader: &mut BlockReader<'_>) -> Result<LifeRecord, ReplayError> {
    let (mut life, cooldown_count) = reader.fields("@life", |f| {
        let life = LifeRecord {
            hitpoints: f.i32()?,
            hp_regen_deadline: f.i64()?,
            mana: f.i32()?,
            mp_regen_deadline: f.i64()?,
            experience: f.i32()?,
            last_movement_time: f.i64()?,
            last_action_time: f.i64()?,
            initiative: Initiative(parse_uint256(f.token()?)?),
            decision_maker: f.named(DecisionMakerType::from_name, "decision maker")?,
            team: f.named(Team::from_name, "team")?,
            ability_cooldowns: Vec::new(),
            knowledge: KnowledgeRecord::default(),
        };
        Ok((life, f.usize()?))
    })?;
    for _ in 0..cooldown_count {
        life.ability_cooldowns
            .push(reader.fields("@ability_cooldown", |f| {
                Ok(AbilityCooldown {
                    ability: f.named(AbilityId::from_name, "ability id")?,
                    expiration_time: f.i64()?,
                })
            })?);
    }
    let (wands, potions, books, perceived_count) = reader.fields("@knowledge", |f| {
        let wands = f.list(WandDescription::ALL.len(), |f| {
            f.optional_named(WandKind::from_name, "wand id")
        })?;
        f.dot()?;
        let potions = f.list(PotionDescription::ALL.len(), |f| {
            f.optional_named(PotionKind::from_name, "potion id")
        })?;
        f.dot()?;
        let books = f.list(BookDescription::ALL.len(), |f| {
            f.optional_named(BookKind::from_name, "book id")
        })?;
        f.dot()?;
        Ok((wands, potions, books, f.usize()?))
    })?;
    let map_tiles = reader.fields("@map_tiles", |f| tile_string(f.token()?))?;
    let perceived = (0..perceived_count)
        .map(|_| reader.fields("@perceived_thing", parse_perceived))
        .collect::<Result<Vec<_>, _>>()?;
    life.knowledge = KnowledgeRecord {
        wand_identities: wands,
        potion_identities: potions,
        book_identities: books,
        map_tiles,
        perceived,
    };
    Ok(life)
}

/// The fields of the `@snapshot` line itself.
struct Header {
    wands: Vec<WandDescription>,
    potions: Vec<PotionDescription>,
    books: Vec<BookDescription>,
    you: Option<ThingId>,
    actor: Option<ThingId>,
    time: i64,
    thing_count: usize,
    dungeon_level: i32,
}

fn parse_header(f: &mut Fields<'_>) -> Result<Header, Diagnostic> {
    let wands = f.list(WandKind::ALL.len(), |f| {
        f.named(WandDescription::from_name, "wand description")
    })?;
    f.dot()?;
    let potions = f.list(PotionKind::ALL.len(), |f| {
        f.named(PotionDescription::from_name, "potion description")
    })?;
    f.dot()?;
    let books = f.list(BookKind::ALL.len(), |f| {
        f.named(BookDescription::from_name, "book description")
    })?;
    f.dot()?;
    let header = Header {
        wands,
        potions,
        books,
        you: f.optional_id()?,
        actor: f.optional_id()?,
        time: f.i64()?,
        thing_count: f.usize()?,
        dungeon_level: f.i32()?,
    };
    f.finish()?;
    Ok(header)
}

impl Snapshot {
    /// Parse a snapshot block whose `@snapshot` line has already been read.
    /// The remaining lines of the block are consumed from `script`.
    ///
    /// # Errors
    ///
    /// Returns a located [`ReplayError::Parse`] for any malformed line.
    pub fn parse(first: &Line, script: &mut Script) -> Result<Self, ReplayError> {
        let mut fields = Fields::new(first);
        let header = parse_header(&mut fields).map_err(|diagnostic| script.error(first, diagnostic))?;

        let mut reader = BlockReader { script };
        let map_tiles = reader.fields("@map_tiles", |f| tile_string(f.token()?))?;
        let aesthetics = reader.fields("@aesthetics", |f| aesthetics_string(f.token()?))?;
        let rng = reader.fields("@rng_state", |f| {
            let mode = f.token()?;
            match mode.text.as_str() {
                "seeded" => Ok(RandomState::Seeded {
                    seed: parse_hex_u32(f.token()?)?,
                    draws: f.u64()?,
                }),
                "test" => Ok(RandomState::Counters {
                    next_id: f.u64()?,
                    next_initiative: f.u64()?,
                }),
                _ => Err(mode.error("undefined rng state")),
            }
        })?;
        let things = (0..header.thing_count)
            .map(|_| parse_thing(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            wand_descriptions: header.wands,
            potion_descriptions: header.potions,
            book_descriptions: header.books,
            you: header.you,
            actor: header.actor,
            time: header.time,
            dungeon_level: header.dungeon_level,
            map_tiles,
            aesthetics,
            rng,
            things,
        })
    }

    /// Parse a whole snapshot from its text form.
    ///
    /// # Errors
    ///
    /// As [`Snapshot::parse`], plus `expected @snapshot` when the text does
    /// not start with a block.
    pub fn from_text(path: &str, text: &str) -> Result<Self, ReplayError> {
        let mut script = Script::parse(path, text)?;
        let first = script
            .next_line()?
            .ok_or_else(|| script.locate(1, Diagnostic::line("unexpected EOF")))?;
        if first.keyword() != "@snapshot" {
            return Err(script.error(&first, Diagnostic::line("expected @snapshot")));
        }
        Self::parse(&first, &mut script)
    }
}
