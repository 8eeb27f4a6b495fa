//! Enumeration types for the Delve simulation.
//!
//! Every enum here is a closed set that appears in the save file, so each
//! one carries a stable snake_case token via `name()` and the inverse
//! `from_name()`. The order of `ALL` is the canonical order used by
//! identification tables and snapshots.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Generates a fieldless enum with a stable token per variant.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $token:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in canonical order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stable save-file token for this variant.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }

            /// Look up a variant by its save-file token.
            pub fn from_name(token: &str) -> Option<Self> {
                match token {
                    $($token => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Position of this variant within [`Self::ALL`].
            pub fn index(self) -> usize {
                Self::ALL.iter().position(|v| *v == self).unwrap_or(0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Things
// ---------------------------------------------------------------------------

named_enum! {
    /// The category of a thing.
    pub enum ThingType {
        /// A living creature with a [`SpeciesId`].
        Individual => "individual",
        /// A wand with charges.
        Wand => "wand",
        /// A single-use potion.
        Potion => "potion",
        /// A spellbook that can be read repeatedly.
        Book => "book",
        /// A throwable weapon.
        Weapon => "weapon",
    }
}

named_enum! {
    /// Species of an individual.
    pub enum SpeciesId {
        /// The player's species.
        Human => "human",
        /// Slow and sturdy.
        Ogre => "ogre",
        /// Undead spellcaster.
        Lich => "lich",
        /// Frail but civilized.
        Shapeshifter => "shapeshifter",
        /// Mindless blob that sees ethereally and sucks up items.
        PinkBlob => "pink_blob",
        /// Very fast, very weak.
        AirElemental => "air_elemental",
        /// Slow, throws tar.
        TarElemental => "tar_elemental",
        /// Loyal beast.
        Dog => "dog",
        /// Tiny beast.
        Ant => "ant",
        /// Poisonous flier.
        Bee => "bee",
        /// Armored beast.
        Beetle => "beetle",
        /// Poisonous beast.
        Scorpion => "scorpion",
        /// Quick biter.
        Snake => "snake",
        /// Spits blinding venom.
        Cobra => "cobra",
    }
}

named_enum! {
    /// Level of sentience; anything other than `None` is visible to cogniscopy.
    pub enum Mind {
        /// No mind at all.
        None => "none",
        /// Animal instinct.
        Beast => "beast",
        /// Crude intelligence.
        Savage => "savage",
        /// Full intelligence.
        Civilized => "civilized",
    }
}

named_enum! {
    /// Which decision maker controls an individual.
    pub enum DecisionMakerType {
        /// Heuristic computer control.
        Ai => "ai",
        /// Human input, recorded to the save file.
        Player => "player",
    }
}

named_enum! {
    /// Allegiance used by AI targeting.
    pub enum Team {
        /// The player and its allies.
        Good => "good",
        /// Everybody else.
        Bad => "bad",
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

named_enum! {
    /// True mechanical effect of a wand.
    pub enum WandKind {
        /// Confuses the target.
        Confusion => "confusion",
        /// Digs through brick walls; passes through individuals.
        Digging => "digging",
        /// Deals damage.
        Striking => "striking",
        /// Grants speed.
        Speed => "speed",
        /// Cures confusion, poison, blindness and slowing.
        Remedy => "remedy",
        /// Blinds the target.
        Blinding => "blinding",
        /// Slows the target.
        Slowing => "slowing",
        /// Turns the target invisible.
        Invisibility => "invisibility",
    }
}

named_enum! {
    /// Observable appearance of an unidentified wand.
    pub enum WandDescription {
        /// A bone wand.
        Bone => "bone",
        /// A gold wand.
        Gold => "gold",
        /// A plastic wand.
        Plastic => "plastic",
        /// A copper wand.
        Copper => "copper",
        /// A purple wand.
        Purple => "purple",
        /// A shiny bone wand.
        ShinyBone => "shiny_bone",
        /// A shiny gold wand.
        ShinyGold => "shiny_gold",
        /// A shiny plastic wand.
        ShinyPlastic => "shiny_plastic",
        /// A shiny copper wand.
        ShinyCopper => "shiny_copper",
        /// A shiny purple wand.
        ShinyPurple => "shiny_purple",
    }
}

named_enum! {
    /// True mechanical effect of a potion.
    pub enum PotionKind {
        /// Restores hitpoints.
        Healing => "healing",
        /// Inflicts poison.
        Poison => "poison",
        /// Grants ethereal vision.
        EtherealVision => "ethereal_vision",
        /// Grants cogniscopy.
        Cogniscopy => "cogniscopy",
        /// Inflicts blindness.
        Blindness => "blindness",
        /// Grants invisibility.
        Invisibility => "invisibility",
    }
}

named_enum! {
    /// Observable appearance of an unidentified potion.
    pub enum PotionDescription {
        /// A blue potion.
        Blue => "blue",
        /// A green potion.
        Green => "green",
        /// A red potion.
        Red => "red",
        /// A yellow potion.
        Yellow => "yellow",
        /// An orange potion.
        Orange => "orange",
        /// A purple potion.
        Purple => "purple",
        /// A glittery blue potion.
        GlitteryBlue => "glittery_blue",
        /// A glittery green potion.
        GlitteryGreen => "glittery_green",
    }
}

named_enum! {
    /// True spell taught by a book.
    pub enum BookKind {
        /// Fires a damaging bolt.
        MagicBullet => "magic_bullet",
        /// Grants the reader speed.
        Speed => "speed",
    }
}

named_enum! {
    /// Observable appearance of an unidentified book.
    pub enum BookDescription {
        /// A purple book.
        Purple => "purple",
        /// A blue book.
        Blue => "blue",
        /// A red book.
        Red => "red",
        /// A green book.
        Green => "green",
        /// A yellow book.
        Yellow => "yellow",
    }
}

named_enum! {
    /// Kind of a weapon. Weapons are always recognizable on sight.
    pub enum WeaponKind {
        /// Light and easy to throw.
        Dagger => "dagger",
        /// Heavy.
        Battleaxe => "battleaxe",
    }
}

// ---------------------------------------------------------------------------
// Status effects and abilities
// ---------------------------------------------------------------------------

named_enum! {
    /// Identifies a kind of status effect regardless of payload.
    pub enum StatusEffectId {
        /// Movement and attacks go in random directions half the time.
        Confusion => "confusion",
        /// Movement cost becomes the speedy cost.
        Speed => "speed",
        /// Sees everything within a radius, through walls.
        EtherealVision => "ethereal_vision",
        /// Senses every mind on the level.
        Cogniscopy => "cogniscopy",
        /// Normal vision is suppressed.
        Blindness => "blindness",
        /// Undetectable by normal vision.
        Invisibility => "invisibility",
        /// Periodic damage.
        Poison => "poison",
        /// Temporarily another species.
        Polymorph => "polymorph",
        /// Movement cost becomes the slow cost.
        Slowing => "slowing",
    }
}

named_enum! {
    /// Innate species abilities.
    pub enum AbilityId {
        /// Cobras blind a target in a line.
        SpitBlindingVenom => "spit_blinding_venom",
        /// Tar elementals slow a target in a line.
        ThrowTar => "throw_tar",
    }
}

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

named_enum! {
    /// Terrain of one map tile, including the two degraded knowledge states.
    pub enum TileType {
        /// Never observed.
        Unknown => "unknown",
        /// Plain floor.
        DirtFloor => "dirt_floor",
        /// Fancy floor.
        MarbleFloor => "marble_floor",
        /// Diggable wall.
        BrownBrickWall => "brown_brick_wall",
        /// Diggable wall.
        GrayBrickWall => "gray_brick_wall",
        /// Indestructible wall around the level edge.
        BorderWall => "border_wall",
        /// Leads to the next level.
        StairsDown => "stairs_down",
        /// Known to be open, exact type not observed.
        UnknownFloor => "unknown_floor",
        /// Known to be solid, exact type not observed.
        UnknownWall => "unknown_wall",
    }
}

impl TileType {
    /// Whether individuals can stand here and sight passes through.
    ///
    /// Unknown tiles count as open so path finding explores them.
    pub const fn is_open_space(self) -> bool {
        match self {
            Self::Unknown
            | Self::DirtFloor
            | Self::MarbleFloor
            | Self::StairsDown
            | Self::UnknownFloor => true,
            Self::BrownBrickWall | Self::GrayBrickWall | Self::BorderWall | Self::UnknownWall => {
                false
            }
        }
    }

    /// Whether a digging beam can turn this tile into floor.
    pub const fn is_diggable(self) -> bool {
        matches!(self, Self::BrownBrickWall | Self::GrayBrickWall)
    }

    /// The degraded form recorded when only the open/solid shape is sensed.
    pub const fn degraded(self) -> Self {
        if self.is_open_space() {
            Self::UnknownFloor
        } else {
            Self::UnknownWall
        }
    }

    /// Whether this value carries full information about the tile.
    pub const fn is_truly_known(self) -> bool {
        !matches!(self, Self::Unknown | Self::UnknownFloor | Self::UnknownWall)
    }

    /// One-character code used by the snapshot map strings.
    pub const fn short_char(self) -> char {
        match self {
            Self::Unknown => '_',
            Self::DirtFloor => 'a',
            Self::MarbleFloor => 'b',
            Self::BrownBrickWall => 'c',
            Self::GrayBrickWall => 'd',
            Self::BorderWall => 'e',
            Self::StairsDown => 'f',
            Self::UnknownFloor => '1',
            Self::UnknownWall => '2',
        }
    }

    /// Inverse of [`Self::short_char`].
    pub fn from_short_char(c: char) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.short_char() == c)
    }
}
