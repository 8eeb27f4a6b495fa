//! Status effects attached to things.

use serde::{Deserialize, Serialize};

use crate::enums::{SpeciesId, StatusEffectId};
use crate::ids::ThingId;
use crate::vision::VisionTypes;

/// Kind-specific payload of a status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// See [`StatusEffectId::Confusion`].
    Confusion,
    /// See [`StatusEffectId::Speed`].
    Speed,
    /// See [`StatusEffectId::EtherealVision`].
    EtherealVision,
    /// See [`StatusEffectId::Cogniscopy`].
    Cogniscopy,
    /// See [`StatusEffectId::Blindness`].
    Blindness,
    /// See [`StatusEffectId::Invisibility`].
    Invisibility,
    /// Periodic damage.
    Poison {
        /// Tick at which the next point of damage lands.
        next_damage_time: i64,
        /// Who gets the experience if the poison kills.
        who_is_responsible: Option<ThingId>,
    },
    /// Temporarily another species.
    Polymorph {
        /// The species assumed while the effect lasts.
        species: SpeciesId,
    },
    /// See [`StatusEffectId::Slowing`].
    Slowing,
}

impl StatusKind {
    /// The payload-free identifier of this kind.
    pub const fn id(self) -> StatusEffectId {
        match self {
            Self::Confusion => StatusEffectId::Confusion,
            Self::Speed => StatusEffectId::Speed,
            Self::EtherealVision => StatusEffectId::EtherealVision,
            Self::Cogniscopy => StatusEffectId::Cogniscopy,
            Self::Blindness => StatusEffectId::Blindness,
            Self::Invisibility => StatusEffectId::Invisibility,
            Self::Poison { .. } => StatusEffectId::Poison,
            Self::Polymorph { .. } => StatusEffectId::Polymorph,
            Self::Slowing => StatusEffectId::Slowing,
        }
    }
}

/// A status effect with an absolute expiration tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEffect {
    /// What the effect does.
    pub kind: StatusKind,
    /// Tick at which the effect wears off.
    pub expiration_time: i64,
}

impl StatusEffect {
    /// The payload-free identifier of this effect.
    pub const fn id(&self) -> StatusEffectId {
        self.kind.id()
    }
}

impl StatusEffectId {
    /// Whether an observer with `vision` of the afflicted individual can tell
    /// that it has this status.
    ///
    /// Outward symptoms need shape vision. Invisibility is only noticed by
    /// normal vision (others never notice anything). Inner states need
    /// thought vision.
    pub const fn is_visible_with(self, vision: VisionTypes) -> bool {
        match self {
            Self::Confusion | Self::Speed | Self::Slowing | Self::Blindness | Self::Poison => {
                vision.can_see_shape()
            }
            Self::Invisibility => vision.contains(VisionTypes::NORMAL),
            Self::EtherealVision | Self::Cogniscopy | Self::Polymorph => vision.can_see_thoughts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_ignore_payload() {
        let poison = StatusKind::Poison {
            next_damage_time: 3,
            who_is_responsible: None,
        };
        assert_eq!(poison.id(), StatusEffectId::Poison);
        assert_eq!(
            StatusKind::Polymorph {
                species: SpeciesId::Ant
            }
            .id(),
            StatusEffectId::Polymorph
        );
    }

    #[test]
    fn visibility_depends_on_modality() {
        assert!(StatusEffectId::Confusion.is_visible_with(VisionTypes::ETHEREAL));
        assert!(!StatusEffectId::Confusion.is_visible_with(VisionTypes::COGNISCOPY));
        assert!(StatusEffectId::Invisibility.is_visible_with(VisionTypes::NORMAL));
        assert!(!StatusEffectId::Invisibility.is_visible_with(VisionTypes::ETHEREAL));
        assert!(StatusEffectId::Cogniscopy.is_visible_with(VisionTypes::TOUCH));
        assert!(!StatusEffectId::Cogniscopy.is_visible_with(VisionTypes::NORMAL));
    }
}
