//! Vision modalities as a per-tile bitmask.

use serde::{Deserialize, Serialize};

/// Set of vision modalities by which a tile (or a thing on it) is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VisionTypes(u8);

impl VisionTypes {
    /// Line-of-sight light-based vision. Defeated by invisibility.
    pub const NORMAL: Self = Self(0x1);
    /// Radius vision through walls. Sees everything.
    pub const ETHEREAL: Self = Self(0x2);
    /// Senses minds anywhere; never shapes, colors or items.
    pub const COGNISCOPY: Self = Self(0x4);
    /// Touch on the observer's own tile. Sees shape and thoughts.
    pub const TOUCH: Self = Self(0x8);

    /// The empty set.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Whether every modality in `other` is present.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any modality in `other` is present.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Add modalities.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove modalities.
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Add modalities in place.
    pub const fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Whether anything is observed at all.
    pub const fn any(self) -> bool {
        self.0 != 0
    }

    /// Shape is visible through normal, ethereal, or touch vision.
    pub const fn can_see_shape(self) -> bool {
        self.intersects(Self(Self::NORMAL.0 | Self::ETHEREAL.0 | Self::TOUCH.0))
    }

    /// Colors and materials need light or ethereal sight; touch is not enough.
    pub const fn can_see_color(self) -> bool {
        self.intersects(Self(Self::NORMAL.0 | Self::ETHEREAL.0))
    }

    /// Thoughts are only perceived by touch.
    pub const fn can_see_thoughts(self) -> bool {
        self.contains(Self::TOUCH)
    }

    /// Physical presence of something invisible needs ethereal sight or touch.
    pub const fn can_see_physical_presence(self) -> bool {
        self.intersects(Self(Self::ETHEREAL.0 | Self::TOUCH.0))
    }

    /// Raw bits, for compact serialization.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_follow_modalities() {
        let touch = VisionTypes::TOUCH;
        assert!(touch.can_see_shape());
        assert!(!touch.can_see_color());
        assert!(touch.can_see_thoughts());

        let cogniscopy = VisionTypes::COGNISCOPY;
        assert!(!cogniscopy.can_see_shape());
        assert!(cogniscopy.any());

        let normal = VisionTypes::NORMAL;
        assert!(normal.can_see_color());
        assert!(!normal.can_see_physical_presence());
    }

    #[test]
    fn set_operations() {
        let mut vision = VisionTypes::none();
        assert!(!vision.any());
        vision.insert(VisionTypes::NORMAL);
        vision.insert(VisionTypes::TOUCH);
        assert!(vision.contains(VisionTypes::NORMAL.union(VisionTypes::TOUCH)));
        assert_eq!(vision.without(VisionTypes::NORMAL), VisionTypes::TOUCH);
    }
}
