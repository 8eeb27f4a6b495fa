//! Type-safe 256-bit identifier wrappers around [`Uint256`].
//!
//! Every thing in the simulation carries a [`ThingId`], and every individual
//! carries an [`Initiative`] that orders its turns. Both are 256 bits wide so
//! that randomly drawn values never collide in practice, and both print as 64
//! lowercase hex digits, which is the form the save file uses.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of hex digits in the canonical text form of a [`Uint256`].
pub const UINT256_HEX_LEN: usize = 64;

/// An unsigned 256-bit integer stored as four limbs, most significant first.
///
/// Limb order makes the derived [`Ord`] numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Uint256(pub [u64; 4]);

/// Errors produced when parsing a [`Uint256`] from hex text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseUint256Error {
    /// The text did not have exactly 64 characters.
    #[error("expected hex uint256")]
    WrongLength {
        /// Length of the rejected text.
        len: usize,
    },

    /// A character outside `[0-9a-f]` was found.
    #[error("hex digit out of range [0-9a-f]")]
    BadDigit {
        /// Zero-based character index of the bad digit.
        index: usize,
    },
}

impl Uint256 {
    /// The zero value.
    pub const ZERO: Self = Self([0; 4]);

    /// Widen a `u64` into the least significant limb.
    pub const fn from_u64(value: u64) -> Self {
        Self([0, 0, 0, value])
    }

    /// Whether every bit is zero.
    pub const fn is_zero(self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0 && self.0[3] == 0
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a:016x}{b:016x}{c:016x}{d:016x}")
    }
}

impl FromStr for Uint256 {
    type Err = ParseUint256Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.len() != UINT256_HEX_LEN {
            return Err(ParseUint256Error::WrongLength { len: text.len() });
        }
        let mut limbs = [0_u64; 4];
        for (index, byte) in text.bytes().enumerate() {
            let nibble = match byte {
                b'0'..=b'9' => byte.wrapping_sub(b'0'),
                b'a'..=b'f' => byte.wrapping_sub(b'a').wrapping_add(10),
                _ => return Err(ParseUint256Error::BadDigit { index }),
            };
            let limb = limbs
                .get_mut(index / 16)
                .ok_or(ParseUint256Error::WrongLength { len: text.len() })?;
            *limb = (*limb << 4) | u64::from(nibble);
        }
        Ok(Self(limbs))
    }
}

/// Generates a newtype wrapper around [`Uint256`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uint256);

        impl $name {
            /// Build an identifier whose value is the given small integer.
            pub const fn from_u64(value: u64) -> Self {
                Self(Uint256::from_u64(value))
            }

            /// Return the inner [`Uint256`] value.
            pub const fn into_inner(self) -> Uint256 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseUint256Error;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                text.parse().map(Self)
            }
        }

        impl From<Uint256> for $name {
            fn from(value: Uint256) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uint256 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a thing (individual or item). Never reused.
    ThingId
}

define_id! {
    /// Turn-order key for an individual; lower values act first within a tick.
    Initiative
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_is_fixed_width_hex() {
        let id = ThingId::from_u64(0xab);
        let text = id.to_string();
        assert_eq!(text.len(), UINT256_HEX_LEN);
        assert!(text.ends_with("00ab"));
        assert!(text.starts_with("0000"));
    }

    #[test]
    fn parse_accepts_display_output() {
        let value = Uint256([1, u64::MAX, 0, 42]);
        let parsed: Uint256 = value.to_string().parse().unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn parse_reports_bad_digit_index() {
        let mut text = "0".repeat(UINT256_HEX_LEN);
        text.replace_range(5..6, "G");
        assert_eq!(
            text.parse::<Uint256>(),
            Err(ParseUint256Error::BadDigit { index: 5 })
        );
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(
            "abc".parse::<Uint256>(),
            Err(ParseUint256Error::WrongLength { len: 3 })
        );
    }

    #[test]
    fn ordering_is_numeric_across_limbs() {
        let small = Initiative(Uint256([0, 0, 1, 0]));
        let large = Initiative(Uint256([0, 1, 0, 0]));
        assert!(small < large);
        assert!(Initiative::from_u64(10) < Initiative::from_u64(20));
    }
}
