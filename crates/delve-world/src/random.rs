//! The randomness seam.
//!
//! Every random draw in the simulation goes through a [`Randomness`]
//! implementation and carries a tag naming its role (`spawn_x`,
//! `wand_charges`, ...). Tags never contain spaces because the replay log
//! writes them as a single token.
//!
//! [`SeededRandom`] is the plain generator: a [`StdRng`] seeded from the
//! 32-bit game seed. In test mode it hands out ids and initiatives from
//! counters so that creation order is turn order and scripts can name things
//! by small numbers.

use std::num::TryFromIntError;

use delve_types::{Initiative, ThingId, Uint256};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::RandomError;

/// Source of every random value in the simulation.
pub trait Randomness {
    /// Uniform integer in `0..bound`.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::EmptyRange`] when `bound` is zero, or
    /// [`RandomError::Script`] when a replayed draw cannot be supplied.
    fn random_int(&mut self, bound: u32, tag: &str) -> Result<u32, RandomError>;

    /// A fresh thing id.
    ///
    /// # Errors
    ///
    /// Propagates draw failures.
    fn random_id(&mut self) -> Result<ThingId, RandomError>;

    /// A fresh turn-order key.
    ///
    /// # Errors
    ///
    /// Propagates draw failures.
    fn random_initiative(&mut self) -> Result<Initiative, RandomError>;

    /// Whether the deterministic test mode is active. Test mode generates
    /// trivial levels and never spawns monsters on its own.
    fn is_test_mode(&self) -> bool;

    /// Uniform integer in `low..high`.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::EmptyRange`] when `high <= low`.
    fn random_range(&mut self, low: i32, high: i32, tag: &str) -> Result<i32, RandomError> {
        let span = high
            .checked_sub(low)
            .and_then(|span| u32::try_from(span).ok())
            .filter(|span| *span > 0)
            .ok_or_else(|| RandomError::EmptyRange {
                tag: tag.to_owned(),
            })?;
        let offset = self.random_int(span, tag)?;
        let offset: i32 = fit(offset, tag)?;
        Ok(low.saturating_add(offset))
    }

    /// True with probability `1 / n`.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::EmptyRange`] when `n` is zero.
    fn one_in(&mut self, n: u32, tag: &str) -> Result<bool, RandomError> {
        Ok(self.random_int(n, tag)? == 0)
    }
}

/// Convert a draw bound or result between integer types.
fn fit<T, N>(value: T, tag: &str) -> Result<N, RandomError>
where
    N: TryFrom<T, Error = TryFromIntError>,
{
    N::try_from(value).map_err(|source| RandomError::RangeTooLarge {
        tag: tag.to_owned(),
        source,
    })
}

/// Pick one element uniformly. Returns `None` without drawing when empty.
///
/// # Errors
///
/// Propagates draw failures.
pub fn choose<T: Copy, R: Randomness + ?Sized>(
    rng: &mut R,
    items: &[T],
    tag: &str,
) -> Result<Option<T>, RandomError> {
    if items.is_empty() {
        return Ok(None);
    }
    let bound: u32 = fit(items.len(), tag)?;
    let index = rng.random_int(bound, tag)?;
    Ok(usize::try_from(index)
        .ok()
        .and_then(|index| items.get(index))
        .copied())
}

/// Shuffle in place: each position swaps with a uniformly drawn position at
/// or after it. The last position never draws.
///
/// # Errors
///
/// Propagates draw failures.
pub fn shuffle<T, R: Randomness + ?Sized>(
    rng: &mut R,
    items: &mut [T],
    tag: &str,
) -> Result<(), RandomError> {
    let len: i32 = fit(items.len(), tag)?;
    for i in 0..len.saturating_sub(1) {
        let swap_with = rng.random_range(i, len, tag)?;
        if let (Ok(a), Ok(b)) = (usize::try_from(i), usize::try_from(swap_with)) {
            items.swap(a, b);
        }
    }
    Ok(())
}

/// Serializable position of a [`SeededRandom`], compared by snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandomState {
    /// A seeded generator and how many draws it has made.
    Seeded {
        /// The game seed.
        seed: u32,
        /// Draws made so far.
        draws: u64,
    },
    /// Test-mode counters.
    Counters {
        /// The next id to hand out.
        next_id: u64,
        /// The next initiative to hand out.
        next_initiative: u64,
    },
}

/// The seeded generator behind every game.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u32,
    rng: StdRng,
    draws: u64,
    test_mode: bool,
    next_id: u64,
    next_initiative: u64,
}

impl SeededRandom {
    /// A generator for a normal game.
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(u64::from(seed)),
            draws: 0,
            test_mode: false,
            next_id: 1,
            next_initiative: 1,
        }
    }

    /// A generator for test mode: seed zero, counter ids and initiatives.
    pub fn test_mode() -> Self {
        Self {
            test_mode: true,
            ..Self::new(0)
        }
    }

    /// The seed this generator was created from.
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// The current position, for snapshots.
    pub const fn state(&self) -> RandomState {
        if self.test_mode {
            RandomState::Counters {
                next_id: self.next_id,
                next_initiative: self.next_initiative,
            }
        } else {
            RandomState::Seeded {
                seed: self.seed,
                draws: self.draws,
            }
        }
    }

    fn random_uint256(&mut self) -> Uint256 {
        self.draws = self.draws.saturating_add(1);
        loop {
            let value = Uint256([
                self.rng.next_u64(),
                self.rng.next_u64(),
                self.rng.next_u64(),
                self.rng.next_u64(),
            ]);
            if !value.is_zero() {
                return value;
            }
        }
    }
}

impl Randomness for SeededRandom {
    fn random_int(&mut self, bound: u32, tag: &str) -> Result<u32, RandomError> {
        if bound == 0 {
            return Err(RandomError::EmptyRange {
                tag: tag.to_owned(),
            });
        }
        self.draws = self.draws.saturating_add(1);
        Ok(self.rng.random_range(0..bound))
    }

    fn random_id(&mut self) -> Result<ThingId, RandomError> {
        if self.test_mode {
            let id = self.next_id;
            self.next_id = self.next_id.saturating_add(1);
            return Ok(ThingId::from_u64(id));
        }
        Ok(ThingId(self.random_uint256()))
    }

    fn random_initiative(&mut self) -> Result<Initiative, RandomError> {
        if self.test_mode {
            let initiative = self.next_initiative;
            self.next_initiative = self.next_initiative.saturating_add(1);
            return Ok(Initiative::from_u64(initiative));
        }
        Ok(Initiative(self.random_uint256()))
    }

    fn is_test_mode(&self) -> bool {
        self.test_mode
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SeededRandom::new(1);
        let mut b = SeededRandom::new(1);
        for _ in 0..50 {
            assert_eq!(
                a.random_int(1000, "x").unwrap(),
                b.random_int(1000, "x").unwrap()
            );
        }
        assert_eq!(a.random_id().unwrap(), b.random_id().unwrap());
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn draws_stay_in_range() {
        let mut rng = SeededRandom::new(7);
        for _ in 0..200 {
            assert!(rng.random_int(3, "x").unwrap() < 3);
            let value = rng.random_range(-2, 2, "y").unwrap();
            assert!((-2..2).contains(&value));
        }
    }

    #[test]
    fn empty_range_is_an_error() {
        let mut rng = SeededRandom::new(7);
        assert!(matches!(
            rng.random_int(0, "zero"),
            Err(RandomError::EmptyRange { .. })
        ));
        assert!(rng.random_range(5, 5, "flat").is_err());
    }

    #[test]
    fn oversized_ranges_keep_the_conversion_error() {
        let error = fit::<u64, u32>(u64::MAX, "huge").unwrap_err();
        assert!(matches!(error, RandomError::RangeTooLarge { ref tag, .. } if tag == "huge"));
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(fit::<usize, i32>(7, "small").unwrap(), 7);
    }

    #[test]
    fn test_mode_counts_ids_and_initiatives() {
        let mut rng = SeededRandom::test_mode();
        assert!(rng.is_test_mode());
        assert_eq!(rng.random_id().unwrap(), ThingId::from_u64(1));
        assert_eq!(rng.random_id().unwrap(), ThingId::from_u64(2));
        assert_eq!(rng.random_initiative().unwrap(), Initiative::from_u64(1));
        assert_eq!(
            rng.state(),
            RandomState::Counters {
                next_id: 3,
                next_initiative: 2
            }
        );
    }

    #[test]
    fn shuffle_keeps_elements() {
        let mut rng = SeededRandom::new(3);
        let mut items = [1, 2, 3, 4, 5, 6];
        shuffle(&mut rng, &mut items, "shuffle").unwrap();
        let mut sorted = items;
        sorted.sort_unstable();
        assert_eq!(sorted, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn choose_from_empty_makes_no_draw() {
        let mut rng = SeededRandom::new(3);
        let empty: [u8; 0] = [];
        assert_eq!(choose(&mut rng, &empty, "pick").unwrap(), None);
        assert_eq!(
            rng.state(),
            RandomState::Seeded { seed: 3, draws: 0 }
        );
    }
}
