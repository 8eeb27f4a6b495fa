//! The global tick counter.
//!
//! Time in Delve is a single signed tick counter. It starts at zero when a
//! game is created and is strictly non-decreasing; every other time value
//! (expirations, regeneration deadlines, last-action times) is an absolute
//! tick on the same scale.

use serde::{Deserialize, Serialize};

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond i64::MAX")]
    TickOverflow,
}

/// World clock tracking the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldClock {
    /// Current tick, incremented at the start of each scheduler tick.
    tick: i64,
}

impl WorldClock {
    /// A clock at tick zero.
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// A clock at an arbitrary tick, used when restoring state.
    pub const fn at(tick: i64) -> Self {
        Self { tick }
    }

    /// The current tick.
    pub const fn tick(&self) -> i64 {
        self.tick
    }

    /// Advance by one tick and return the new tick.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter is at its maximum.
    pub fn advance(&mut self) -> Result<i64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_advances() {
        let mut clock = WorldClock::new();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.advance().unwrap(), 1);
        assert_eq!(clock.advance().unwrap(), 2);
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut clock = WorldClock::at(i64::MAX);
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
        assert_eq!(clock.tick(), i64::MAX);
    }
}
