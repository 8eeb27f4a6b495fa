//! The mutable state one simulation step works on.

use std::collections::BTreeMap;

use delve_types::{Event, ThingId, WandDescription};
use delve_world::{Randomness, World};

use crate::config::WorldConfig;
use crate::error::CoreError;
use crate::perception;

/// Borrowed world, random source, and configuration for one step.
///
/// Every state change goes through a context so that events can be
/// published to observers as they happen.
pub struct StepContext<'a> {
    /// The authoritative world.
    pub world: &'a mut World,
    /// The random source (the replay log while the game runs).
    pub rng: &'a mut dyn Randomness,
    /// Population settings.
    pub config: &'a WorldConfig,
    /// Wand descriptions seen being zapped by each observer during the zap
    /// currently resolving. Cleared once the beam is done.
    pub(crate) witnessed_zaps: BTreeMap<ThingId, WandDescription>,
}

impl<'a> StepContext<'a> {
    /// A context over borrowed state.
    pub fn new(
        world: &'a mut World,
        rng: &'a mut dyn Randomness,
        config: &'a WorldConfig,
    ) -> Self {
        Self {
            world,
            rng,
            config,
            witnessed_zaps: BTreeMap::new(),
        }
    }

    /// Let every living individual perceive an event.
    ///
    /// # Errors
    ///
    /// Propagates world inconsistencies and failed random draws.
    pub fn publish(&mut self, event: Event) -> Result<(), CoreError> {
        perception::publish(self, event)
    }

    /// Forget which wands were seen zapped.
    pub(crate) fn end_zap(&mut self) {
        self.witnessed_zaps.clear();
    }
}
