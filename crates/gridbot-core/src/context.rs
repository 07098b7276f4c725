//! Shared state passed to every agent task.
//!
//! The three loops (position feed, sync, motion) never talk to each other
//! directly. They rendezvous through an [`AgentContext`] held in an [`Arc`]:
//!
//! - the latest position sample (written by the feed, read by sync),
//! - the world-state snapshot (written by sync, read by anyone),
//! - heading plus pending turn signal (written by sync, read by motion),
//! - the last completed sync cycle (for logging and presentation).
//!
//! Each piece has its own lock, held only for a copy or swap.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::{Mutex, MutexGuard, PoisonError};

use gridbot_world::{WorldError, WorldState, WorldStateStore};

use crate::config::AgentConfig;
use crate::heading::HeadingTracker;
use crate::position::PositionSlot;
use crate::sync::SyncCycle;

/// Shared state of a running agent.
#[derive(Debug)]
pub struct AgentContext {
    position: PositionSlot,
    world: WorldStateStore,
    heading: HeadingTracker,
    last_cycle: Mutex<Option<SyncCycle>>,
}

impl AgentContext {
    /// Build the startup context: no position yet, an empty world of the
    /// configured size, and the configured initial heading.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] for a zero-sized grid.
    pub fn new(config: &AgentConfig) -> Result<Self, WorldError> {
        let initial = WorldState::empty(
            config.grid.rows,
            config.grid.cols,
            config.wire.player_slots,
        )?;
        Ok(Self {
            position: PositionSlot::new(),
            world: WorldStateStore::new(initial),
            heading: HeadingTracker::new(config.heading.initial, config.heading.consume_once),
            last_cycle: Mutex::new(None),
        })
    }

    /// Latest position sample.
    pub const fn position(&self) -> &PositionSlot {
        &self.position
    }

    /// Current world-state snapshot.
    pub const fn world(&self) -> &WorldStateStore {
        &self.world
    }

    /// Heading and pending turn signal.
    pub const fn heading(&self) -> &HeadingTracker {
        &self.heading
    }

    /// Remember the most recent completed sync cycle.
    pub fn record_cycle(&self, cycle: SyncCycle) {
        *self.lock_cycle() = Some(cycle);
    }

    /// The most recent completed sync cycle, if any.
    pub fn last_cycle(&self) -> Option<SyncCycle> {
        self.lock_cycle().clone()
    }

    fn lock_cycle(&self) -> MutexGuard<'_, Option<SyncCycle>> {
        self.last_cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gridbot_types::{Direction, TurnSignal};

    use super::*;
    use crate::position::PositionSource;

    #[test]
    fn startup_context() {
        let ctx = AgentContext::new(&AgentConfig::default()).unwrap();
        assert_eq!(ctx.position().latest_position(), None);
        assert!(ctx.world().current_snapshot().is_initial());
        assert_eq!(ctx.world().current_snapshot().players().len(), 2);
        assert_eq!(ctx.heading().steering().heading, Direction::Right);
        assert_eq!(ctx.heading().take_pending(), TurnSignal::NoTurn);
        assert!(ctx.last_cycle().is_none());
    }

    #[test]
    fn zero_grid_is_rejected() {
        let mut config = AgentConfig::default();
        config.grid.rows = 0;
        assert!(AgentContext::new(&config).is_err());
    }
}
