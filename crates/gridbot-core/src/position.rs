//! Position acquisition: the latest observed cell.
//!
//! The position feed (floor tags read by a camera, or a stdin stand-in)
//! writes into a [`PositionSlot`]; the sync loop reads it through the
//! [`PositionSource`] trait.

use std::sync::{Mutex, MutexGuard, PoisonError};

use gridbot_types::GridPosition;
use tracing::{debug, warn};

/// Anything that can report the latest observed cell.
pub trait PositionSource: Send + Sync {
    /// The most recent sample, or `None` before the first one.
    fn latest_position(&self) -> Option<GridPosition>;
}

/// Single-value holder for the latest position sample.
#[derive(Debug, Default)]
pub struct PositionSlot {
    latest: Mutex<Option<GridPosition>>,
}

impl PositionSlot {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            latest: Mutex::new(None),
        }
    }

    /// Overwrite the latest sample.
    pub fn publish(&self, position: GridPosition) {
        *self.lock() = Some(position);
    }

    /// Parse a tag payload and publish it.
    ///
    /// Returns the published position, or `None` if the payload was ignored.
    pub fn ingest_tag(&self, payload: &str) -> Option<GridPosition> {
        let Some(position) = parse_tag_payload(payload) else {
            warn!(payload, "ignoring malformed position tag");
            return None;
        };
        self.publish(position);
        debug!(%position, "position tag accepted");
        Some(position)
    }

    fn lock(&self) -> MutexGuard<'_, Option<GridPosition>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionSource for PositionSlot {
    fn latest_position(&self) -> Option<GridPosition> {
        *self.lock()
    }
}

/// Decode a floor-tag payload.
///
/// The first character is the row digit and the second the column digit;
/// anything after them is ignored. Payloads shorter than two characters or
/// starting with non-digits yield `None`.
pub fn parse_tag_payload(payload: &str) -> Option<GridPosition> {
    let mut chars = payload.chars();
    let row = chars.next()?.to_digit(10)?;
    let col = chars.next()?.to_digit(10)?;
    Some(GridPosition::new(
        i32::try_from(row).ok()?,
        i32::try_from(col).ok()?,
    ))
}
