//! Core plain-data structs for the gridbot agent.

use serde::{Deserialize, Serialize};

use crate::enums::{ActionKind, Direction};

/// A `(row, col)` cell coordinate.
///
/// Coordinates are signed because the wire format carries `int32` values and
/// a candidate step off the grid edge is a legitimate intermediate result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    /// Row index (0 is the top row).
    pub row: i32,
    /// Column index (0 is the leftmost column).
    pub col: i32,
}

impl GridPosition {
    /// Create a position from a row and column.
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Manhattan distance `|Δrow| + |Δcol|` to another position.
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.row
            .abs_diff(other.row)
            .saturating_add(self.col.abs_diff(other.col))
    }

    /// The neighbouring position one step in `direction`.
    ///
    /// Returns `None` only if the coordinate would overflow `i32`. Bounds
    /// against a concrete grid are checked by the grid itself.
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dr, dc) = direction.offset();
        Some(Self {
            row: self.row.checked_add(dr)?,
            col: self.col.checked_add(dc)?,
        })
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A player as reported by the authority.
///
/// Players are identified by their slot index in the world state: slot 0 is
/// this agent, slot 1 the opponent in the two-player game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Current cell of the player.
    pub position: GridPosition,
    /// Accumulated score.
    pub score: i32,
    /// Remaining hazards the player may place.
    pub bomb_count: i32,
}

/// The record sent to the authority each sync cycle.
///
/// It reports the cell the agent currently occupies together with the
/// action it commits to on that cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Cell the agent reports.
    pub position: GridPosition,
    /// Action committed on that cell.
    pub kind: ActionKind,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = GridPosition::new(1, 3);
        let b = GridPosition::new(3, 3);
        assert_eq!(a.manhattan_distance(b), 2);
        assert_eq!(b.manhattan_distance(a), 2);
        assert_eq!(a.manhattan_distance(a), 0);
    }

    #[test]
    fn manhattan_distance_uses_both_axes() {
        let a = GridPosition::new(0, 4);
        let b = GridPosition::new(2, 1);
        assert_eq!(a.manhattan_distance(b), 5);
    }

    #[test]
    fn step_moves_one_cell() {
        let origin = GridPosition::new(2, 2);
        assert_eq!(origin.step(Direction::Up).unwrap(), GridPosition::new(1, 2));
        assert_eq!(origin.step(Direction::Down).unwrap(), GridPosition::new(3, 2));
        assert_eq!(origin.step(Direction::Left).unwrap(), GridPosition::new(2, 1));
        assert_eq!(origin.step(Direction::Right).unwrap(), GridPosition::new(2, 3));
    }

    #[test]
    fn step_off_the_edge_goes_negative() {
        let corner = GridPosition::new(0, 0);
        assert_eq!(corner.step(Direction::Up).unwrap(), GridPosition::new(-1, 0));
    }

    #[test]
    fn step_overflow_is_none() {
        let far = GridPosition::new(i32::MAX, 0);
        assert!(far.step(Direction::Down).is_none());
    }

    #[test]
    fn display_formats_as_tuple() {
        assert_eq!(GridPosition::new(4, 0).to_string(), "(4, 0)");
    }
}
