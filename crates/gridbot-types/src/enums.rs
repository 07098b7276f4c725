//! Enumeration types for the gridbot agent.
//!
//! Everything that crosses the wire as a raw integer is modelled here as a
//! tagged variant. The integer codes themselves live in the wire codec so the
//! mapping can follow the authority's contract.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// A cardinal direction on the grid.
///
/// `Up` decreases the row index, `Down` increases it, `Left` decreases the
/// column index and `Right` increases it. The declaration order is the
/// tie-break order used when ranking candidate moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards row 0.
    Up,
    /// Towards the last row.
    Down,
    /// Towards column 0.
    Left,
    /// Towards the last column.
    Right,
}

/// The last committed direction of travel.
pub type Heading = Direction;

impl Direction {
    /// All four directions in enumeration order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Row and column offset of a single step in this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
        }
    }

    /// Human-readable label for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Turn signals
// ---------------------------------------------------------------------------

/// Physical maneuver class derived from a change of heading.
///
/// Held as pending state and executed by the motion controller at the next
/// detected intersection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnSignal {
    /// Keep following the line straight through the intersection.
    #[default]
    NoTurn,
    /// Quarter turn counter-clockwise.
    TurnLeft,
    /// Quarter turn clockwise.
    TurnRight,
    /// Half turn.
    UTurn,
}

impl TurnSignal {
    /// Human-readable label for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoTurn => "no_turn",
            Self::TurnLeft => "turn_left",
            Self::TurnRight => "turn_right",
            Self::UTurn => "u_turn",
        }
    }
}

impl std::fmt::Display for TurnSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Status tag of a grid cell, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    /// Nothing on the cell.
    Empty,
    /// A collectible reward.
    Reward,
    /// A hazard (trap/bomb) that costs points when stepped on.
    Hazard,
}

/// Contents of a single grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    /// Nothing on the cell.
    #[default]
    Empty,
    /// A reward worth `magnitude` points.
    Reward {
        /// Points gained by collecting the reward.
        magnitude: u32,
    },
    /// A hazard.
    Hazard,
}

impl Cell {
    /// The status tag of this cell.
    pub const fn status(self) -> CellStatus {
        match self {
            Self::Empty => CellStatus::Empty,
            Self::Reward { .. } => CellStatus::Reward,
            Self::Hazard => CellStatus::Hazard,
        }
    }

    /// Reward magnitude, or 0 for non-reward cells.
    pub const fn reward_magnitude(self) -> u32 {
        match self {
            Self::Reward { magnitude } => magnitude,
            Self::Empty | Self::Hazard => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Kind of action reported to the authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Ordinary move onto the reported cell.
    #[default]
    Move,
    /// Place a hazard on the reported cell.
    PlaceHazard,
}

impl ActionKind {
    /// Human-readable label for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::PlaceHazard => "place_hazard",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn direction_offsets_are_unit_steps() {
        for dir in Direction::ALL {
            let (dr, dc) = dir.offset();
            assert_eq!(dr.abs() + dc.abs(), 1, "{dir} is not a unit step");
        }
    }

    #[test]
    fn cell_status_and_magnitude() {
        assert_eq!(Cell::Empty.status(), CellStatus::Empty);
        assert_eq!(Cell::Hazard.status(), CellStatus::Hazard);
        let reward = Cell::Reward { magnitude: 4 };
        assert_eq!(reward.status(), CellStatus::Reward);
        assert_eq!(reward.reward_magnitude(), 4);
        assert_eq!(Cell::Hazard.reward_magnitude(), 0);
    }

    #[test]
    fn serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&TurnSignal::UTurn).unwrap();
        assert_eq!(json, "\"u_turn\"");
        let dir: Direction = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(dir, Direction::Right);
        let kind: ActionKind = serde_json::from_str("\"place_hazard\"").unwrap();
        assert_eq!(kind, ActionKind::PlaceHazard);
    }

    #[test]
    fn defaults() {
        assert_eq!(TurnSignal::default(), TurnSignal::NoTurn);
        assert_eq!(ActionKind::default(), ActionKind::Move);
        assert_eq!(Cell::default(), Cell::Empty);
    }
}
