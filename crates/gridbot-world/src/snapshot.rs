//! Immutable world-state snapshots.
//!
//! A [`WorldState`] is everything the authority reported in one reply: the
//! grid and the ordered list of players. Snapshots are never mutated after
//! construction; a newer reply produces a whole new snapshot.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use gridbot_types::{Cell, GridPosition, Player};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::grid::Grid;

/// Grid plus players, as of one authority reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Cell contents.
    grid: Grid,
    /// Players by slot index (0 = self, 1 = opponent).
    players: Vec<Player>,
    /// When the reply carrying this snapshot arrived. `None` for the
    /// startup default.
    received_at: Option<DateTime<Utc>>,
}

impl WorldState {
    /// Build a snapshot from a grid and its players, stamped with the
    /// current time.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::PlayerOutOfBounds`] if any player lies outside
    /// the grid.
    pub fn new(grid: Grid, players: Vec<Player>) -> Result<Self, WorldError> {
        for (slot, player) in players.iter().enumerate() {
            if !grid.contains(player.position) {
                return Err(WorldError::PlayerOutOfBounds {
                    slot,
                    position: player.position,
                });
            }
        }
        Ok(Self {
            grid,
            players,
            received_at: Some(Utc::now()),
        })
    }

    /// The startup snapshot: an empty grid with `player_slots` players all
    /// parked on `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is 0.
    pub fn empty(rows: u16, cols: u16, player_slots: usize) -> Result<Self, WorldError> {
        Ok(Self {
            grid: Grid::new(rows, cols)?,
            players: vec![Player::default(); player_slots],
            received_at: None,
        })
    }

    /// The grid.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// All players in slot order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// The player in `slot`, if present.
    pub fn player(&self, slot: usize) -> Option<&Player> {
        self.players.get(slot)
    }

    /// Arrival time of the reply, `None` for the startup default.
    pub const fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    /// Whether this is the startup default rather than an authority reply.
    pub const fn is_initial(&self) -> bool {
        self.received_at.is_none()
    }

    /// Render the grid and player table as text.
    ///
    /// Empty cells print as `-`, hazards as `x`, rewards as their magnitude.
    /// Intended for `debug`-level logging.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let cols = usize::from(self.grid.cols());
        for (idx, (_, cell)) in self.grid.iter().enumerate() {
            match cell {
                Cell::Empty => out.push('-'),
                Cell::Hazard => out.push('x'),
                Cell::Reward { magnitude } => {
                    let _ = write!(out, "{magnitude}");
                }
            }
            let end_of_row = idx.checked_add(1).and_then(|n| n.checked_rem(cols)) == Some(0);
            out.push(if end_of_row { '\n' } else { ' ' });
        }
        for (slot, player) in self.players.iter().enumerate() {
            let _ = writeln!(
                out,
                "player {slot}: at {} score={} bombs={}",
                player.position, player.score, player.bomb_count
            );
        }
        out
    }

    /// The cell at `position`, or `None` off the grid.
    pub fn cell(&self, position: GridPosition) -> Option<Cell> {
        self.grid.cell(position)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn player_at(row: i32, col: i32) -> Player {
        Player {
            position: GridPosition::new(row, col),
            score: 0,
            bomb_count: 2,
        }
    }

    #[test]
    fn empty_snapshot_is_initial() {
        let state = WorldState::empty(5, 5, 2).unwrap();
        assert!(state.is_initial());
        assert_eq!(state.players().len(), 2);
        assert_eq!(state.grid().rows(), 5);
    }

    #[test]
    fn new_snapshot_is_stamped() {
        let grid = Grid::new(5, 5).unwrap();
        let state = WorldState::new(grid, vec![player_at(0, 0), player_at(4, 4)]).unwrap();
        assert!(!state.is_initial());
        assert!(state.received_at().is_some());
        assert_eq!(state.player(1).map(|p| p.position), Some(GridPosition::new(4, 4)));
        assert!(state.player(2).is_none());
    }

    #[test]
    fn out_of_bounds_player_rejected() {
        let grid = Grid::new(5, 5).unwrap();
        let result = WorldState::new(grid, vec![player_at(0, 0), player_at(5, 1)]);
        assert!(matches!(
            result,
            Err(WorldError::PlayerOutOfBounds { slot: 1, .. })
        ));
    }

    #[test]
    fn snapshot_survives_json() {
        let mut grid = Grid::new(3, 3).unwrap();
        grid.set_cell(GridPosition::new(2, 2), Cell::Hazard).unwrap();
        let state = WorldState::new(grid, vec![player_at(0, 0), player_at(1, 2)]).unwrap();

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"hazard\""), "unexpected json: {json}");
        let back: WorldState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn render_shows_cells_and_players() {
        let mut grid = Grid::new(2, 2).unwrap();
        grid.set_cell(GridPosition::new(0, 1), Cell::Reward { magnitude: 3 })
            .unwrap();
        grid.set_cell(GridPosition::new(1, 0), Cell::Hazard).unwrap();
        let state = WorldState::new(grid, vec![player_at(1, 1)]).unwrap();
        let text = state.render();
        assert!(text.starts_with("- 3\nx -\n"), "unexpected render: {text}");
        assert!(text.contains("player 0: at (1, 1) score=0 bombs=2"));
    }
}
