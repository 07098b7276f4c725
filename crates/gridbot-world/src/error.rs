//! Error types for the `gridbot-world` crate.

use gridbot_types::GridPosition;

/// Errors that can occur while building grids and snapshots.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A grid must have at least one row and one column.
    #[error("invalid grid dimensions {rows}x{cols}")]
    InvalidDimensions {
        /// Requested row count.
        rows: u16,
        /// Requested column count.
        cols: u16,
    },

    /// The number of supplied cells does not match the grid dimensions.
    #[error("expected {expected} cells, got {actual}")]
    CellCountMismatch {
        /// `rows * cols`.
        expected: usize,
        /// Cells actually supplied.
        actual: usize,
    },

    /// A cell position lies outside the grid.
    #[error("cell {position} is outside the grid")]
    CellOutOfBounds {
        /// The requested position.
        position: GridPosition,
    },

    /// A player was reported on a cell outside the grid.
    #[error("player in slot {slot} is outside the grid at {position}")]
    PlayerOutOfBounds {
        /// Slot index of the offending player.
        slot: usize,
        /// The reported position.
        position: GridPosition,
    },

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in grid calculation")]
    ArithmeticOverflow,
}
