//! Fixed-size grid of cells.
//!
//! Cells are stored row-major. A grid never changes shape after
//! construction; individual cells only change when the whole world state is
//! replaced by a new authority reply.

use gridbot_types::{Cell, GridPosition};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// A `rows x cols` array of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    /// Number of rows.
    rows: u16,
    /// Number of columns.
    cols: u16,
    /// Row-major cell storage, `rows * cols` long.
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every cell empty.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is 0.
    pub fn new(rows: u16, cols: u16) -> Result<Self, WorldError> {
        let len = cell_count(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            cells: vec![Cell::Empty; len],
        })
    }

    /// Create a grid from row-major cells.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is 0,
    /// or [`WorldError::CellCountMismatch`] if `cells.len() != rows * cols`.
    pub fn from_cells(rows: u16, cols: u16, cells: Vec<Cell>) -> Result<Self, WorldError> {
        let expected = cell_count(rows, cols)?;
        if cells.len() != expected {
            return Err(WorldError::CellCountMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { rows, cols, cells })
    }

    /// Number of rows.
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    /// Number of columns.
    pub const fn cols(&self) -> u16 {
        self.cols
    }

    /// Whether `position` lies on the grid.
    pub fn contains(&self, position: GridPosition) -> bool {
        position.row >= 0
            && position.col >= 0
            && position.row < i32::from(self.rows)
            && position.col < i32::from(self.cols)
    }

    /// The cell at `position`, or `None` if it lies off the grid.
    pub fn cell(&self, position: GridPosition) -> Option<Cell> {
        let idx = self.index_of(position)?;
        self.cells.get(idx).copied()
    }

    /// Replace the cell at `position`.
    ///
    /// Used while assembling a snapshot; a published snapshot is immutable.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CellOutOfBounds`] if `position` is off the grid.
    pub fn set_cell(&mut self, position: GridPosition, cell: Cell) -> Result<(), WorldError> {
        let slot = self
            .index_of(position)
            .and_then(|idx| self.cells.get_mut(idx))
            .ok_or(WorldError::CellOutOfBounds { position })?;
        *slot = cell;
        Ok(())
    }

    /// Iterate over every cell with its position, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (GridPosition, Cell)> + '_ {
        let cols = usize::from(self.cols);
        self.cells.iter().enumerate().filter_map(move |(idx, &cell)| {
            let row = i32::try_from(idx.checked_div(cols)?).ok()?;
            let col = i32::try_from(idx.checked_rem(cols)?).ok()?;
            Some((GridPosition::new(row, col), cell))
        })
    }

    /// Row-major cell slice.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn index_of(&self, position: GridPosition) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let row = usize::try_from(position.row).ok()?;
        let col = usize::try_from(position.col).ok()?;
        row.checked_mul(usize::from(self.cols))?.checked_add(col)
    }
}

fn cell_count(rows: u16, cols: u16) -> Result<usize, WorldError> {
    if rows == 0 || cols == 0 {
        return Err(WorldError::InvalidDimensions { rows, cols });
    }
    usize::from(rows)
        .checked_mul(usize::from(cols))
        .ok_or(WorldError::ArithmeticOverflow)
}
