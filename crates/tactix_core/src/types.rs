//! Core domain types: marks, cells, and the board grid.

use crate::error::GameError;
use serde::{Deserialize, Serialize};

/// Smallest supported board side length.
pub const MIN_SIDE: usize = 3;
/// Largest supported board side length.
pub const MAX_SIDE: usize = 10;
/// Cap on the winning run length regardless of board size.
pub const MAX_WIN_RUN: usize = 5;

/// Winning run length for a board of the given side: `min(side, 5)`.
pub fn win_run_for(side: usize) -> usize {
    side.min(MAX_WIN_RUN)
}

/// Row-major flat index of `(row, col)` on a board of the given side.
pub fn flat_index(row: usize, col: usize, side: usize) -> usize {
    row * side + col
}

/// Inverse of [`flat_index`]: `(row, col)` of a flat index.
pub fn to_row_col(index: usize, side: usize) -> (usize, usize) {
    (index / side, index % side)
}

/// One of the two player symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    /// X goes first.
    X,
    /// O goes second.
    O,
}

impl Mark {
    /// Returns the opposing mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// Display label for the mark.
    pub fn label(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// No mark placed yet.
    Empty,
    /// Cell holding a mark. Cells are written at most once per match.
    Taken(Mark),
}

/// Whether both players share one device or play over the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceMode {
    /// Both players on one device, passing it back and forth.
    #[default]
    Local,
    /// Two devices synchronizing through a shared room record.
    Networked,
}

/// Square board of `side × side` cells in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    side: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Creates an all-empty board.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] when `side` is outside
    /// [`MIN_SIDE`]..=[`MAX_SIDE`].
    pub fn new(side: usize) -> Result<Self, GameError> {
        if !(MIN_SIDE..=MAX_SIDE).contains(&side) {
            return Err(GameError::InvalidConfig {
                side,
                min: MIN_SIDE,
                max: MAX_SIDE,
            });
        }
        Ok(Self {
            side,
            cells: vec![Cell::Empty; side * side],
        })
    }

    /// Side length of the board.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Number of cells on the board.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the board has no cells (never true for a constructed board).
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Gets the cell at the given flat index.
    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Whether the cell at the given flat index is free.
    pub fn is_free(&self, index: usize) -> bool {
        matches!(self.cell(index), Some(Cell::Empty))
    }

    /// Whether every cell holds a mark.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| *c != Cell::Empty)
    }

    /// Flat index of `(row, col)` on this board.
    pub fn index_of(&self, row: usize, col: usize) -> usize {
        flat_index(row, col, self.side)
    }

    /// `(row, col)` of a flat index on this board.
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        to_row_col(index, self.side)
    }

    /// Places a mark at the given flat index.
    ///
    /// Occupied cells are never overwritten; a rejected placement leaves the
    /// board unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::OutOfBounds`] past the grid or
    /// [`GameError::CellOccupied`] when the target is not empty.
    pub fn place(&mut self, index: usize, mark: Mark) -> Result<(), GameError> {
        match self.cells.get(index) {
            None => Err(GameError::OutOfBounds {
                cell: index,
                len: self.cells.len(),
            }),
            Some(Cell::Taken(_)) => Err(GameError::CellOccupied { cell: index }),
            Some(Cell::Empty) => {
                self.cells[index] = Cell::Taken(mark);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_undersized_board() {
        assert!(matches!(
            Board::new(2),
            Err(GameError::InvalidConfig { side: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_board() {
        assert!(matches!(
            Board::new(11),
            Err(GameError::InvalidConfig { side: 11, .. })
        ));
    }

    #[test]
    fn test_new_board_is_all_empty() {
        let board = Board::new(4).unwrap();
        assert_eq!(board.len(), 16);
        assert!((0..16).all(|i| board.is_free(i)));
    }

    #[test]
    fn test_win_run_caps_at_five() {
        assert_eq!(win_run_for(3), 3);
        assert_eq!(win_run_for(5), 5);
        assert_eq!(win_run_for(10), 5);
    }
}
