//! Game error types.

use derive_more::{Display, Error};

/// Errors produced by board construction and move application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// Board side length outside the supported range.
    #[display("side length {side} outside supported range {min}..={max}")]
    InvalidConfig {
        /// Requested side length.
        side: usize,
        /// Smallest supported side length.
        min: usize,
        /// Largest supported side length.
        max: usize,
    },
    /// Target cell already holds a mark.
    #[display("cell {cell} is already occupied")]
    CellOccupied {
        /// Flat index of the occupied cell.
        cell: usize,
    },
    /// Flat index past the end of the board.
    #[display("cell {cell} is outside a board of {len} cells")]
    OutOfBounds {
        /// Flat index that was requested.
        cell: usize,
        /// Number of cells on the board.
        len: usize,
    },
    /// Move attempted after the match reached a terminal state.
    #[display("the match is already over")]
    MatchOver,
}
