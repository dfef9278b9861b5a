//! Grid tic-tac-toe game logic.
//!
//! This crate holds the pure, synchronous half of the game:
//!
//! - **Board**: a `side × side` grid (3..=10) stored as a flat cell array
//!   with row/column index conversion.
//! - **Win detection**: scans outward from the most recently placed cell
//!   along four axes against a configurable winning run length.
//! - **Turn coordination**: whose turn it is, applying local and remote
//!   moves, echo suppression, and the broadcast decision for networked play.
//!
//! Nothing here performs I/O or blocks; the networked side lives in
//! `tactix_sync`.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod game;
mod rules;
mod types;

pub use error::GameError;
pub use game::{Game, GameStatus, MoveReport, RemoteOutcome, TurnEvent};
pub use rules::{WinningLine, check_win};
pub use types::{
    Board, Cell, DeviceMode, MAX_SIDE, MAX_WIN_RUN, MIN_SIDE, Mark, flat_index, to_row_col,
    win_run_for,
};
