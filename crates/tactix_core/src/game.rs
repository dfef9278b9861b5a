//! Match state and turn coordination.

use crate::error::GameError;
use crate::rules::{WinningLine, check_win};
use crate::types::{Board, Cell, DeviceMode, Mark, win_run_for};
use derive_getters::Getters;
use tracing::{debug, instrument, warn};

/// Current status of a match.
///
/// `InProgress` is the only non-terminal state; once a match is `Won` or
/// `Abandoned` it never goes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameStatus {
    /// Match is ongoing.
    InProgress,
    /// Match ended with a winner.
    Won {
        /// Mark that won.
        winner: Mark,
        /// The winning run, or `None` when the opponent forfeited.
        line: Option<WinningLine>,
    },
    /// Match was abandoned before either side won.
    Abandoned,
}

/// A turn notification decoded at the protocol edge.
///
/// The shared record overloads an integer field with three meanings
/// (-1 "no move yet", -2 "forfeit", ≥0 a real move); this enum is the
/// decoded form — raw sentinels never travel through core logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// Initial sentinel: nobody has moved yet.
    NoMoveYet,
    /// The given mark gave up the match.
    Forfeit(Mark),
    /// The given mark placed at a flat cell index.
    Move {
        /// Mark that moved.
        mark: Mark,
        /// Flat index of the placed cell.
        cell: usize,
    },
}

/// What a successfully applied move did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    /// Mark that was placed.
    pub mark: Mark,
    /// Flat index of the placed cell.
    pub cell: usize,
    /// The winning run, when this move ended the match.
    pub winning_line: Option<WinningLine>,
    /// Whether the move must be broadcast to the room record.
    ///
    /// True iff the move originated locally and the match is networked;
    /// remote-origin moves are never re-published.
    pub publish: bool,
}

/// Outcome of feeding a remote turn event into the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Event carried no new information (sentinel, echo of our own
    /// broadcast, replayed value, or the match already ended).
    Ignored,
    /// Opponent forfeited; the local side wins without a board change.
    Forfeited,
    /// A real opponent move was placed on the board.
    Applied(MoveReport),
}

/// A single match: board, turn order, and status.
///
/// The turn coordinator never forbids out-of-turn placement in networked
/// mode; interaction gating belongs to the controller/UI layer. It only
/// alternates `current_turn` after each successful placement.
#[derive(Debug, Clone, Getters)]
pub struct Game {
    /// The board grid.
    board: Board,
    /// Run length required to win: `min(side, 5)`.
    win_len: usize,
    /// Shared-device or networked play.
    mode: DeviceMode,
    /// Match status.
    status: GameStatus,
    /// Mark to move next. X always opens.
    current_turn: Mark,
    /// Which mark this client plays; only meaningful in networked mode.
    local_mark: Mark,
}

impl Game {
    /// Creates a fresh match with an all-empty board and X to move.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] for an unsupported side length.
    #[instrument]
    pub fn new(side: usize, mode: DeviceMode, local_mark: Mark) -> Result<Self, GameError> {
        Ok(Self {
            board: Board::new(side)?,
            win_len: win_run_for(side),
            mode,
            status: GameStatus::InProgress,
            current_turn: Mark::X,
            local_mark,
        })
    }

    /// Whether a press on the board should be honored right now: the match
    /// is in progress and, in networked mode, it is the local side's turn.
    pub fn can_move_locally(&self) -> bool {
        self.status == GameStatus::InProgress
            && (self.mode == DeviceMode::Local || self.current_turn == self.local_mark)
    }

    /// The forfeit event to publish when the local side walks away.
    pub fn resign_event(&self) -> TurnEvent {
        TurnEvent::Forfeit(self.local_mark)
    }

    /// Marks an unfinished match as abandoned. Terminal states stay as-is.
    pub fn abandon(&mut self) {
        if self.status == GameStatus::InProgress {
            self.status = GameStatus::Abandoned;
        }
    }

    /// Applies a move made on this device for whichever mark is to move.
    ///
    /// On success the turn flips to the opponent and the report says whether
    /// the move must be broadcast.
    ///
    /// # Errors
    ///
    /// [`GameError::MatchOver`] after a terminal state,
    /// [`GameError::CellOccupied`] / [`GameError::OutOfBounds`] from the
    /// board. A failed move changes nothing.
    #[instrument(skip(self), fields(mark = ?self.current_turn))]
    pub fn apply_local_move(&mut self, cell: usize) -> Result<MoveReport, GameError> {
        let mark = self.current_turn;
        let mut report = self.commit(cell, mark)?;
        report.publish = self.mode == DeviceMode::Networked;
        Ok(report)
    }

    /// Feeds a turn event observed on the shared record into the match.
    ///
    /// Never re-broadcasts: the returned report (if any) has
    /// `publish == false`. Events are tolerated out of order and replayed —
    /// anything already reflected on the board is [`RemoteOutcome::Ignored`].
    #[instrument(skip(self))]
    pub fn apply_remote_event(&mut self, event: TurnEvent) -> RemoteOutcome {
        match event {
            TurnEvent::NoMoveYet => RemoteOutcome::Ignored,
            // A client never reacts to its own broadcast mark.
            TurnEvent::Forfeit(mark) | TurnEvent::Move { mark, .. }
                if mark == self.local_mark =>
            {
                debug!(?mark, "ignoring echo of own event");
                RemoteOutcome::Ignored
            }
            TurnEvent::Forfeit(mark) => {
                if self.status != GameStatus::InProgress {
                    return RemoteOutcome::Ignored;
                }
                debug!(?mark, "opponent forfeited");
                self.status = GameStatus::Won {
                    winner: self.local_mark,
                    line: None,
                };
                RemoteOutcome::Forfeited
            }
            TurnEvent::Move { mark, cell } => {
                if self.status != GameStatus::InProgress {
                    return RemoteOutcome::Ignored;
                }
                // Store semantics may replay the current value on subscribe;
                // a move already on the board is not an error.
                if self.board.cell(cell) == Some(Cell::Taken(mark)) {
                    debug!(cell, "remote move already applied");
                    return RemoteOutcome::Ignored;
                }
                match self.commit(cell, mark) {
                    Ok(report) => RemoteOutcome::Applied(report),
                    Err(err) => {
                        warn!(cell, %err, "dropping unplayable remote move");
                        RemoteOutcome::Ignored
                    }
                }
            }
        }
    }

    /// Shared placement path: place, detect a win from the placed cell, flip
    /// the turn. Alternation is a fixed 2-cycle; only two marks ever exist.
    fn commit(&mut self, cell: usize, mark: Mark) -> Result<MoveReport, GameError> {
        if self.status != GameStatus::InProgress {
            return Err(GameError::MatchOver);
        }
        self.board.place(cell, mark)?;

        let winning_line = check_win(&self.board, self.win_len, self.board.coords_of(cell));
        if let Some(line) = &winning_line {
            self.status = GameStatus::Won {
                winner: mark,
                line: Some(line.clone()),
            };
        }
        self.current_turn = mark.opponent();

        Ok(MoveReport {
            mark,
            cell,
            winning_line,
            publish: false,
        })
    }
}
