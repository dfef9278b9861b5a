//! Win detection: outward scan from the last-placed cell.

use crate::types::{Board, Cell, Mark};
use tracing::instrument;

/// A completed winning run.
///
/// `cells` holds exactly the winning-run length of flat indices, in ascending
/// order, contiguous along a single axis. Overlength runs are truncated to
/// the cells that reached the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningLine {
    /// Mark that completed the run.
    pub mark: Mark,
    /// Flat indices of the winning cells, ascending.
    pub cells: Vec<usize>,
}

/// Axis step vectors in the order they are checked: row, column,
/// diagonal-`\`, diagonal-`/`. The first axis to reach the threshold wins
/// and the rest are skipped, keeping results deterministic.
const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Checks whether the move just made at `last` completed a winning run.
///
/// Only lines through the last-moved cell are examined; each axis costs at
/// most `win_len` cell reads in either direction, so the whole check is
/// O(win_len) per axis rather than O(side²).
///
/// Returns `None` when `last` is out of range or empty, or when no axis
/// reaches `win_len`.
#[instrument(skip(board), fields(side = board.side()))]
pub fn check_win(board: &Board, win_len: usize, last: (usize, usize)) -> Option<WinningLine> {
    let (row, col) = last;
    if row >= board.side() || col >= board.side() {
        return None;
    }
    let mark = match board.cell(board.index_of(row, col)) {
        Some(Cell::Taken(mark)) => mark,
        _ => return None,
    };

    for (dr, dc) in AXES {
        if let Some(line) = scan_axis(board, win_len, last, mark, dr, dc) {
            return Some(line);
        }
    }
    None
}

/// Walks outward from `last` along one axis, backward then forward, counting
/// consecutive cells of the same mark. Stops at a mismatch, an empty cell, a
/// board edge, or the moment the count reaches `win_len`.
fn scan_axis(
    board: &Board,
    win_len: usize,
    last: (usize, usize),
    mark: Mark,
    dr: isize,
    dc: isize,
) -> Option<WinningLine> {
    // Count starts at 1 on the last-moved cell itself.
    let mut cells = vec![board.index_of(last.0, last.1)];

    for dir in [-1isize, 1] {
        let mut row = last.0 as isize;
        let mut col = last.1 as isize;
        loop {
            if cells.len() == win_len {
                cells.sort_unstable();
                return Some(WinningLine { mark, cells });
            }
            row += dr * dir;
            col += dc * dir;
            if row < 0 || col < 0 || row >= board.side() as isize || col >= board.side() as isize {
                break;
            }
            let index = board.index_of(row as usize, col as usize);
            match board.cell(index) {
                Some(Cell::Taken(m)) if m == mark => cells.push(index),
                _ => break,
            }
        }
    }

    None
}
