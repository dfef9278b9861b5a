//! Tests for board geometry and placement rules.

use tactix_core::{Board, Cell, GameError, MAX_SIDE, MIN_SIDE, Mark, flat_index, to_row_col};

#[test]
fn test_flat_index_round_trip_all_sides() {
    for side in MIN_SIDE..=MAX_SIDE {
        for row in 0..side {
            for col in 0..side {
                let index = flat_index(row, col, side);
                assert_eq!(to_row_col(index, side), (row, col), "side {side}");
            }
        }
    }
}

#[test]
fn test_board_helpers_match_free_functions() {
    let board = Board::new(6).unwrap();
    assert_eq!(board.index_of(2, 3), flat_index(2, 3, 6));
    assert_eq!(board.coords_of(15), to_row_col(15, 6));
}

#[test]
fn test_occupied_cell_is_never_overwritten() {
    let mut board = Board::new(3).unwrap();
    board.place(4, Mark::X).unwrap();

    let before = board.clone();
    let err = board.place(4, Mark::O).unwrap_err();

    assert_eq!(err, GameError::CellOccupied { cell: 4 });
    assert_eq!(board, before, "rejected placement must not mutate the board");
    assert_eq!(board.cell(4), Some(Cell::Taken(Mark::X)));
}

#[test]
fn test_out_of_bounds_placement_rejected() {
    let mut board = Board::new(3).unwrap();
    assert_eq!(
        board.place(9, Mark::X),
        Err(GameError::OutOfBounds { cell: 9, len: 9 })
    );
}

#[test]
fn test_side_length_bounds() {
    assert!(Board::new(MIN_SIDE).is_ok());
    assert!(Board::new(MAX_SIDE).is_ok());
    assert!(matches!(
        Board::new(MIN_SIDE - 1),
        Err(GameError::InvalidConfig { .. })
    ));
    assert!(matches!(
        Board::new(MAX_SIDE + 1),
        Err(GameError::InvalidConfig { .. })
    ));
}

#[test]
fn test_full_board_detection() {
    let mut board = Board::new(3).unwrap();
    for i in 0..9 {
        assert!(!board.is_full());
        let mark = if i % 2 == 0 { Mark::X } else { Mark::O };
        board.place(i, mark).unwrap();
    }
    assert!(board.is_full());
}
