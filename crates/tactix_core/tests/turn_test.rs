//! Tests for turn coordination: alternation, echo suppression, forfeits,
//! and the broadcast rule.

use tactix_core::{DeviceMode, Game, GameStatus, Mark, RemoteOutcome, TurnEvent};

#[test]
fn test_local_moves_alternate_strictly() {
    for side in [3, 7, 10] {
        let mut game = Game::new(side, DeviceMode::Local, Mark::X).unwrap();
        let mut expected = Mark::X;
        for cell in 0..side {
            assert_eq!(*game.current_turn(), expected, "side {side}, cell {cell}");
            let report = game.apply_local_move(cell).unwrap();
            assert_eq!(report.mark, expected);
            expected = expected.opponent();
        }
    }
}

#[test]
fn test_local_mode_never_broadcasts() {
    let mut game = Game::new(5, DeviceMode::Local, Mark::X).unwrap();
    let report = game.apply_local_move(0).unwrap();
    assert!(!report.publish);
}

#[test]
fn test_networked_local_move_requests_broadcast() {
    let mut game = Game::new(5, DeviceMode::Networked, Mark::X).unwrap();
    let report = game.apply_local_move(12).unwrap();
    assert!(report.publish);
    assert_eq!(report.mark, Mark::X);
    assert_eq!(report.cell, 12);
}

#[test]
fn test_own_mark_echo_is_a_no_op() {
    let mut game = Game::new(5, DeviceMode::Networked, Mark::X).unwrap();
    game.apply_local_move(0).unwrap();
    let snapshot = game.clone();

    let outcome = game.apply_remote_event(TurnEvent::Move {
        mark: Mark::X,
        cell: 0,
    });

    assert_eq!(outcome, RemoteOutcome::Ignored);
    assert_eq!(*game.board(), *snapshot.board());
    assert_eq!(*game.current_turn(), *snapshot.current_turn());
}

#[test]
fn test_initial_sentinel_is_ignored() {
    let mut game = Game::new(5, DeviceMode::Networked, Mark::O).unwrap();
    assert_eq!(
        game.apply_remote_event(TurnEvent::NoMoveYet),
        RemoteOutcome::Ignored
    );
    assert_eq!(*game.status(), GameStatus::InProgress);
}

#[test]
fn test_remote_move_applies_without_rebroadcast() {
    let mut game = Game::new(5, DeviceMode::Networked, Mark::O).unwrap();
    let outcome = game.apply_remote_event(TurnEvent::Move {
        mark: Mark::X,
        cell: 7,
    });

    match outcome {
        RemoteOutcome::Applied(report) => {
            assert!(!report.publish, "remote-origin moves must never republish");
            assert_eq!(report.cell, 7);
        }
        other => panic!("expected applied move, got {other:?}"),
    }
    assert_eq!(*game.current_turn(), Mark::O);
}

#[test]
fn test_replayed_remote_move_is_idempotent() {
    // The store may replay the current value on subscribe.
    let mut game = Game::new(5, DeviceMode::Networked, Mark::O).unwrap();
    let event = TurnEvent::Move {
        mark: Mark::X,
        cell: 7,
    };
    assert!(matches!(
        game.apply_remote_event(event),
        RemoteOutcome::Applied(_)
    ));
    let snapshot = game.clone();

    assert_eq!(game.apply_remote_event(event), RemoteOutcome::Ignored);
    assert_eq!(*game.board(), *snapshot.board());
    assert_eq!(*game.current_turn(), *snapshot.current_turn());
}

#[test]
fn test_opponent_forfeit_wins_without_board_change() {
    let mut game = Game::new(5, DeviceMode::Networked, Mark::X).unwrap();
    let board_before = game.board().clone();

    let outcome = game.apply_remote_event(TurnEvent::Forfeit(Mark::O));

    assert_eq!(outcome, RemoteOutcome::Forfeited);
    assert_eq!(*game.board(), board_before);
    assert_eq!(
        *game.status(),
        GameStatus::Won {
            winner: Mark::X,
            line: None,
        }
    );
}

#[test]
fn test_own_forfeit_echo_is_ignored() {
    let mut game = Game::new(5, DeviceMode::Networked, Mark::O).unwrap();
    assert_eq!(
        game.apply_remote_event(TurnEvent::Forfeit(Mark::O)),
        RemoteOutcome::Ignored
    );
    assert_eq!(*game.status(), GameStatus::InProgress);
}

#[test]
fn test_winning_move_sets_terminal_status() {
    let mut game = Game::new(3, DeviceMode::Local, Mark::X).unwrap();
    // X: 0, 1, 2 across the top; O: 3, 4 in between.
    for cell in [0, 3, 1, 4] {
        game.apply_local_move(cell).unwrap();
    }
    let report = game.apply_local_move(2).unwrap();

    let line = report.winning_line.expect("top row must win");
    assert_eq!(line.cells, vec![0, 1, 2]);
    assert!(matches!(
        game.status(),
        GameStatus::Won {
            winner: Mark::X,
            line: Some(_),
        }
    ));
}

#[test]
fn test_no_moves_after_match_over() {
    let mut game = Game::new(3, DeviceMode::Local, Mark::X).unwrap();
    for cell in [0, 3, 1, 4, 2] {
        game.apply_local_move(cell).unwrap();
    }
    assert!(game.apply_local_move(5).is_err());
    assert_eq!(
        game.apply_remote_event(TurnEvent::Move {
            mark: Mark::O,
            cell: 5,
        }),
        RemoteOutcome::Ignored
    );
}

#[test]
fn test_abandon_is_terminal_and_one_way() {
    let mut game = Game::new(5, DeviceMode::Local, Mark::X).unwrap();
    game.abandon();
    assert_eq!(*game.status(), GameStatus::Abandoned);

    // A won game is never downgraded to abandoned.
    let mut won = Game::new(3, DeviceMode::Networked, Mark::X).unwrap();
    won.apply_remote_event(TurnEvent::Forfeit(Mark::O));
    won.abandon();
    assert!(matches!(won.status(), GameStatus::Won { .. }));
}
