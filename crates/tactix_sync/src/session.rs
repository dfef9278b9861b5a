//! Match controller — the state machine driving a match end to end.
//!
//! Phases run Idle → Hosting/Joining → Playing → Finished → Idle. The
//! controller owns the game, the room code, and both store subscriptions,
//! and is the single consumer of store signals: subscription callbacks only
//! forward into a channel, and [`MatchController::process_pending`] /
//! [`MatchController::next_signal`] apply them on the caller's task. Turn
//! state lives here as owned fields updated through these methods — nothing
//! is mutated from inside a callback.

use crate::error::{SessionError, SyncError};
use crate::room::{CODE_LEN, RoomSync, normalize_code};
use crate::store::{KeyValueStore, Subscription};
use std::sync::Arc;
use tactix_core::{
    DeviceMode, Game, GameError, GameStatus, MAX_SIDE, MIN_SIDE, Mark, RemoteOutcome, TurnEvent,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, instrument, warn};

/// Where the controller is in a match's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No match underway; settings may be changed.
    Idle,
    /// Hosting a room, waiting for the second player.
    Hosting {
        /// Code the joiner must enter.
        code: String,
    },
    /// Entering a code to join someone else's room.
    Joining,
    /// A match is being played.
    Playing,
    /// The match reached a terminal status; awaiting reset.
    Finished,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Hosting { .. } => "hosting",
            Phase::Joining => "joining",
            Phase::Playing => "playing",
            Phase::Finished => "finished",
        }
    }
}

/// Pre-match settings, configurable while [`Phase::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    /// Board side length, 3..=10.
    pub side: usize,
    /// Shared-device or networked play.
    pub mode: DeviceMode,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            side: 7,
            mode: DeviceMode::Local,
        }
    }
}

/// Raw notification forwarded out of a store subscription callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSignal {
    /// The room's join flag flipped to true.
    FriendJoined,
    /// A turn event was written to the room record.
    Turn(TurnEvent),
}

/// State change the UI collaborator should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The second player arrived; play begins.
    OpponentJoined,
    /// A mark landed on the board.
    MoveApplied {
        /// Mark that was placed.
        mark: Mark,
        /// Flat index of the placed cell.
        cell: usize,
    },
    /// The match was won.
    GameWon {
        /// Winning mark.
        winner: Mark,
        /// Winning cells, absent for a forfeit win.
        line: Option<Vec<usize>>,
    },
    /// The opponent walked away; the local side wins.
    OpponentForfeited,
}

/// Top-level controller wiring the game, the room protocol, and the store
/// subscriptions together.
pub struct MatchController {
    sync: RoomSync,
    settings: MatchSettings,
    phase: Phase,
    game: Option<Game>,
    room_code: Option<String>,
    join_sub: Option<Subscription>,
    turn_sub: Option<Subscription>,
    signal_tx: UnboundedSender<StoreSignal>,
    signal_rx: UnboundedReceiver<StoreSignal>,
}

impl MatchController {
    /// Creates an idle controller over the given store.
    #[instrument(skip(store))]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        info!("creating match controller");
        Self {
            sync: RoomSync::new(store),
            settings: MatchSettings::default(),
            phase: Phase::Idle,
            game: None,
            room_code: None,
            join_sub: None,
            turn_sub: None,
            signal_tx,
            signal_rx,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Current settings.
    pub fn settings(&self) -> MatchSettings {
        self.settings
    }

    /// The active game, if one is underway or finished.
    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    /// Room code of the current networked match — the string the copy-code
    /// button hands to the clipboard collaborator.
    pub fn room_code(&self) -> Option<&str> {
        self.room_code.as_deref()
    }

    /// Picks the board side for the next match.
    ///
    /// # Errors
    ///
    /// [`SessionError::WrongPhase`] outside [`Phase::Idle`],
    /// [`GameError::InvalidConfig`] outside 3..=10.
    #[instrument(skip(self))]
    pub fn select_side(&mut self, side: usize) -> Result<(), SessionError> {
        self.require_phase(Phase::Idle)?;
        if !(MIN_SIDE..=MAX_SIDE).contains(&side) {
            return Err(GameError::InvalidConfig {
                side,
                min: MIN_SIDE,
                max: MAX_SIDE,
            }
            .into());
        }
        self.settings.side = side;
        Ok(())
    }

    /// Starts a shared-device match immediately.
    #[instrument(skip(self))]
    pub fn start_local(&mut self) -> Result<(), SessionError> {
        self.require_phase(Phase::Idle)?;
        self.settings.mode = DeviceMode::Local;
        self.game = Some(Game::new(self.settings.side, DeviceMode::Local, Mark::X)?);
        self.phase = Phase::Playing;
        info!(side = self.settings.side, "local match started");
        Ok(())
    }

    /// Creates a room and waits for a second player. The host plays X.
    ///
    /// Returns the room code to hand to the joiner.
    #[instrument(skip(self))]
    pub async fn host_room(&mut self) -> Result<String, SessionError> {
        self.require_phase(Phase::Idle)?;
        if self.join_sub.is_some() {
            return Err(SessionError::SubscriptionActive { kind: "join-wait" });
        }
        self.settings.mode = DeviceMode::Networked;

        let code = self.sync.create_room(self.settings.side).await?;

        let tx = self.signal_tx.clone();
        self.join_sub = Some(self.sync.subscribe_join(
            &code,
            Box::new(move || {
                let _ = tx.send(StoreSignal::FriendJoined);
            }),
        ));

        self.room_code = Some(code.clone());
        self.phase = Phase::Hosting { code: code.clone() };
        info!(code = %code, "hosting room");
        Ok(code)
    }

    /// Moves to the join screen.
    #[instrument(skip(self))]
    pub fn open_join(&mut self) -> Result<(), SessionError> {
        self.require_phase(Phase::Idle)?;
        self.settings.mode = DeviceMode::Networked;
        self.phase = Phase::Joining;
        Ok(())
    }

    /// Joins a hosted room by code. The joiner plays O and inherits the
    /// host's board size; a successful join goes straight to playing.
    ///
    /// # Errors
    ///
    /// [`SyncError::RoomNotFound`] / [`SyncError::RoomFull`] surface to the
    /// caller and leave the controller on the join screen.
    #[instrument(skip(self))]
    pub async fn join_room(&mut self, input: &str) -> Result<Vec<SessionEvent>, SessionError> {
        self.require_phase(Phase::Joining)?;
        let code = normalize_code(input);
        if code.len() != CODE_LEN {
            return Err(SyncError::RoomNotFound { code }.into());
        }

        let record = self.sync.join_room(&code).await?;
        self.settings.side = record.cell_count;
        self.room_code = Some(code);
        self.begin_playing(Mark::O)?;
        Ok(vec![SessionEvent::OpponentJoined])
    }

    /// Applies a cell press from the local player.
    ///
    /// Ignored (empty event list) outside [`Phase::Playing`] or when it is
    /// not the local side's turn in networked mode — the coordinator stays
    /// permissive and this is where interaction is gated. A broadcastable
    /// move publishes exactly once before returning.
    #[instrument(skip(self))]
    pub async fn press_cell(&mut self, cell: usize) -> Result<Vec<SessionEvent>, SessionError> {
        if self.phase != Phase::Playing {
            debug!(phase = self.phase.name(), "press ignored outside play");
            return Ok(Vec::new());
        }
        let game = self.game.as_mut().ok_or(SessionError::WrongPhase {
            phase: self.phase.name(),
        })?;
        if !game.can_move_locally() {
            debug!(cell, "press ignored: not the local side's turn");
            return Ok(Vec::new());
        }

        let report = game.apply_local_move(cell)?;
        let mut events = vec![SessionEvent::MoveApplied {
            mark: report.mark,
            cell: report.cell,
        }];

        if report.publish {
            let code = self.room_code.clone().ok_or(SessionError::WrongPhase {
                phase: self.phase.name(),
            })?;
            self.sync
                .publish_turn(
                    &code,
                    TurnEvent::Move {
                        mark: report.mark,
                        cell: report.cell,
                    },
                )
                .await?;
        }

        if let Some(line) = report.winning_line {
            events.push(SessionEvent::GameWon {
                winner: report.mark,
                line: Some(line.cells),
            });
            self.finish_match();
        }
        Ok(events)
    }

    /// Applies one store signal.
    #[instrument(skip(self))]
    pub fn handle_signal(&mut self, signal: StoreSignal) -> Result<Vec<SessionEvent>, SessionError> {
        match signal {
            StoreSignal::FriendJoined => {
                // Only meaningful while hosting; the join watcher latches,
                // but a stale signal may still arrive after leaving.
                if !matches!(self.phase, Phase::Hosting { .. }) {
                    debug!(phase = self.phase.name(), "stale join signal dropped");
                    return Ok(Vec::new());
                }
                if let Some(sub) = self.join_sub.take() {
                    sub.cancel();
                }
                self.begin_playing(Mark::X)?;
                info!("second player joined; match started");
                Ok(vec![SessionEvent::OpponentJoined])
            }
            StoreSignal::Turn(event) => {
                let Some(game) = self.game.as_mut() else {
                    return Ok(Vec::new());
                };
                match game.apply_remote_event(event) {
                    RemoteOutcome::Ignored => Ok(Vec::new()),
                    RemoteOutcome::Forfeited => {
                        let winner = *game.local_mark();
                        self.finish_match();
                        Ok(vec![
                            SessionEvent::OpponentForfeited,
                            SessionEvent::GameWon { winner, line: None },
                        ])
                    }
                    RemoteOutcome::Applied(report) => {
                        let mut events = vec![SessionEvent::MoveApplied {
                            mark: report.mark,
                            cell: report.cell,
                        }];
                        if let Some(line) = report.winning_line {
                            events.push(SessionEvent::GameWon {
                                winner: report.mark,
                                line: Some(line.cells),
                            });
                            self.finish_match();
                        }
                        Ok(events)
                    }
                }
            }
        }
    }

    /// Drains and applies every signal already delivered, returning the
    /// session events they produced.
    pub fn process_pending(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let mut events = Vec::new();
        while let Ok(signal) = self.signal_rx.try_recv() {
            events.extend(self.handle_signal(signal)?);
        }
        Ok(events)
    }

    /// Waits for the next store signal and applies it. Returns `None` only
    /// if the controller's own sender vanished, which cannot happen while
    /// `self` is alive.
    pub async fn next_signal(&mut self) -> Option<Result<Vec<SessionEvent>, SessionError>> {
        let signal = self.signal_rx.recv().await?;
        Some(self.handle_signal(signal))
    }

    /// Local-mode rematch: rebuilds the board in place with the same
    /// settings (the Reset button of shared-device play).
    #[instrument(skip(self))]
    pub fn rematch(&mut self) -> Result<(), SessionError> {
        if self.settings.mode != DeviceMode::Local
            || !matches!(self.phase, Phase::Playing | Phase::Finished)
        {
            return Err(SessionError::WrongPhase {
                phase: self.phase.name(),
            });
        }
        self.game = Some(Game::new(self.settings.side, DeviceMode::Local, Mark::X)?);
        self.phase = Phase::Playing;
        info!("local rematch started");
        Ok(())
    }

    /// Leaves a finished match: Finished → Idle.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.require_phase(Phase::Finished)?;
        self.teardown();
        Ok(())
    }

    /// Backs out to Idle from anywhere.
    ///
    /// Abandoning a live networked match publishes a forfeit so the
    /// opponent learns they won; every subscription is torn down.
    #[instrument(skip(self))]
    pub async fn leave(&mut self) -> Result<(), SessionError> {
        let resigning = self.phase == Phase::Playing
            && self.settings.mode == DeviceMode::Networked
            && self
                .game
                .as_ref()
                .is_some_and(|g| *g.status() == GameStatus::InProgress);

        if resigning
            && let (Some(code), Some(game)) = (self.room_code.clone(), self.game.as_ref())
        {
            let event = game.resign_event();
            if let Err(err) = self.sync.publish_turn(&code, event).await {
                // Leaving still proceeds; the opponent will simply stall.
                warn!(%err, "failed to publish forfeit while leaving");
            }
        }

        if let Some(game) = self.game.as_mut() {
            game.abandon();
        }
        self.teardown();
        info!("returned to idle");
        Ok(())
    }

    /// Builds the game and, in networked mode, stands up the turn watcher.
    fn begin_playing(&mut self, local_mark: Mark) -> Result<(), SessionError> {
        if self.turn_sub.is_some() {
            return Err(SessionError::SubscriptionActive {
                kind: "turn-listener",
            });
        }
        self.game = Some(Game::new(
            self.settings.side,
            DeviceMode::Networked,
            local_mark,
        )?);

        let code = self.room_code.clone().ok_or(SessionError::WrongPhase {
            phase: self.phase.name(),
        })?;
        let tx = self.signal_tx.clone();
        self.turn_sub = Some(self.sync.subscribe_turns(
            &code,
            Box::new(move |event| {
                let _ = tx.send(StoreSignal::Turn(event));
            }),
        ));
        self.phase = Phase::Playing;
        debug!(code = %code, ?local_mark, "turn watcher up");
        Ok(())
    }

    /// Playing → Finished; the turn watcher has nothing left to deliver.
    fn finish_match(&mut self) {
        if let Some(sub) = self.turn_sub.take() {
            sub.cancel();
        }
        self.phase = Phase::Finished;
    }

    /// Drops match state and every subscription, returning to Idle.
    fn teardown(&mut self) {
        if let Some(sub) = self.join_sub.take() {
            sub.cancel();
        }
        if let Some(sub) = self.turn_sub.take() {
            sub.cancel();
        }
        self.game = None;
        self.room_code = None;
        self.phase = Phase::Idle;
    }

    fn require_phase(&self, expected: Phase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                phase: self.phase.name(),
            })
        }
    }
}

impl std::fmt::Debug for MatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchController")
            .field("phase", &self.phase)
            .field("settings", &self.settings)
            .field("room_code", &self.room_code)
            .finish_non_exhaustive()
    }
}
