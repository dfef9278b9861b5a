//! Sync-side error types.

use crate::store::StoreError;
use derive_more::{Display, Error};
use tactix_core::GameError;

/// Errors from the room protocol and the store boundary.
#[derive(Debug, Clone, Display, Error)]
pub enum SyncError {
    /// No room record exists under the given code.
    #[display("room {code} not found")]
    RoomNotFound {
        /// Room code that was looked up.
        code: String,
    },
    /// The room's second-player slot is already taken.
    #[display("room {code} is full")]
    RoomFull {
        /// Room code that was joined.
        code: String,
    },
    /// A record fetched from the store did not decode.
    #[display("malformed record at {path}: {detail}")]
    MalformedRecord {
        /// Store path of the bad record.
        path: String,
        /// Decode failure description.
        detail: String,
    },
    /// The store boundary failed.
    #[display("{_0}")]
    Store(#[error(source)] StoreError),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Store(err)
    }
}

/// Errors from the match controller.
#[derive(Debug, Display, Error)]
pub enum SessionError {
    /// Game-rule violation (bad config, occupied cell, match over).
    #[display("{_0}")]
    Game(#[error(source)] GameError),
    /// Protocol or store failure.
    #[display("{_0}")]
    Sync(#[error(source)] SyncError),
    /// At most one subscription of each kind may be active; creating a
    /// second without cancelling the first is a logic error.
    #[display("a {kind} subscription is already active")]
    SubscriptionActive {
        /// Which subscription kind was double-registered.
        kind: &'static str,
    },
    /// The requested operation is not valid in the current phase.
    #[display("operation not valid in phase {phase}")]
    WrongPhase {
        /// Name of the phase the controller was in.
        phase: &'static str,
    },
}

impl From<GameError> for SessionError {
    fn from(err: GameError) -> Self {
        SessionError::Game(err)
    }
}

impl From<SyncError> for SessionError {
    fn from(err: SyncError) -> Self {
        SessionError::Sync(err)
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Sync(SyncError::Store(err))
    }
}
