//! Networked play for grid tic-tac-toe.
//!
//! Two devices synchronize a match through a shared mutable record keyed by
//! a 4-character room code, over a generic get/set/subscribe blob store
//! with last-write-wins semantics. This crate provides:
//!
//! - **Store boundary**: the [`KeyValueStore`] trait, cancellable
//!   [`Subscription`] handles, and an in-memory reference store.
//! - **Room protocol**: the shared record's wire shape, the turn-event
//!   sentinel codec, and create/join/publish/subscribe operations.
//! - **Match controller**: the phase state machine wiring the core game to
//!   the protocol, consuming UI events and emitting session events.
//!
//! Everything is single-consumer and callback-driven: subscriptions only
//! forward into the controller's channel, and state changes happen on the
//! caller's task.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod room;
mod session;
mod store;

pub use error::{SessionError, SyncError};
pub use room::{
    CODE_LEN, ROOM_NAMESPACE, RoomRecord, RoomSync, TurnWire, normalize_code, room_path,
};
pub use session::{MatchController, MatchSettings, Phase, SessionEvent, StoreSignal};
pub use store::{KeyValueStore, MemoryStore, StoreError, StoreValue, Subscription, WatchCallback};
