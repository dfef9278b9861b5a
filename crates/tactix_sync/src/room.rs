//! Room sync protocol: the shared record two clients play through.
//!
//! A room is one record under `tictactoe/rooms/<CODE>`, keyed by a short
//! code the host hands to the joiner. The host writes room metadata and its
//! own turns; the joiner writes the join flag and its own turns — concurrent
//! writers to the same field are avoided by convention, not mechanism, and
//! the store's last-write-wins policy does the rest.

use crate::error::SyncError;
use crate::store::{KeyValueStore, StoreValue, Subscription};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tactix_core::{Mark, TurnEvent};
use tracing::{debug, info, instrument, warn};

/// Store namespace reserved for room records.
pub const ROOM_NAMESPACE: &str = "tictactoe/rooms";

/// Number of characters in a room code.
pub const CODE_LEN: usize = 4;

/// Sentinel meaning "no move yet" on the wire.
const CELL_NO_MOVE: i64 = -1;
/// Sentinel meaning "the sender forfeited" on the wire.
const CELL_FORFEIT: i64 = -2;

/// Store path of the record for a room code.
pub fn room_path(code: &str) -> String {
    format!("{ROOM_NAMESPACE}/{code}")
}

/// Normalizes user-entered room code text: trimmed and uppercased.
pub fn normalize_code(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Wire form of a turn notification: a mark plus an overloaded cell index.
///
/// Decoded into [`TurnEvent`] here at the edge and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnWire {
    /// Mark the event belongs to.
    #[serde(rename = "type")]
    pub mark: Mark,
    /// ≥0 a flat cell index, -1 no move yet, -2 forfeit.
    #[serde(rename = "cellIndex")]
    pub cell_index: i64,
}

impl TurnWire {
    /// Encodes a decoded event back into wire form.
    pub fn encode(event: TurnEvent) -> Self {
        match event {
            // The initial sentinel carries X by convention; decoders never
            // look at the mark when the index is -1.
            TurnEvent::NoMoveYet => Self {
                mark: Mark::X,
                cell_index: CELL_NO_MOVE,
            },
            TurnEvent::Forfeit(mark) => Self {
                mark,
                cell_index: CELL_FORFEIT,
            },
            TurnEvent::Move { mark, cell } => Self {
                mark,
                cell_index: cell as i64,
            },
        }
    }

    /// Decodes the overloaded integer into a tagged event. Any negative
    /// index other than the two known sentinels is treated as "no move".
    pub fn decode(self) -> TurnEvent {
        match self.cell_index {
            CELL_FORFEIT => TurnEvent::Forfeit(self.mark),
            index if index >= 0 => TurnEvent::Move {
                mark: self.mark,
                cell: index as usize,
            },
            _ => TurnEvent::NoMoveYet,
        }
    }
}

/// The externally persisted room record.
///
/// `is_won` is part of the record shape but carries no logic here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    /// The room's own code, mirrored into the record.
    pub code: String,
    /// Flips to true once a second player joins.
    pub friend_joined_room: bool,
    /// Advisory win flag; unused by core logic.
    pub is_won: bool,
    /// Board side length chosen by the host.
    pub cell_count: usize,
    /// Last turn event written by either side.
    pub current_turn: TurnWire,
}

/// Protocol operations against the shared store.
#[derive(Clone)]
pub struct RoomSync {
    store: Arc<dyn KeyValueStore>,
}

impl RoomSync {
    /// Wraps a store handle.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Generates a 4-character uppercase base-36 room code.
    ///
    /// Collisions are not checked; with a 36⁴ space and match-length room
    /// lifetimes this is an accepted risk.
    pub fn generate_code() -> String {
        const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let mut rng = rand::thread_rng();
        (0..CODE_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }

    /// Creates a fresh room record for a board of the given side and
    /// returns its code.
    ///
    /// The record starts unjoined with the "no move yet" sentinel.
    #[instrument(skip(self))]
    pub async fn create_room(&self, side: usize) -> Result<String, SyncError> {
        let code = Self::generate_code();
        let record = RoomRecord {
            code: code.clone(),
            friend_joined_room: false,
            is_won: false,
            cell_count: side,
            current_turn: TurnWire::encode(TurnEvent::NoMoveYet),
        };
        let value = serde_json::to_value(&record)
            .map_err(|e| SyncError::MalformedRecord {
                path: room_path(&code),
                detail: e.to_string(),
            })?;
        self.store.set(&room_path(&code), value).await?;
        info!(code = %code, side, "room created");
        Ok(code)
    }

    /// Fetches a room record and claims the second-player slot.
    ///
    /// Two simultaneous joiners can both pass the "not yet joined" check
    /// before either write lands (last write wins, no test-and-set); the
    /// race is accepted and documented, not fixed here.
    ///
    /// # Errors
    ///
    /// [`SyncError::RoomNotFound`] when no record exists,
    /// [`SyncError::RoomFull`] when the flag is already set.
    #[instrument(skip(self))]
    pub async fn join_room(&self, code: &str) -> Result<RoomRecord, SyncError> {
        let path = room_path(code);
        let value = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| SyncError::RoomNotFound {
                code: code.to_owned(),
            })?;
        let record: RoomRecord =
            serde_json::from_value(value).map_err(|e| SyncError::MalformedRecord {
                path: path.clone(),
                detail: e.to_string(),
            })?;

        if record.friend_joined_room {
            warn!(code, "room already has a second player");
            return Err(SyncError::RoomFull {
                code: code.to_owned(),
            });
        }

        self.store
            .set(&format!("{path}/friendJoinedRoom"), StoreValue::Bool(true))
            .await?;
        info!(code, side = record.cell_count, "joined room");
        Ok(record)
    }

    /// Overwrites the room's turn-event field.
    #[instrument(skip(self))]
    pub async fn publish_turn(&self, code: &str, event: TurnEvent) -> Result<(), SyncError> {
        let wire = TurnWire::encode(event);
        let value = serde_json::to_value(wire).map_err(|e| SyncError::MalformedRecord {
            path: room_path(code),
            detail: e.to_string(),
        })?;
        self.store
            .set(&format!("{}/currentTurn", room_path(code)), value)
            .await?;
        debug!(code, ?event, "turn published");
        Ok(())
    }

    /// Watches the room's join flag; `on_joined` fires exactly once, on the
    /// false→true flip (or immediately if already true). The caller owns the
    /// handle and tears it down on leaving the lobby.
    pub fn subscribe_join(
        &self,
        code: &str,
        on_joined: Box<dyn Fn() + Send + Sync>,
    ) -> Subscription {
        let fired = AtomicBool::new(false);
        self.store.subscribe(
            &format!("{}/friendJoinedRoom", room_path(code)),
            Box::new(move |value| {
                if value == Some(StoreValue::Bool(true)) && !fired.swap(true, Ordering::SeqCst) {
                    on_joined();
                }
            }),
        )
    }

    /// Watches the room's turn-event field, decoding each write (including
    /// the initial sentinel replay — consumers must ignore [`TurnEvent::NoMoveYet`]
    /// and tolerate repeated values). Malformed values are logged and skipped.
    pub fn subscribe_turns(
        &self,
        code: &str,
        on_turn: Box<dyn Fn(TurnEvent) + Send + Sync>,
    ) -> Subscription {
        let path = format!("{}/currentTurn", room_path(code));
        let log_path = path.clone();
        self.store.subscribe(
            &path,
            Box::new(move |value| {
                let Some(value) = value else { return };
                match serde_json::from_value::<TurnWire>(value) {
                    Ok(wire) => on_turn(wire.decode()),
                    Err(err) => warn!(path = %log_path, %err, "skipping malformed turn value"),
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_codec() {
        assert_eq!(
            TurnWire {
                mark: Mark::O,
                cell_index: -1,
            }
            .decode(),
            TurnEvent::NoMoveYet
        );
        assert_eq!(
            TurnWire {
                mark: Mark::O,
                cell_index: -2,
            }
            .decode(),
            TurnEvent::Forfeit(Mark::O)
        );
        assert_eq!(
            TurnWire {
                mark: Mark::X,
                cell_index: 17,
            }
            .decode(),
            TurnEvent::Move {
                mark: Mark::X,
                cell: 17,
            }
        );
    }

    #[test]
    fn test_generated_codes_are_well_formed() {
        for _ in 0..50 {
            let code = RoomSync::generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab3z "), "AB3Z");
    }

    #[test]
    fn test_wire_field_names() {
        let wire = TurnWire {
            mark: Mark::X,
            cell_index: 5,
        };
        let json = serde_json::to_value(wire).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "x", "cellIndex": 5 }));
    }
}
