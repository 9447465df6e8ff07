// src/room.rs
//! The external room document and the store it lives in. The store is the
//! authority on turn order: commits are conditioned on the turn the
//! proposer read, so two near-simultaneous proposals cannot both land.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::board::Position;
use crate::config::DrawRules;
use crate::error::{GameError, RoomError};
use crate::fen::{self, START_FEN};
use crate::session::{GameSession, MoveOutcome, MovePublisher, PlayerId};
use crate::types::{Color, Move};

// --- Room Record ---

/// The shared document keyed by room id. Holds FEN text, never a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub fen: String,
    pub current_turn: Color,
    pub white_player: Option<PlayerId>,
    pub black_player: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<String>,
}

impl Default for RoomRecord {
    fn default() -> Self { RoomRecord::new_game() }
}

impl RoomRecord {
    pub fn new_game() -> Self {
        RoomRecord {
            fen: START_FEN.to_string(),
            current_turn: Color::White,
            white_player: None,
            black_player: None,
            last_move: None,
        }
    }

    pub fn player(&self, color: Color) -> Option<&PlayerId> {
        match color {
            Color::White => self.white_player.as_ref(),
            Color::Black => self.black_player.as_ref(),
        }
    }

    fn seat_mut(&mut self, color: Color) -> &mut Option<PlayerId> {
        match color {
            Color::White => &mut self.white_player,
            Color::Black => &mut self.black_player,
        }
    }

    pub fn is_full(&self) -> bool {
        self.white_player.is_some() && self.black_player.is_some()
    }

    /// Decodes the FEN and checks it agrees with `currentTurn`.
    pub fn position(&self) -> Result<Position, RoomError> {
        let position = fen::decode(&self.fen)?;
        if position.turn != self.current_turn {
            return Err(RoomError::TurnMismatch { record: self.current_turn, fen: position.turn });
        }
        Ok(position)
    }
}

/// Fields written on every committed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveUpdate {
    pub fen: String,
    pub current_turn: Color,
    pub last_move: String,
}

// --- Store ---

/// A key-value document store with conditional writes and subscriptions.
pub trait RoomStore {
    fn create(&self, room_id: &str, record: RoomRecord) -> Result<(), RoomError>;

    fn fetch(&self, room_id: &str) -> Result<RoomRecord, RoomError>;

    /// Returns the seat the identity already holds, or gives it the first
    /// free one (White before Black).
    fn claim_seat(&self, room_id: &str, identity: &PlayerId) -> Result<(Color, RoomRecord), RoomError>;

    /// Writes the update only if the room still says `expected_turn` is to
    /// move; otherwise fails with `StaleTurn`.
    fn commit_move(&self, room_id: &str, expected_turn: Color, update: MoveUpdate) -> Result<RoomRecord, RoomError>;

    /// Every later write to the room is delivered as a full record.
    fn subscribe(&self, room_id: &str) -> Result<Receiver<RoomRecord>, RoomError>;

    fn remove(&self, room_id: &str) -> Result<(), RoomError>;
}

#[derive(Debug)]
struct RoomEntry {
    record: RoomRecord,
    subscribers: Vec<Sender<RoomRecord>>,
}

impl RoomEntry {
    fn broadcast(&mut self) {
        let record = &self.record;
        // Dropped receivers are pruned here.
        self.subscribers.retain(|tx| tx.send(record.clone()).is_ok());
    }
}

/// Process-local store, sharable between clients through an `Arc`.
#[derive(Debug, Default)]
pub struct InMemoryRoomStore {
    rooms: Mutex<HashMap<String, RoomEntry>>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, RoomEntry>>, RoomError> {
        self.rooms.lock().map_err(|_| RoomError::StorePoisoned)
    }
}

fn entry_mut<'a>(rooms: &'a mut HashMap<String, RoomEntry>, room_id: &str) -> Result<&'a mut RoomEntry, RoomError> {
    rooms.get_mut(room_id).ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
}

impl RoomStore for InMemoryRoomStore {
    fn create(&self, room_id: &str, record: RoomRecord) -> Result<(), RoomError> {
        let mut rooms = self.lock()?;
        if rooms.contains_key(room_id) {
            return Err(RoomError::RoomExists(room_id.to_string()));
        }
        rooms.insert(room_id.to_string(), RoomEntry { record, subscribers: Vec::new() });
        info!(room = room_id, "room created");
        Ok(())
    }

    fn fetch(&self, room_id: &str) -> Result<RoomRecord, RoomError> {
        let mut rooms = self.lock()?;
        Ok(entry_mut(&mut rooms, room_id)?.record.clone())
    }

    fn claim_seat(&self, room_id: &str, identity: &PlayerId) -> Result<(Color, RoomRecord), RoomError> {
        let mut rooms = self.lock()?;
        let entry = entry_mut(&mut rooms, room_id)?;

        if let Some(color) = Color::BOTH.into_iter().find(|c| entry.record.player(*c) == Some(identity)) {
            return Ok((color, entry.record.clone()));
        }
        let color = Color::BOTH.into_iter()
            .find(|c| entry.record.player(*c).is_none())
            .ok_or_else(|| RoomError::RoomFull(room_id.to_string()))?;

        *entry.record.seat_mut(color) = Some(identity.clone());
        info!(room = room_id, %color, player = %identity, "seat claimed");
        entry.broadcast();
        Ok((color, entry.record.clone()))
    }

    fn commit_move(&self, room_id: &str, expected_turn: Color, update: MoveUpdate) -> Result<RoomRecord, RoomError> {
        let mut rooms = self.lock()?;
        let entry = entry_mut(&mut rooms, room_id)?;

        let found = entry.record.current_turn;
        if found != expected_turn {
            warn!(room = room_id, expected = %expected_turn, %found, "conditional write refused");
            return Err(RoomError::StaleTurn { expected: expected_turn, found });
        }

        entry.record.fen = update.fen;
        entry.record.current_turn = update.current_turn;
        entry.record.last_move = Some(update.last_move);
        debug!(room = room_id, fen = %entry.record.fen, "room updated");
        entry.broadcast();
        Ok(entry.record.clone())
    }

    fn subscribe(&self, room_id: &str) -> Result<Receiver<RoomRecord>, RoomError> {
        let mut rooms = self.lock()?;
        let entry = entry_mut(&mut rooms, room_id)?;
        let (tx, rx) = mpsc::channel();
        entry.subscribers.push(tx);
        Ok(rx)
    }

    fn remove(&self, room_id: &str) -> Result<(), RoomError> {
        let mut rooms = self.lock()?;
        rooms.remove(room_id)
            .map(|_| info!(room = room_id, "room removed"))
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
    }
}

// --- Publishing ---

/// Publishes committed moves to a room through the store's conditional write.
pub struct RoomPublisher<'a, S: RoomStore + ?Sized> {
    store: &'a S,
    room_id: &'a str,
}

impl<'a, S: RoomStore + ?Sized> RoomPublisher<'a, S> {
    pub fn new(store: &'a S, room_id: &'a str) -> Self {
        RoomPublisher { store, room_id }
    }
}

impl<S: RoomStore + ?Sized> MovePublisher for RoomPublisher<'_, S> {
    fn publish(&mut self, outcome: &MoveOutcome) -> Result<(), RoomError> {
        let update = MoveUpdate {
            fen: outcome.fen.clone(),
            current_turn: outcome.position.turn,
            last_move: outcome.mv.to_string(),
        };
        self.store.commit_move(self.room_id, outcome.player, update).map(|_| ())
    }
}

// --- Client ---

/// One participant's connection to a room: a seat, a local session and a
/// subscription that keeps the session in step with the store.
pub struct RoomClient<S: RoomStore> {
    store: Arc<S>,
    room_id: String,
    identity: PlayerId,
    color: Color,
    session: GameSession,
    updates: Receiver<RoomRecord>,
}

impl<S: RoomStore> RoomClient<S> {
    /// Claims a seat and hydrates the local session from the room record.
    pub fn join(store: Arc<S>, room_id: &str, identity: PlayerId, draw_rules: DrawRules) -> Result<Self, GameError> {
        let updates = store.subscribe(room_id)?;
        let (color, record) = store.claim_seat(room_id, &identity)?;
        let session = GameSession::from_room(&record, draw_rules)?;
        info!(room = room_id, %color, player = %identity, "joined room");
        Ok(RoomClient { store, room_id: room_id.to_string(), identity, color, session, updates })
    }

    pub fn color(&self) -> Color { self.color }

    pub fn identity(&self) -> &PlayerId { &self.identity }

    pub fn room_id(&self) -> &str { &self.room_id }

    pub fn session(&self) -> &GameSession { &self.session }

    /// Drains pending broadcasts and applies only the newest one. Returns
    /// whether the local position changed.
    pub fn sync(&mut self) -> Result<bool, GameError> {
        let mut latest = None;
        loop {
            match self.updates.try_recv() {
                Ok(record) => latest = Some(record),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if latest.is_none() {
                        return Err(RoomError::RoomNotFound(self.room_id.clone()).into());
                    }
                    break;
                }
            }
        }
        match latest {
            Some(record) => Ok(self.session.apply_snapshot(&record)?),
            None => Ok(false),
        }
    }

    /// Re-reads the room directly, bypassing the subscription.
    pub fn refresh(&mut self) -> Result<bool, GameError> {
        let record = self.store.fetch(&self.room_id)?;
        Ok(self.session.apply_snapshot(&record)?)
    }

    /// Syncs, then proposes `mv` with the room as publisher. A `StaleTurn`
    /// refusal re-fetches the room before the error is returned, so the
    /// caller can simply retry.
    pub fn play(&mut self, mv: Move) -> Result<MoveOutcome, GameError> {
        self.sync()?;
        let mut publisher = RoomPublisher::new(&*self.store, &self.room_id);
        match self.session.propose_move(&self.identity, mv, &mut publisher) {
            Err(GameError::Room(err)) if err.is_retryable() => {
                warn!(room = %self.room_id, player = %self.identity, error = %err, "lost the race for the turn; re-fetching");
                self.refresh()?;
                Err(GameError::Room(err))
            }
            other => other,
        }
    }
}
