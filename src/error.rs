// src/error.rs
use std::io;
use thiserror::Error;

use crate::session::GameStatus;
use crate::types::{Color, Move, Square};

// --- Custom Error Types ---

/// Every way a FEN string can violate the grammar. The codec never
/// returns a partially decoded position alongside one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("malformed FEN: expected 6 space-separated fields, found {0}")]
    FieldCount(usize),
    #[error("malformed FEN: expected 8 ranks, found {0}")]
    RankCount(usize),
    #[error("malformed FEN: rank {rank} describes {squares} squares instead of 8")]
    RankWidth { rank: u8, squares: usize },
    #[error("malformed FEN: unrecognized piece letter '{0}'")]
    UnknownPiece(char),
    #[error("malformed FEN: active color must be 'w' or 'b', found '{0}'")]
    ActiveColor(String),
    #[error("malformed FEN: invalid castling field '{0}'")]
    Castling(String),
    #[error("malformed FEN: invalid en passant field '{0}'")]
    EnPassant(String),
    #[error("malformed FEN: {field} must be a non-negative integer, found '{value}'")]
    Clock { field: &'static str, value: String },
    #[error("malformed FEN: expected exactly one {color} king, found {count}")]
    KingCount { color: Color, count: usize },
}

/// Move rejections. All are local: the session is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("not your turn: it is {turn}'s move")]
    NotYourTurn { turn: Color },
    #[error("no piece of yours on {0}")]
    NoPieceSelected(Square),
    #[error("illegal move pattern: {0}")]
    IllegalShape(Move),
    #[error("illegal move '{0}': leaves king in check")]
    SelfCheck(Move),
    #[error("invalid promotion in '{0}'")]
    InvalidPromotion(Move),
    #[error("game is not in progress ({0})")]
    GameNotActive(GameStatus),
}

/// Failures talking to the external room record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("room '{0}' does not exist")]
    RoomNotFound(String),
    #[error("room '{0}' already exists")]
    RoomExists(String),
    #[error("stale turn: expected {expected} to move but the room says {found}")]
    StaleTurn { expected: Color, found: Color },
    #[error("the {0} seat is already taken")]
    SeatTaken(Color),
    #[error("this player already holds the {0} seat")]
    AlreadySeated(Color),
    #[error("room '{0}' is full")]
    RoomFull(String),
    #[error("room record is corrupt: {0}")]
    CorruptRecord(#[from] FenError),
    #[error("room record says {record} to move but its FEN says {fen}")]
    TurnMismatch { record: Color, fen: Color },
    #[error("room store lock poisoned")]
    StorePoisoned,
}

impl RoomError {
    /// Conflicts that a client can recover from by re-fetching and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RoomError::StaleTurn { .. })
    }
}

/// Union returned by operations that cross the session/store boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl GameError {
    /// A missing room ends the session; everything else leaves it usable.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, GameError::Room(RoomError::RoomNotFound(_)))
    }
}

#[derive(Debug, Error)]
pub enum SaveLoadError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error with file '{0}': {1}")]
    Io(String, #[source] io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseMoveError {
    #[error("invalid move format '{0}': use e2e4 or a7a8q")]
    Format(String),
    #[error("invalid square '{0}'")]
    Square(String),
    #[error("invalid promotion character '{0}': use q, r, b or n")]
    Promotion(char),
}
