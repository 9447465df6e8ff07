// src/lib.rs
//! Two-player chess over a shared room record: move rules, FEN codec,
//! check and mate detection, and the session that arbitrates turns.

pub mod board;
pub mod check;
pub mod config;
pub mod error;
pub mod fen;
pub mod room;
pub mod rules;
pub mod session;
pub mod types;

pub use board::{Board, CastlingRights, Position};
pub use check::Verdict;
pub use config::{Config, DrawRules};
pub use error::{FenError, GameError, MoveError, ParseMoveError, RoomError, SaveLoadError};
pub use room::{InMemoryRoomStore, MoveUpdate, RoomClient, RoomPublisher, RoomRecord, RoomStore};
pub use session::{DrawReason, GameSession, GameStatus, MoveOutcome, MovePublisher, MoveRecord, PlayerId};
pub use types::{Color, Move, Piece, PieceType, Square};
