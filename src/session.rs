// src/session.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::board::Position;
use crate::check::{evaluate, is_in_check, Verdict};
use crate::config::DrawRules;
use crate::error::{GameError, MoveError, RoomError, SaveLoadError};
use crate::fen;
use crate::room::RoomRecord;
use crate::rules::is_legal_shape;
use crate::types::{Color, Move, PieceType};

/// Opaque identity of a remote participant (an e-mail address in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self { PlayerId(s.to_string()) }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Game Status ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    FiftyMoveRule,
    ThreefoldRepetition,
    InsufficientMaterial,
}

/// Session state machine: `WaitingForOpponent -> Active/Check -> terminal`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GameStatus {
    WaitingForOpponent,
    Active,
    /// Active, with the side to move in check.
    Check,
    Checkmate { winner: Color },
    Stalemate,
    Draw { reason: DrawReason },
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Checkmate { .. } | GameStatus::Stalemate | GameStatus::Draw { .. })
    }

    /// Moves are accepted only in these states.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, GameStatus::Active | GameStatus::Check)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::WaitingForOpponent => write!(f, "waiting for opponent"),
            GameStatus::Active => write!(f, "active"),
            GameStatus::Check => write!(f, "check"),
            GameStatus::Checkmate { winner } => write!(f, "checkmate, {} wins", winner),
            GameStatus::Stalemate => write!(f, "stalemate"),
            GameStatus::Draw { reason } => write!(f, "draw ({:?})", reason),
        }
    }
}

// --- Move History ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub mv: String,
    pub player: Color,
    pub fen_after: String,
    pub is_check: bool,
    pub is_checkmate: bool,
}

impl MoveRecord {
    fn annotation(&self) -> &'static str {
        if self.is_checkmate { "#" } else if self.is_check { "+" } else { "" }
    }
}

/// A validated move together with everything committing it will produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub mv: Move,
    pub player: Color,
    pub position: Position,
    pub fen: String,
    pub status: GameStatus,
}

/// The external persistence/broadcast collaborator. `publish` is called
/// exactly once per move that is about to be committed; an error aborts
/// the commit and leaves the session untouched.
pub trait MovePublisher {
    fn publish(&mut self, outcome: &MoveOutcome) -> Result<(), RoomError>;
}

#[derive(Debug, Serialize)]
struct GameSummary<'a> {
    white_player: Option<&'a PlayerId>,
    black_player: Option<&'a PlayerId>,
    final_fen: String,
    status: GameStatus,
    moves: &'a [MoveRecord],
}

// --- Game Session ---

/// One game between two identities. Owns the live position, which is
/// replaced wholesale on every committed move or applied snapshot.
#[derive(Debug, Clone)]
pub struct GameSession {
    position: Position,
    history: Vec<MoveRecord>,
    seats: [Option<PlayerId>; 2],
    status: GameStatus,
    repetitions: HashMap<u64, u32>,
    draw_rules: DrawRules,
}

impl Default for GameSession {
    fn default() -> Self { GameSession::new(DrawRules::default()) }
}

impl GameSession {
    pub fn new(draw_rules: DrawRules) -> Self {
        GameSession::from_position(Position::initial(), draw_rules)
    }

    pub fn from_position(position: Position, draw_rules: DrawRules) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(position.position_key(), 1);
        GameSession {
            position,
            history: Vec::new(),
            seats: [None, None],
            status: GameStatus::WaitingForOpponent,
            repetitions,
            draw_rules,
        }
    }

    /// Hydrates a session from the external room record.
    pub fn from_room(record: &RoomRecord, draw_rules: DrawRules) -> Result<Self, RoomError> {
        let position = record.position()?;
        let mut session = GameSession::from_position(position, draw_rules);
        for color in Color::BOTH {
            if let Some(identity) = record.player(color) {
                session.bind(color, identity.clone())?;
            }
        }
        Ok(session)
    }

    pub fn position(&self) -> &Position { &self.position }

    pub fn fen(&self) -> String { fen::encode(&self.position) }

    pub fn history(&self) -> &[MoveRecord] { &self.history }

    pub fn status(&self) -> GameStatus { self.status }

    pub fn player(&self, color: Color) -> Option<&PlayerId> {
        self.seats[color.index()].as_ref()
    }

    pub fn color_of(&self, identity: &PlayerId) -> Option<Color> {
        Color::BOTH.into_iter().find(|c| self.player(*c) == Some(identity))
    }

    /// Binds an identity to a colour. Seats are write-once; rebinding the
    /// same identity is a no-op.
    pub fn bind(&mut self, color: Color, identity: PlayerId) -> Result<(), RoomError> {
        match self.player(color) {
            Some(existing) if *existing == identity => return Ok(()),
            Some(_) => return Err(RoomError::SeatTaken(color)),
            None => {}
        }
        if self.player(color.opponent()) == Some(&identity) {
            return Err(RoomError::AlreadySeated(color.opponent()));
        }
        info!(%color, player = %identity, "seat bound");
        self.seats[color.index()] = Some(identity);
        self.refresh_status();
        Ok(())
    }

    fn repetition_count(&self, position: &Position) -> u32 {
        self.repetitions.get(&position.position_key()).copied().unwrap_or(0)
    }

    /// Status of `position` for its side to move. `repeats` is how many times
    /// it will have occurred once it is the live position.
    fn status_for(&self, position: &Position, repeats: u32) -> GameStatus {
        if self.seats.iter().any(Option::is_none) {
            return GameStatus::WaitingForOpponent;
        }
        let verdict = evaluate(position, position.turn);
        match verdict {
            Verdict::Checkmate => return GameStatus::Checkmate { winner: position.turn.opponent() },
            Verdict::Stalemate => return GameStatus::Stalemate,
            Verdict::Check | Verdict::Normal => {}
        }

        let rules = self.draw_rules;
        if rules.fifty_move && position.halfmove_clock >= 100 {
            return GameStatus::Draw { reason: DrawReason::FiftyMoveRule };
        }
        if rules.threefold_repetition && repeats >= 3 {
            return GameStatus::Draw { reason: DrawReason::ThreefoldRepetition };
        }
        if rules.insufficient_material && position.is_insufficient_material() {
            return GameStatus::Draw { reason: DrawReason::InsufficientMaterial };
        }

        if verdict == Verdict::Check { GameStatus::Check } else { GameStatus::Active }
    }

    fn refresh_status(&mut self) {
        let repeats = self.repetition_count(&self.position);
        self.status = self.status_for(&self.position, repeats);
    }

    /// Runs every check `propose_move` does without changing anything.
    pub fn validate_move(&self, identity: &PlayerId, mv: Move) -> Result<MoveOutcome, MoveError> {
        let turn = self.position.turn;
        if self.color_of(identity) != Some(turn) {
            return Err(MoveError::NotYourTurn { turn });
        }
        if !self.status.is_in_progress() {
            return Err(MoveError::GameNotActive(self.status));
        }

        let piece = match self.position.piece_at(mv.from) {
            Some(piece) if piece.color == turn => piece,
            _ => return Err(MoveError::NoPieceSelected(mv.from)),
        };
        if !is_legal_shape(&self.position, mv.from, mv.to) {
            return Err(MoveError::IllegalShape(mv));
        }
        if let Some(kind) = mv.promotion {
            let promotes = piece.kind == PieceType::Pawn && mv.to.row == turn.promotion_row();
            if !promotes || !kind.can_promote_to() {
                return Err(MoveError::InvalidPromotion(mv));
            }
        }

        let candidate = self.position.with_move(mv.from, mv.to, mv.promotion);
        if is_in_check(&candidate, turn) {
            return Err(MoveError::SelfCheck(mv));
        }

        let repeats = self.repetition_count(&candidate) + 1;
        let status = self.status_for(&candidate, repeats);
        debug!(%mv, player = %turn, %status, "move validated");
        Ok(MoveOutcome { mv, player: turn, fen: fen::encode(&candidate), position: candidate, status })
    }

    /// Validates, publishes and commits a move as one unit. On any error the
    /// publisher has either not been called or has refused the write, and
    /// position, turn and history are exactly as before.
    pub fn propose_move<P: MovePublisher + ?Sized>(
        &mut self,
        identity: &PlayerId,
        mv: Move,
        publisher: &mut P,
    ) -> Result<MoveOutcome, GameError> {
        let outcome = match self.validate_move(identity, mv) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(%mv, player = %identity, error = %e, "move rejected");
                return Err(e.into());
            }
        };
        publisher.publish(&outcome)?;
        self.commit(&outcome);
        Ok(outcome)
    }

    fn commit(&mut self, outcome: &MoveOutcome) {
        *self.repetitions.entry(outcome.position.position_key()).or_insert(0) += 1;
        self.history.push(MoveRecord {
            mv: outcome.mv.to_string(),
            player: outcome.player,
            fen_after: outcome.fen.clone(),
            is_check: matches!(outcome.status, GameStatus::Check | GameStatus::Checkmate { .. }),
            is_checkmate: matches!(outcome.status, GameStatus::Checkmate { .. }),
        });
        self.position = outcome.position.clone();
        self.status = outcome.status;
        info!(mv = %outcome.mv, player = %outcome.player, status = %outcome.status, "move committed");
    }

    /// Replaces the local state with a full snapshot from the room record.
    /// Snapshots are never merged: the latest one wins. Returns whether the
    /// position changed.
    pub fn apply_snapshot(&mut self, record: &RoomRecord) -> Result<bool, RoomError> {
        let position = record.position()?;

        for color in Color::BOTH {
            match (self.player(color), record.player(color)) {
                (None, Some(identity)) => self.bind(color, identity.clone())?,
                (Some(local), Some(remote)) if local != remote => {
                    warn!(%color, local = %local, remote = %remote, "snapshot disagrees on a bound seat; keeping local binding");
                }
                _ => {}
            }
        }

        if position == self.position {
            self.refresh_status();
            return Ok(false);
        }

        *self.repetitions.entry(position.position_key()).or_insert(0) += 1;
        self.position = position;
        self.refresh_status();

        if let Some(last_move) = &record.last_move {
            self.history.push(MoveRecord {
                mv: last_move.clone(),
                player: self.position.turn.opponent(),
                fen_after: record.fen.clone(),
                is_check: matches!(self.status, GameStatus::Check | GameStatus::Checkmate { .. }),
                is_checkmate: matches!(self.status, GameStatus::Checkmate { .. }),
            });
        }
        debug!(fen = %record.fen, status = %self.status, "snapshot applied");
        Ok(true)
    }

    /// Writes players, final position, status and move list as JSON.
    pub fn save_history(&self, filename: &str) -> Result<(), SaveLoadError> {
        let summary = GameSummary {
            white_player: self.player(Color::White),
            black_player: self.player(Color::Black),
            final_fen: self.fen(),
            status: self.status,
            moves: &self.history,
        };
        let json_data = serde_json::to_string_pretty(&summary)?;
        fs::write(Path::new(filename), json_data)
            .map_err(|e| SaveLoadError::Io(filename.to_string(), e))?;
        Ok(())
    }
}

impl fmt::Display for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.position)?;
        for color in Color::BOTH {
            match self.player(color) {
                Some(identity) => writeln!(f, "{}: {}", color, identity)?,
                None => writeln!(f, "{}: (open seat)", color)?,
            }
        }
        writeln!(f, "Status: {}", self.status)?;

        if self.history.is_empty() {
            return Ok(());
        }
        writeln!(f, "Move History:")?;
        let mut records = self.history.iter().peekable();
        let mut move_num = 1;
        while let Some(record) = records.next() {
            if record.player == Color::Black {
                // Black moved first (game resumed from a snapshot).
                writeln!(f, "{}. ... {}{}", move_num, record.mv, record.annotation())?;
            } else {
                write!(f, "{}. {}{}", move_num, record.mv, record.annotation())?;
                if let Some(reply) = records.next_if(|r| r.player == Color::Black) {
                    write!(f, " {}{}", reply.mv, reply.annotation())?;
                }
                writeln!(f)?;
            }
            move_num += 1;
        }
        Ok(())
    }
}
