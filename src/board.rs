// src/board.rs
use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;

use crate::types::{Color, Piece, PieceType, Square};

lazy_static! {
    static ref ZOBRIST: ZobristTable = ZobristTable::new();
}

// --- Zobrist Hashing ---

/// Random keys used to fingerprint positions for repetition detection.
#[derive(Debug)]
struct ZobristTable {
    /// `[color * 6 + kind][square]`.
    pieces: [[u64; 64]; 12],
    /// One key per right held, in FEN order `KQkq`.
    castling: [u64; 4],
    /// Keyed by file; the rank of a target follows from the side to move.
    en_passant_files: [u64; 8],
    black_to_move: u64,
}

impl ZobristTable {
    fn new() -> Self {
        // Fixed seed so keys are stable across runs and processes.
        let mut rng = StdRng::seed_from_u64(0x5EED_C4E5_5B0A_2D00);
        let mut next = || rng.next_u64();
        ZobristTable {
            pieces: std::array::from_fn(|_| std::array::from_fn(|_| next())),
            castling: std::array::from_fn(|_| next()),
            en_passant_files: std::array::from_fn(|_| next()),
            black_to_move: next(),
        }
    }

    fn piece(&self, piece: Piece, sq: Square) -> u64 {
        self.pieces[piece.color.index() * 6 + piece.kind.index()][sq.index()]
    }

    fn castling(&self, rights: CastlingRights) -> u64 {
        let held = [rights.white_kingside, rights.white_queenside, rights.black_kingside, rights.black_queenside];
        held.iter()
            .zip(self.castling)
            .filter(|(held, _)| **held)
            .fold(0, |key, (_, k)| key ^ k)
    }

    fn en_passant(&self, target: Option<Square>) -> u64 {
        target.map_or(0, |sq| self.en_passant_files[sq.col as usize])
    }

    fn side_to_move(&self, color: Color) -> u64 {
        match color {
            Color::White => 0,
            Color::Black => self.black_to_move,
        }
    }
}

// --- Castling Rights ---

/// Castling availability as carried by FEN. Castling itself is never executed;
/// the rights are tracked so that they serialize truthfully.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub fn initial() -> Self {
        Self { white_kingside: true, white_queenside: true, black_kingside: true, black_queenside: true }
    }

    pub fn none() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { *self == Self::none() }

    pub fn king_moved(&mut self, color: Color) {
        match color {
            Color::White => { self.white_kingside = false; self.white_queenside = false; }
            Color::Black => { self.black_kingside = false; self.black_queenside = false; }
        }
    }

    /// Drops the right tied to a rook corner once anything leaves or lands on it.
    pub fn corner_touched(&mut self, sq: Square) {
        match (sq.row, sq.col) {
            (7, 0) => self.white_queenside = false,
            (7, 7) => self.white_kingside = false,
            (0, 0) => self.black_queenside = false,
            (0, 7) => self.black_kingside = false,
            _ => {}
        }
    }
}

// --- Board ---

/// Fixed 8x8 grid indexed `[row][col]`, row 0 being rank 8.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Self { Self::default() }

    pub fn initial() -> Self {
        let mut board = Board::empty();
        let back_rank = [
            PieceType::Rook, PieceType::Knight, PieceType::Bishop, PieceType::Queen,
            PieceType::King, PieceType::Bishop, PieceType::Knight, PieceType::Rook,
        ];
        for color in Color::BOTH {
            for (col, kind) in back_rank.iter().enumerate() {
                board.set(Square::new(color.back_row(), col as u8), Some(Piece::new(*kind, color)));
                board.set(Square::new(color.pawn_home_row(), col as u8), Some(Piece::new(PieceType::Pawn, color)));
            }
        }
        board
    }

    #[inline]
    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.row as usize][sq.col as usize]
    }

    #[inline]
    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.row as usize][sq.col as usize] = piece;
    }

    /// Builder form of `set`, convenient when laying out test positions.
    pub fn with(mut self, sq: Square, piece: Piece) -> Self {
        self.set(sq, Some(piece));
        self
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|p| (sq, p)))
    }
}

// --- Position ---

/// A board plus the metadata FEN carries. Treated as an immutable value:
/// every accepted move yields a fresh `Position`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub board: Board,
    pub turn: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Default for Position {
    fn default() -> Self { Position::initial() }
}

impl Position {
    pub fn initial() -> Self {
        Position {
            board: Board::initial(),
            turn: Color::White,
            castling: CastlingRights::initial(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// A position with no castling rights, no en passant target and fresh clocks.
    pub fn from_board(board: Board, turn: Color) -> Self {
        Position {
            board,
            turn,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board.get(sq)
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.board.pieces()
            .find(|(_, p)| p.kind == PieceType::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    /// Returns the position after moving whatever stands on `from` to `to`.
    /// Performs no legality checks; a piece on `to` is simply discarded.
    /// Pawns reaching the far rank become `promotion` (a queen when omitted).
    pub fn with_move(&self, from: Square, to: Square, promotion: Option<PieceType>) -> Position {
        let mut next = self.clone();
        let moving = self.piece_at(from);
        let captured = self.piece_at(to);
        let mover = moving.map_or(self.turn, |p| p.color);

        let placed = match moving {
            Some(p) if p.kind == PieceType::Pawn && to.row == p.color.promotion_row() => {
                Some(Piece::new(promotion.unwrap_or(PieceType::Queen), p.color))
            }
            other => other,
        };
        next.board.set(from, None);
        next.board.set(to, placed);

        next.en_passant = None;
        if matches!(moving, Some(p) if p.kind == PieceType::King) {
            next.castling.king_moved(mover);
        }
        next.castling.corner_touched(from);
        next.castling.corner_touched(to);

        let is_pawn_move = matches!(moving, Some(p) if p.kind == PieceType::Pawn);
        next.halfmove_clock = if is_pawn_move || captured.is_some() { 0 } else { self.halfmove_clock.saturating_add(1) };
        if mover == Color::Black {
            next.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        next.turn = mover.opponent();
        next
    }

    /// Zobrist key of placement, side to move, castling rights and en passant target.
    pub fn position_key(&self) -> u64 {
        let zob = &*ZOBRIST;
        let mut key = self.board.pieces().fold(0u64, |key, (sq, piece)| key ^ zob.piece(piece, sq));
        key ^= zob.castling(self.castling);
        key ^= zob.en_passant(self.en_passant);
        key ^= zob.side_to_move(self.turn);
        key
    }

    /// Draw by insufficient material: positions where no sequence of legal
    /// moves can end in checkmate.
    pub fn is_insufficient_material(&self) -> bool {
        let mut minors = 0u32;
        let mut knights = 0u32;
        let mut bishop_squares = Vec::new();

        for (sq, piece) in self.board.pieces() {
            match piece.kind {
                PieceType::Pawn | PieceType::Rook | PieceType::Queen => return false,
                PieceType::Knight => { knights += 1; minors += 1; }
                PieceType::Bishop => { bishop_squares.push(sq); minors += 1; }
                PieceType::King => {}
            }
        }

        // King vs King, or King vs King + one minor piece.
        if minors <= 1 { return true; }

        // Only bishops left, all on one square colour, whichever side owns them.
        knights == 0 && bishop_squares.windows(2).all(|pair| pair[0].is_light() == pair[1].is_light())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  +-----------------+")?;
        for row in 0..8u8 {
            write!(f, "{} | ", 8 - row)?;
            for col in 0..8u8 {
                match self.piece_at(Square::new(row, col)) {
                    Some(piece) => write!(f, "{} ", piece)?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "  +-----------------+")?;
        writeln!(f, "    a b c d e f g h")?;
        writeln!(f, "Turn: {}", self.turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square { Square::from_algebraic(s).unwrap() }

    #[test]
    fn initial_board_layout() {
        let pos = Position::initial();
        assert_eq!(pos.piece_at(sq("e1")), Some(Piece::new(PieceType::King, Color::White)));
        assert_eq!(pos.piece_at(sq("d8")), Some(Piece::new(PieceType::Queen, Color::Black)));
        assert_eq!(pos.piece_at(sq("a2")), Some(Piece::new(PieceType::Pawn, Color::White)));
        assert_eq!(pos.piece_at(sq("e4")), None);
        assert_eq!(pos.board.pieces().count(), 32);
        assert_eq!(pos.find_king(Color::Black), Some(sq("e8")));
    }

    #[test]
    fn with_move_leaves_original_untouched() {
        let pos = Position::initial();
        let next = pos.with_move(sq("e2"), sq("e4"), None);
        assert_eq!(pos.piece_at(sq("e2")).map(|p| p.kind), Some(PieceType::Pawn));
        assert_eq!(next.piece_at(sq("e2")), None);
        assert_eq!(next.piece_at(sq("e4")).map(|p| p.kind), Some(PieceType::Pawn));
        assert_eq!(next.turn, Color::Black);
        assert_eq!(next.fullmove_number, 1);
        assert_eq!(next.halfmove_clock, 0);

        let after_black = next.with_move(sq("g8"), sq("f6"), None);
        assert_eq!(after_black.turn, Color::White);
        assert_eq!(after_black.fullmove_number, 2);
        assert_eq!(after_black.halfmove_clock, 1);
    }

    #[test]
    fn capture_discards_target_and_resets_clock() {
        let board = Board::empty()
            .with(sq("e1"), Piece::new(PieceType::King, Color::White))
            .with(sq("e8"), Piece::new(PieceType::King, Color::Black))
            .with(sq("a1"), Piece::new(PieceType::Rook, Color::White))
            .with(sq("a7"), Piece::new(PieceType::Knight, Color::Black));
        let mut pos = Position::from_board(board, Color::White);
        pos.halfmove_clock = 12;
        let next = pos.with_move(sq("a1"), sq("a7"), None);
        assert_eq!(next.piece_at(sq("a7")), Some(Piece::new(PieceType::Rook, Color::White)));
        assert_eq!(next.board.pieces().count(), 3);
        assert_eq!(next.halfmove_clock, 0);
    }

    #[test]
    fn king_and_rook_moves_drop_castling_rights() {
        let pos = Position::initial()
            .with_move(sq("e2"), sq("e4"), None)
            .with_move(sq("h7"), sq("h5"), None)
            .with_move(sq("e1"), sq("e2"), None)
            .with_move(sq("h8"), sq("h6"), None);
        assert!(!pos.castling.white_kingside && !pos.castling.white_queenside);
        assert!(!pos.castling.black_kingside);
        assert!(pos.castling.black_queenside);
    }

    #[test]
    fn pawn_promotes_on_far_rank() {
        let board = Board::empty()
            .with(sq("e1"), Piece::new(PieceType::King, Color::White))
            .with(sq("e8"), Piece::new(PieceType::King, Color::Black))
            .with(sq("a7"), Piece::new(PieceType::Pawn, Color::White))
            .with(sq("h2"), Piece::new(PieceType::Pawn, Color::Black));
        let pos = Position::from_board(board, Color::White);
        let queened = pos.with_move(sq("a7"), sq("a8"), None);
        assert_eq!(queened.piece_at(sq("a8")), Some(Piece::new(PieceType::Queen, Color::White)));
        let knighted = queened.with_move(sq("h2"), sq("h1"), Some(PieceType::Knight));
        assert_eq!(knighted.piece_at(sq("h1")), Some(Piece::new(PieceType::Knight, Color::Black)));
    }

    #[test]
    fn position_key_tracks_side_to_move() {
        let pos = Position::initial();
        let mut flipped = pos.clone();
        flipped.turn = Color::Black;
        assert_ne!(pos.position_key(), flipped.position_key());
        assert_eq!(pos.position_key(), Position::initial().position_key());
    }

    #[test]
    fn insufficient_material_cases() {
        let kings = Board::empty()
            .with(sq("e1"), Piece::new(PieceType::King, Color::White))
            .with(sq("e8"), Piece::new(PieceType::King, Color::Black));
        assert!(Position::from_board(kings, Color::White).is_insufficient_material());

        let knight = kings.with(sq("b1"), Piece::new(PieceType::Knight, Color::White));
        assert!(Position::from_board(knight, Color::White).is_insufficient_material());

        // c1 and f8 are both dark squares.
        let same_color_bishops = kings
            .with(sq("c1"), Piece::new(PieceType::Bishop, Color::White))
            .with(sq("f8"), Piece::new(PieceType::Bishop, Color::Black));
        assert!(Position::from_board(same_color_bishops, Color::White).is_insufficient_material());

        let opposite_bishops = kings
            .with(sq("c1"), Piece::new(PieceType::Bishop, Color::White))
            .with(sq("c8"), Piece::new(PieceType::Bishop, Color::Black));
        assert!(!Position::from_board(opposite_bishops, Color::White).is_insufficient_material());

        let rook = kings.with(sq("a1"), Piece::new(PieceType::Rook, Color::White));
        assert!(!Position::from_board(rook, Color::White).is_insufficient_material());

        // Two dark-squared bishops for one side still cannot mate.
        let bishop_pair_one_colour = kings
            .with(sq("c1"), Piece::new(PieceType::Bishop, Color::White))
            .with(sq("e3"), Piece::new(PieceType::Bishop, Color::White));
        assert!(Position::from_board(bishop_pair_one_colour, Color::White).is_insufficient_material());

        let bishop_pair = kings
            .with(sq("c1"), Piece::new(PieceType::Bishop, Color::White))
            .with(sq("d1"), Piece::new(PieceType::Bishop, Color::White));
        assert!(!Position::from_board(bishop_pair, Color::White).is_insufficient_material());

        let two_knights = kings
            .with(sq("b1"), Piece::new(PieceType::Knight, Color::White))
            .with(sq("g1"), Piece::new(PieceType::Knight, Color::White));
        assert!(!Position::from_board(two_knights, Color::White).is_insufficient_material());
    }

    #[test]
    fn position_key_tracks_castling_and_en_passant() {
        let pos = Position::initial();
        let mut no_castling = pos.clone();
        no_castling.castling.king_moved(Color::White);
        assert_ne!(pos.position_key(), no_castling.position_key());

        let mut ep_e3 = pos.clone();
        ep_e3.en_passant = Some(sq("e3"));
        let mut ep_d3 = pos.clone();
        ep_d3.en_passant = Some(sq("d3"));
        assert_ne!(ep_e3.position_key(), pos.position_key());
        assert_ne!(ep_e3.position_key(), ep_d3.position_key());
    }

    #[test]
    fn clocks_saturate_instead_of_overflowing() {
        let mut pos = Position::from_board(
            Board::empty()
                .with(sq("e1"), Piece::new(PieceType::King, Color::White))
                .with(sq("a1"), Piece::new(PieceType::Rook, Color::White))
                .with(sq("e8"), Piece::new(PieceType::King, Color::Black)),
            Color::White,
        );
        pos.halfmove_clock = u32::MAX;
        pos.fullmove_number = u32::MAX;

        let after_white = pos.with_move(sq("a1"), sq("a2"), None);
        assert_eq!(after_white.halfmove_clock, u32::MAX);
        let after_black = after_white.with_move(sq("e8"), sq("d8"), None);
        assert_eq!(after_black.fullmove_number, u32::MAX);
    }
}
