// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseMoveError;

// --- Enums and Basic Structs ---

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color { White, Black }

impl Color {
    pub const BOTH: [Color; 2] = [Color::White, Color::Black];

    pub fn opponent(self) -> Color {
        match self { Color::White => Color::Black, Color::Black => Color::White }
    }

    /// Helper for Zobrist and seat indexing.
    pub fn index(self) -> usize {
        match self { Color::White => 0, Color::Black => 1 }
    }

    /// Row delta of a single pawn step. White marches toward row 0 (rank 8).
    pub fn pawn_direction(self) -> i8 {
        match self { Color::White => -1, Color::Black => 1 }
    }

    pub fn pawn_home_row(self) -> u8 {
        match self { Color::White => 6, Color::Black => 1 }
    }

    pub fn back_row(self) -> u8 {
        match self { Color::White => 7, Color::Black => 0 }
    }

    /// The row on which this side's pawns promote.
    pub fn promotion_row(self) -> u8 {
        self.opponent().back_row()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PieceType { Pawn, Knight, Bishop, Rook, Queen, King }

impl PieceType {
    pub fn index(self) -> usize {
        match self {
            PieceType::Pawn => 0, PieceType::Knight => 1, PieceType::Bishop => 2,
            PieceType::Rook => 3, PieceType::Queen => 4, PieceType::King => 5,
        }
    }

    /// Rooks, bishops and queens: attacks travel along a ray and can be blocked.
    pub fn is_slider(self) -> bool {
        matches!(self, PieceType::Rook | PieceType::Bishop | PieceType::Queen)
    }

    pub fn can_promote_to(self) -> bool {
        !matches!(self, PieceType::Pawn | PieceType::King)
    }

    fn letter(self) -> char {
        match self {
            PieceType::Pawn => 'p', PieceType::Knight => 'n', PieceType::Bishop => 'b',
            PieceType::Rook => 'r', PieceType::Queen => 'q', PieceType::King => 'k',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn), 'n' => Some(PieceType::Knight), 'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook), 'q' => Some(PieceType::Queen), 'k' => Some(PieceType::King),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceType,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceType, color: Color) -> Self { Piece { kind, color } }

    /// Parses a FEN piece letter: uppercase is White, lowercase is Black.
    pub fn from_char(c: char) -> Option<Self> {
        if !c.is_ascii_alphabetic() { return None; }
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        PieceType::from_letter(c).map(|kind| Piece::new(kind, color))
    }

    pub fn to_char(&self) -> char {
        let symbol = self.kind.letter();
        match self.color {
            Color::White => symbol.to_ascii_uppercase(),
            Color::Black => symbol,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

// --- Squares ---

/// A board square. Row 0 is rank 8 (Black's back rank), column 0 is file a.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    pub fn new(row: u8, col: u8) -> Self {
        debug_assert!(row < 8 && col < 8, "square out of range: ({}, {})", row, col);
        Square { row, col }
    }

    /// Steps by a signed delta, `None` when that leaves the board.
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Square> {
        let row = self.row as i8 + d_row;
        let col = self.col as i8 + d_col;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square::new(row as u8, col as u8))
        } else {
            None
        }
    }

    /// Row-major index 0..63, a8 = 0.
    pub fn index(self) -> usize {
        self.row as usize * 8 + self.col as usize
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|row| (0..8u8).map(move |col| Square::new(row, col)))
    }

    /// Parses algebraic notation such as `e4`.
    pub fn from_algebraic(s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 { return None; }
        let file = match bytes[0] { b'a'..=b'h' => bytes[0] - b'a', _ => return None };
        let rank = match bytes[1] { b'1'..=b'8' => bytes[1] - b'1', _ => return None };
        Some(Square::new(7 - rank, file))
    }

    pub fn to_algebraic(self) -> String {
        let file_char = (b'a' + self.col) as char;
        let rank_char = (b'8' - self.row) as char;
        format!("{}{}", file_char, rank_char)
    }

    /// a1 is dark, h1 and a8 are light.
    pub fn is_light(self) -> bool {
        (self.row + self.col) % 2 == 0
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

// --- Move Representation ---

/// A move request. It only becomes history once validated and applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move { from, to, promotion: None }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}

/// Parses `e2e4` or `a7a8q`. Validates format only, never legality.
impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if !trimmed.is_ascii() || !(4..=5).contains(&trimmed.len()) {
            return Err(ParseMoveError::Format(trimmed.to_string()));
        }

        let from_str = &trimmed[0..2];
        let to_str = &trimmed[2..4];
        let from = Square::from_algebraic(from_str)
            .ok_or_else(|| ParseMoveError::Square(from_str.to_string()))?;
        let to = Square::from_algebraic(to_str)
            .ok_or_else(|| ParseMoveError::Square(to_str.to_string()))?;

        let promotion = match trimmed.chars().nth(4) {
            None => None,
            Some(c) => match PieceType::from_letter(c) {
                Some(kind) if kind.can_promote_to() => Some(kind),
                _ => return Err(ParseMoveError::Promotion(c)),
            },
        };

        Ok(Move { from, to, promotion })
    }
}
