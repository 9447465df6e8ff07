// src/check.rs
//! Check, checkmate and stalemate detection. Every verdict is computed on the
//! position *after* a candidate move, never the one before it.

use tracing::{debug, error};

use crate::board::Position;
use crate::rules::{attacks, is_legal_shape, squares_between};
use crate::types::{Color, Move, PieceType, Square};

const KING_STEPS: [(i8, i8); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    ( 0, -1),          ( 0, 1),
    ( 1, -1), ( 1, 0), ( 1, 1),
];

/// How the side to move stands, ignoring draw rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Normal,
    Check,
    Checkmate,
    Stalemate,
}

/// Whether any piece of `attacker` attacks `target`.
pub fn is_square_attacked(position: &Position, target: Square, attacker: Color) -> bool {
    position.board.pieces()
        .any(|(from, piece)| piece.color == attacker && attacks(position, from, target))
}

/// Squares of the opposing pieces currently giving check to `color`'s king.
pub fn checkers(position: &Position, color: Color) -> Vec<Square> {
    let king_sq = match position.find_king(color) {
        Some(sq) => sq,
        None => return Vec::new(),
    };
    position.board.pieces()
        .filter(|(from, piece)| piece.color != color && attacks(position, *from, king_sq))
        .map(|(from, _)| from)
        .collect()
}

/// True iff an opposing piece attacks `color`'s king.
pub fn is_in_check(position: &Position, color: Color) -> bool {
    match position.find_king(color) {
        Some(king_sq) => is_square_attacked(position, king_sq, color.opponent()),
        None => {
            error!(%color, "king missing from position; treating as not in check");
            false
        }
    }
}

/// Shape-legal and does not leave the mover's king attacked.
fn is_safe(position: &Position, color: Color, from: Square, to: Square) -> bool {
    is_legal_shape(position, from, to)
        && !is_in_check(&position.with_move(from, to, None), color)
}

fn own_pieces(position: &Position, color: Color) -> impl Iterator<Item = (Square, PieceType)> + '_ {
    position.board.pieces()
        .filter(move |(_, piece)| piece.color == color)
        .map(|(sq, piece)| (sq, piece.kind))
}

/// Every fully legal move for `color` (promotions default to a queen).
pub fn legal_moves(position: &Position, color: Color) -> Vec<Move> {
    let mut moves = Vec::with_capacity(48);
    for (from, _) in own_pieces(position, color) {
        for to in Square::all() {
            if is_safe(position, color, from, to) {
                moves.push(Move::new(from, to));
            }
        }
    }
    moves
}

/// Whether `color` has at least one move after which its king is not in check.
///
/// When in check only three kinds of move can help, so only those are tried:
/// capturing a checking piece, interposing on the ray of a checking slider,
/// and stepping the king to a neighbouring square. Knight and pawn checks
/// cannot be blocked. Out of check, any legal move counts.
pub fn has_legal_resolution(position: &Position, color: Color) -> bool {
    let king_sq = match position.find_king(color) {
        Some(sq) => sq,
        None => return false,
    };

    let attackers = checkers(position, color);
    if attackers.is_empty() {
        return own_pieces(position, color)
            .any(|(from, _)| Square::all().any(|to| is_safe(position, color, from, to)));
    }

    let king_escapes = KING_STEPS.iter()
        .filter_map(|&(dr, dc)| king_sq.offset(dr, dc))
        .any(|to| is_safe(position, color, king_sq, to));
    if king_escapes {
        return true;
    }

    let mut targets = attackers.clone();
    for &attacker in &attackers {
        if position.piece_at(attacker).map_or(false, |p| p.kind.is_slider()) {
            targets.extend(squares_between(attacker, king_sq));
        }
    }
    debug!(%color, attackers = attackers.len(), targets = targets.len(), "searching check resolutions");

    own_pieces(position, color)
        .filter(|&(_, kind)| kind != PieceType::King)
        .any(|(from, _)| targets.iter().any(|&to| is_safe(position, color, from, to)))
}

pub fn evaluate(position: &Position, color: Color) -> Verdict {
    let in_check = is_in_check(position, color);
    match (in_check, has_legal_resolution(position, color)) {
        (true, false) => Verdict::Checkmate,
        (false, false) => Verdict::Stalemate,
        (true, true) => Verdict::Check,
        (false, true) => Verdict::Normal,
    }
}
