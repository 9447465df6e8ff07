// src/rules.rs
//! Piece geometry. Stateless: nothing here looks at whose turn it is or
//! whether a king is left in check.

use crate::board::{Board, Position};
use crate::types::{Color, PieceType, Square};

#[inline]
fn deltas(from: Square, to: Square) -> (i8, i8) {
    (to.row as i8 - from.row as i8, to.col as i8 - from.col as i8)
}

/// True when every square strictly between `from` and `to` is empty.
/// Callers guarantee the two squares share a row, column or diagonal.
fn path_clear(board: &Board, from: Square, to: Square) -> bool {
    squares_between(from, to).into_iter().all(|sq| board.get(sq).is_none())
}

/// Squares strictly between two squares on a shared row, column or diagonal;
/// empty when they are not aligned or are adjacent.
pub fn squares_between(from: Square, to: Square) -> Vec<Square> {
    let (d_row, d_col) = deltas(from, to);
    let aligned = d_row == 0 || d_col == 0 || d_row.abs() == d_col.abs();
    if !aligned || (d_row == 0 && d_col == 0) {
        return Vec::new();
    }

    let (step_row, step_col) = (d_row.signum(), d_col.signum());
    let mut between = Vec::with_capacity(6);
    let mut current = from;
    while let Some(next) = current.offset(step_row, step_col) {
        if next == to { break; }
        between.push(next);
        current = next;
    }
    between
}

fn rook_shape(board: &Board, from: Square, to: Square) -> bool {
    let (d_row, d_col) = deltas(from, to);
    (d_row == 0) != (d_col == 0) && path_clear(board, from, to)
}

fn bishop_shape(board: &Board, from: Square, to: Square) -> bool {
    let (d_row, d_col) = deltas(from, to);
    d_row != 0 && d_row.abs() == d_col.abs() && path_clear(board, from, to)
}

fn knight_shape(from: Square, to: Square) -> bool {
    let (d_row, d_col) = deltas(from, to);
    matches!((d_row.abs(), d_col.abs()), (2, 1) | (1, 2))
}

fn king_shape(from: Square, to: Square) -> bool {
    let (d_row, d_col) = deltas(from, to);
    d_row.abs() <= 1 && d_col.abs() <= 1 && (d_row, d_col) != (0, 0)
}

fn pawn_capture_shape(color: Color, from: Square, to: Square) -> bool {
    let (d_row, d_col) = deltas(from, to);
    d_row == color.pawn_direction() && d_col.abs() == 1
}

fn pawn_shape(board: &Board, color: Color, from: Square, to: Square) -> bool {
    let (d_row, d_col) = deltas(from, to);
    let dir = color.pawn_direction();

    if d_col == 0 {
        if board.get(to).is_some() { return false; }
        if d_row == dir { return true; }
        // Double step from the home rank, intermediate square must be empty too.
        return d_row == 2 * dir
            && from.row == color.pawn_home_row()
            && from.offset(dir, 0).map_or(false, |mid| board.get(mid).is_none());
    }

    // Diagonal steps are captures only.
    pawn_capture_shape(color, from, to) && board.get(to).is_some()
}

/// Whether the piece on `from` may move to `to` by its own geometry:
/// path obstruction and "never capture your own piece" are enforced,
/// turn order and check are not.
pub fn is_legal_shape(position: &Position, from: Square, to: Square) -> bool {
    let board = &position.board;
    let piece = match board.get(from) {
        Some(piece) => piece,
        None => return false,
    };
    if from == to {
        return false;
    }
    if let Some(target) = board.get(to) {
        if target.color == piece.color { return false; }
    }

    match piece.kind {
        PieceType::Rook => rook_shape(board, from, to),
        PieceType::Bishop => bishop_shape(board, from, to),
        PieceType::Queen => rook_shape(board, from, to) || bishop_shape(board, from, to),
        PieceType::Knight => knight_shape(from, to),
        PieceType::Pawn => pawn_shape(board, piece.color, from, to),
        PieceType::King => king_shape(from, to),
    }
}

/// Whether the piece on `from` attacks `target`, regardless of what stands
/// there. Pawns attack diagonally even onto empty squares.
pub fn attacks(position: &Position, from: Square, target: Square) -> bool {
    let board = &position.board;
    let piece = match board.get(from) {
        Some(piece) => piece,
        None => return false,
    };
    if from == target {
        return false;
    }

    match piece.kind {
        PieceType::Rook => rook_shape(board, from, target),
        PieceType::Bishop => bishop_shape(board, from, target),
        PieceType::Queen => rook_shape(board, from, target) || bishop_shape(board, from, target),
        PieceType::Knight => knight_shape(from, target),
        PieceType::Pawn => pawn_capture_shape(piece.color, from, target),
        PieceType::King => king_shape(from, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Piece;

    fn sq(s: &str) -> Square { Square::from_algebraic(s).unwrap() }

    fn lone(kind: PieceType, at: &str) -> Position {
        Position::from_board(Board::empty().with(sq(at), Piece::new(kind, Color::White)), Color::White)
    }

    /// Every square reachable by sliding from `from` along `dirs` on an empty board.
    fn reachable(from: Square, dirs: &[(i8, i8)]) -> Vec<Square> {
        let mut out = Vec::new();
        for &(dr, dc) in dirs {
            let mut cur = from;
            while let Some(next) = cur.offset(dr, dc) {
                out.push(next);
                cur = next;
            }
        }
        out
    }

    const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

    #[test]
    fn sliders_reach_exactly_their_rays_on_empty_board() {
        let queen_dirs: Vec<(i8, i8)> = ORTHOGONAL.iter().chain(DIAGONAL.iter()).copied().collect();
        let cases: [(PieceType, &[(i8, i8)]); 3] = [
            (PieceType::Rook, &ORTHOGONAL),
            (PieceType::Bishop, &DIAGONAL),
            (PieceType::Queen, &queen_dirs),
        ];
        for (kind, dirs) in cases {
            for from in Square::all() {
                let pos = Position::from_board(
                    Board::empty().with(from, Piece::new(kind, Color::White)),
                    Color::White,
                );
                let expected = reachable(from, dirs);
                for to in Square::all() {
                    assert_eq!(
                        is_legal_shape(&pos, from, to),
                        expected.contains(&to),
                        "{:?} {} -> {}", kind, from, to
                    );
                }
            }
        }
    }

    #[test]
    fn rook_is_blocked_and_captures() {
        let board = Board::empty()
            .with(sq("a1"), Piece::new(PieceType::Rook, Color::White))
            .with(sq("a4"), Piece::new(PieceType::Pawn, Color::Black))
            .with(sq("d1"), Piece::new(PieceType::Knight, Color::White));
        let pos = Position::from_board(board, Color::White);
        assert!(is_legal_shape(&pos, sq("a1"), sq("a3")));
        assert!(is_legal_shape(&pos, sq("a1"), sq("a4")));
        assert!(!is_legal_shape(&pos, sq("a1"), sq("a5")));
        assert!(is_legal_shape(&pos, sq("a1"), sq("c1")));
        assert!(!is_legal_shape(&pos, sq("a1"), sq("d1")));
        assert!(!is_legal_shape(&pos, sq("a1"), sq("e1")));
    }

    #[test]
    fn knight_jumps_over_pieces() {
        let pos = Position::initial();
        assert!(is_legal_shape(&pos, sq("g1"), sq("f3")));
        assert!(is_legal_shape(&pos, sq("g1"), sq("h3")));
        assert!(!is_legal_shape(&pos, sq("g1"), sq("e2")));
        assert!(!is_legal_shape(&pos, sq("g1"), sq("g3")));
    }

    #[test]
    fn pawn_pushes_and_captures() {
        let pos = Position::initial();
        assert!(is_legal_shape(&pos, sq("e2"), sq("e3")));
        assert!(is_legal_shape(&pos, sq("e2"), sq("e4")));
        assert!(!is_legal_shape(&pos, sq("e2"), sq("e5")));
        assert!(!is_legal_shape(&pos, sq("e2"), sq("d3")));
        assert!(is_legal_shape(&pos, sq("d7"), sq("d5")));
        assert!(!is_legal_shape(&pos, sq("d7"), sq("d8")));

        let board = Board::empty()
            .with(sq("e4"), Piece::new(PieceType::Pawn, Color::White))
            .with(sq("d5"), Piece::new(PieceType::Pawn, Color::Black))
            .with(sq("e5"), Piece::new(PieceType::Knight, Color::Black))
            .with(sq("f3"), Piece::new(PieceType::Pawn, Color::White));
        let pos = Position::from_board(board, Color::White);
        assert!(is_legal_shape(&pos, sq("e4"), sq("d5")));
        assert!(!is_legal_shape(&pos, sq("e4"), sq("e5")));
        assert!(!is_legal_shape(&pos, sq("e4"), sq("f5")));
        // Off the home rank, no double step.
        assert!(!is_legal_shape(&pos, sq("f3"), sq("f5")));
        // Black pawns move toward rank 1.
        assert!(is_legal_shape(&pos, sq("d5"), sq("e4")));
        assert!(is_legal_shape(&pos, sq("d5"), sq("d4")));
        assert!(!is_legal_shape(&pos, sq("d5"), sq("d6")));
    }

    #[test]
    fn double_step_needs_clear_intermediate() {
        let board = Board::empty()
            .with(sq("e2"), Piece::new(PieceType::Pawn, Color::White))
            .with(sq("e3"), Piece::new(PieceType::Knight, Color::Black));
        let pos = Position::from_board(board, Color::White);
        assert!(!is_legal_shape(&pos, sq("e2"), sq("e4")));
    }

    #[test]
    fn king_steps_one_square() {
        let pos = lone(PieceType::King, "e4");
        let reachable: Vec<Square> = Square::all().filter(|&to| is_legal_shape(&pos, sq("e4"), to)).collect();
        assert_eq!(reachable.len(), 8);
        assert!(!is_legal_shape(&pos, sq("e4"), sq("e6")));
        assert!(!is_legal_shape(&pos, sq("e4"), sq("e4")));
    }

    #[test]
    fn empty_origin_has_no_moves() {
        let pos = Position::initial();
        assert!(!is_legal_shape(&pos, sq("e4"), sq("e5")));
    }

    #[test]
    fn pawn_attacks_empty_diagonals() {
        let pos = lone(PieceType::Pawn, "e4");
        assert!(attacks(&pos, sq("e4"), sq("d5")));
        assert!(attacks(&pos, sq("e4"), sq("f5")));
        assert!(!attacks(&pos, sq("e4"), sq("e5")));
        assert!(!is_legal_shape(&pos, sq("e4"), sq("d5")));
    }

    #[test]
    fn between_squares() {
        assert_eq!(squares_between(sq("a1"), sq("a4")), vec![sq("a2"), sq("a3")]);
        assert_eq!(squares_between(sq("c1"), sq("f4")), vec![sq("d2"), sq("e3")]);
        assert!(squares_between(sq("a1"), sq("b3")).is_empty());
        assert!(squares_between(sq("a1"), sq("a2")).is_empty());
    }
}
