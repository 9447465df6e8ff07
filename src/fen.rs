// src/fen.rs
//! Forsyth-Edwards Notation codec. FEN text is the only representation of a
//! position that ever leaves the process.

use lazy_static::lazy_static;
use regex::Regex;

use crate::board::{Board, CastlingRights, Position};
use crate::error::FenError;
use crate::types::{Color, Piece, PieceType, Square};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

lazy_static! {
    static ref CASTLING_FIELD: Regex = Regex::new(r"^(-|K?Q?k?q?)$").unwrap();
    static ref EN_PASSANT_FIELD: Regex = Regex::new(r"^(-|[a-h][1-8])$").unwrap();
}

/// Serializes a position as `<placement> <turn> <castling> <enpassant> <halfmove> <fullmove>`.
pub fn encode(position: &Position) -> String {
    let mut placement = String::with_capacity(72);
    for row in 0..8u8 {
        let mut empty_run = 0;
        for col in 0..8u8 {
            match position.piece_at(Square::new(row, col)) {
                Some(piece) => {
                    if empty_run > 0 {
                        placement.push_str(&empty_run.to_string());
                        empty_run = 0;
                    }
                    placement.push(piece.to_char());
                }
                None => empty_run += 1,
            }
        }
        if empty_run > 0 {
            placement.push_str(&empty_run.to_string());
        }
        if row < 7 {
            placement.push('/');
        }
    }

    let turn = match position.turn { Color::White => 'w', Color::Black => 'b' };
    let en_passant = position.en_passant.map_or_else(|| "-".to_string(), |sq| sq.to_algebraic());

    format!(
        "{} {} {} {} {} {}",
        placement,
        turn,
        encode_castling(position.castling),
        en_passant,
        position.halfmove_clock,
        position.fullmove_number,
    )
}

fn encode_castling(rights: CastlingRights) -> String {
    if rights.is_empty() {
        return "-".to_string();
    }
    let mut field = String::with_capacity(4);
    if rights.white_kingside { field.push('K'); }
    if rights.white_queenside { field.push('Q'); }
    if rights.black_kingside { field.push('k'); }
    if rights.black_queenside { field.push('q'); }
    field
}

/// Parses FEN text. Rejects anything outside the grammar rather than guessing.
pub fn decode(fen: &str) -> Result<Position, FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(FenError::FieldCount(fields.len()));
    }

    let board = decode_placement(fields[0])?;

    let turn = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(FenError::ActiveColor(other.to_string())),
    };

    if !CASTLING_FIELD.is_match(fields[2]) {
        return Err(FenError::Castling(fields[2].to_string()));
    }
    let castling = CastlingRights {
        white_kingside: fields[2].contains('K'),
        white_queenside: fields[2].contains('Q'),
        black_kingside: fields[2].contains('k'),
        black_queenside: fields[2].contains('q'),
    };

    if !EN_PASSANT_FIELD.is_match(fields[3]) {
        return Err(FenError::EnPassant(fields[3].to_string()));
    }
    let en_passant = Square::from_algebraic(fields[3]);

    let halfmove_clock = parse_clock("halfmove clock", fields[4])?;
    let fullmove_number = parse_clock("fullmove number", fields[5])?;

    Ok(Position { board, turn, castling, en_passant, halfmove_clock, fullmove_number })
}

fn decode_placement(placement: &str) -> Result<Board, FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    let mut board = Board::empty();
    for (row, rank) in ranks.iter().enumerate() {
        let row = row as u8;
        let mut squares = 0usize;
        for c in rank.chars() {
            match c {
                '1'..='8' => squares += c as usize - '0' as usize,
                _ => {
                    let piece = Piece::from_char(c).ok_or(FenError::UnknownPiece(c))?;
                    if squares < 8 {
                        board.set(Square::new(row, squares as u8), Some(piece));
                    }
                    squares += 1;
                }
            }
        }
        if squares != 8 {
            return Err(FenError::RankWidth { rank: 8 - row, squares });
        }
    }

    for color in Color::BOTH {
        let count = board.pieces()
            .filter(|(_, p)| p.kind == PieceType::King && p.color == color)
            .count();
        if count != 1 {
            return Err(FenError::KingCount { color, count });
        }
    }
    Ok(board)
}

fn parse_clock(field: &'static str, value: &str) -> Result<u32, FenError> {
    let malformed = || FenError::Clock { field, value: value.to_string() };
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    value.parse().map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_encodes_exactly() {
        assert_eq!(encode(&Position::initial()), START_FEN);
    }

    #[test]
    fn decode_start_matches_initial() {
        assert_eq!(decode(START_FEN).unwrap(), Position::initial());
    }

    #[test]
    fn decodes_metadata_fields() {
        let pos = decode("4k3/8/8/3pP3/8/8/8/4K3 w Kq d6 7 42").unwrap();
        assert_eq!(pos.turn, Color::White);
        assert!(pos.castling.white_kingside && pos.castling.black_queenside);
        assert!(!pos.castling.white_queenside && !pos.castling.black_kingside);
        assert_eq!(pos.en_passant, Square::from_algebraic("d6"));
        assert_eq!(pos.halfmove_clock, 7);
        assert_eq!(pos.fullmove_number, 42);
        assert_eq!(encode(&pos), "4k3/8/8/3pP3/8/8/8/4K3 w Kq d6 7 42");
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(decode("8/8/8/8/8/8/8/8 w KQkq -"), Err(FenError::FieldCount(4)));
        assert_eq!(decode(""), Err(FenError::FieldCount(0)));
    }

    #[test]
    fn rejects_bad_rank_width() {
        let err = decode("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap_err();
        assert_eq!(err, FenError::RankWidth { rank: 7, squares: 7 });
        let err = decode("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap_err();
        assert_eq!(err, FenError::UnknownPiece('9'));
        // Split empty runs are unusual but still describe 8 squares.
        assert!(decode("rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_ok());
        let err = decode("rnbqkbnr/pppppppp/71p/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap_err();
        assert_eq!(err, FenError::RankWidth { rank: 6, squares: 9 });
    }

    #[test]
    fn rejects_unknown_letters_and_fields() {
        assert_eq!(
            decode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBXKBNR w KQkq - 0 1"),
            Err(FenError::UnknownPiece('X'))
        );
        assert_eq!(
            decode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            Err(FenError::ActiveColor("x".to_string()))
        );
        assert!(matches!(
            decode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w QK - 0 1"),
            Err(FenError::Castling(_))
        ));
        assert!(matches!(
            decode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1"),
            Err(FenError::EnPassant(_))
        ));
        assert!(matches!(
            decode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - -1 1"),
            Err(FenError::Clock { field: "halfmove clock", .. })
        ));
        assert!(matches!(
            decode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 x"),
            Err(FenError::Clock { field: "fullmove number", .. })
        ));
    }

    #[test]
    fn rejects_missing_or_extra_kings() {
        assert_eq!(
            decode("8/8/8/8/8/8/8/4K3 w - - 0 1"),
            Err(FenError::KingCount { color: Color::Black, count: 0 })
        );
        assert_eq!(
            decode("4k3/8/8/8/8/8/8/3KK3 w - - 0 1"),
            Err(FenError::KingCount { color: Color::White, count: 2 })
        );
    }
}
