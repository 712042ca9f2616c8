//! FEN の読み書き

use super::{Position, PositionError, castling::*};
use crate::types::{Color, Piece, PieceType, Square};

/// 平手初期局面の FEN
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Position {
    /// FEN から局面を作成
    ///
    /// 手数フィールド（50手カウンタ・手数）は省略可能。各色ちょうど1枚の玉が必要。
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let err = |reason: &'static str| PositionError::InvalidFen { fen: fen.to_string(), reason };

        let mut pos = Position::empty();
        let parts: Vec<_> = fen.split_whitespace().collect();
        let placement = parts.first().ok_or_else(|| err("empty"))?;

        let mut rank: i32 = 7;
        let mut file: i32 = 0;
        for chr in placement.chars() {
            match chr {
                '/' => {
                    if file != 8 {
                        return Err(err("rank length"));
                    }
                    rank -= 1;
                    file = 0;
                    if rank < 0 {
                        return Err(err("too many ranks"));
                    }
                }
                '1'..='8' => {
                    file += chr as i32 - '0' as i32;
                    if file > 8 {
                        return Err(err("rank length"));
                    }
                }
                _ => {
                    let pc = Piece::from_char(chr).ok_or_else(|| err("piece character"))?;
                    if file > 7 {
                        return Err(err("rank length"));
                    }
                    pos.put_piece(pc, Square::from_file_rank(file as u8, rank as u8));
                    file += 1;
                }
            }
        }
        if rank != 0 || file != 8 {
            return Err(err("board shape"));
        }
        if pos.count_all() > 32 {
            return Err(err("too many pieces"));
        }
        for c in Color::ALL {
            if pos.count(c, PieceType::King) != 1 {
                return Err(err("king count"));
            }
        }

        pos.side_to_move = match parts.get(1).copied() {
            Some("w") | None => Color::White,
            Some("b") => Color::Black,
            Some(_) => return Err(err("side to move")),
        };

        for chr in parts.get(2).copied().unwrap_or("-").chars() {
            pos.castling |= match chr {
                'K' => WHITE_OO,
                'Q' => WHITE_OOO,
                'k' => BLACK_OO,
                'q' => BLACK_OOO,
                '-' => 0,
                _ => return Err(err("castling")),
            };
        }

        pos.ep_square = match parts.get(3).copied() {
            None | Some("-") => None,
            Some(s) => Some(Square::parse(s).ok_or_else(|| err("en passant square"))?),
        };

        pos.rule50 = match parts.get(4) {
            Some(s) => s.parse().map_err(|_| err("halfmove clock"))?,
            None => 0,
        };
        let fullmove: i32 = match parts.get(5) {
            Some(s) => s.parse().map_err(|_| err("fullmove number"))?,
            None => 1,
        };
        pos.game_ply = 2 * (fullmove - 1).max(0) + i32::from(pos.side_to_move == Color::Black);

        if pos.is_attacked(pos.king_square(!pos.side_to_move), pos.side_to_move) {
            return Err(err("side not to move is in check"));
        }

        Ok(pos)
    }

    /// FEN 文字列に変換
    pub fn to_fen(&self) -> String {
        let mut s = String::with_capacity(90);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                let pc = self.piece_on(Square::from_file_rank(file, rank));
                if pc.is_none() {
                    empty += 1;
                } else {
                    if empty > 0 {
                        s.push(char::from(b'0' + empty));
                        empty = 0;
                    }
                    s.push(pc.to_char());
                }
            }
            if empty > 0 {
                s.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                s.push('/');
            }
        }

        s.push(' ');
        s.push(if self.side_to_move == Color::White { 'w' } else { 'b' });
        s.push(' ');
        if self.castling == 0 {
            s.push('-');
        } else {
            for (bit, c) in [(WHITE_OO, 'K'), (WHITE_OOO, 'Q'), (BLACK_OO, 'k'), (BLACK_OOO, 'q')] {
                if self.castling & bit != 0 {
                    s.push(c);
                }
            }
        }
        s.push(' ');
        match self.ep_square {
            Some(sq) => s.push_str(&sq.to_string()),
            None => s.push('-'),
        }
        let fullmove = 1 + self.game_ply / 2;
        s.push_str(&format!(" {} {}", self.rule50, fullmove));
        s
    }
}
