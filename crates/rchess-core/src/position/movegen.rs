//! 指し手と合法手生成
//!
//! 評価関数のテスト・ツールで局面を進めるための簡易生成器。
//! 擬似合法手を生成し、着手後に自玉が取られないものだけを残す。

use std::fmt;

use super::{Position, PositionError, castling::*};
use crate::types::{Color, Piece, PieceType, Square};

const KNIGHT_DELTAS: [(i8, i8); 8] =
    [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];
const KING_DELTAS: [(i8, i8); 8] =
    [(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)];
const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const PROMOTIONS: [PieceType; 4] =
    [PieceType::Queen, PieceType::Rook, PieceType::Bishop, PieceType::Knight];

/// 指し手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
}

impl Move {
    #[inline]
    pub const fn new(from: Square, to: Square) -> Self {
        Self { from, to, promotion: None }
    }

    /// UCI 形式（"e2e4", "e7e8q"）から合法手を探す
    pub fn from_uci(pos: &Position, text: &str) -> Result<Move, PositionError> {
        let illegal = || PositionError::IllegalMove(text.to_string());
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(illegal());
        }
        let from = Square::parse(&text[0..2]).ok_or_else(illegal)?;
        let to = Square::parse(&text[2..4]).ok_or_else(illegal)?;
        let promotion = match text.get(4..5) {
            None => None,
            Some("q") => Some(PieceType::Queen),
            Some("r") => Some(PieceType::Rook),
            Some("b") => Some(PieceType::Bishop),
            Some("n") => Some(PieceType::Knight),
            Some(_) => return Err(illegal()),
        };
        let m = Move { from, to, promotion };
        let mut scratch = pos.clone();
        if scratch.legal_moves().contains(&m) { Ok(m) } else { Err(illegal()) }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(pt) = self.promotion {
            let c = Piece::make(Color::Black, pt).to_char();
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl Position {
    /// `sq` が `by` 側の駒に利かされているか
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        // 歩は利きの逆方向を見る
        let pawn_dr = if by == Color::White { -1 } else { 1 };
        for df in [-1, 1] {
            if let Some(s) = sq.offset(df, pawn_dr)
                && self.piece_on(s) == Piece::make(by, PieceType::Pawn)
            {
                return true;
            }
        }
        for &(df, dr) in &KNIGHT_DELTAS {
            if let Some(s) = sq.offset(df, dr)
                && self.piece_on(s) == Piece::make(by, PieceType::Knight)
            {
                return true;
            }
        }
        for &(df, dr) in &KING_DELTAS {
            if let Some(s) = sq.offset(df, dr)
                && self.piece_on(s) == Piece::make(by, PieceType::King)
            {
                return true;
            }
        }
        let queen = Piece::make(by, PieceType::Queen);
        let rook = Piece::make(by, PieceType::Rook);
        let bishop = Piece::make(by, PieceType::Bishop);
        self.ray_hits(sq, &ROOK_DIRS, |pc| pc == rook || pc == queen)
            || self.ray_hits(sq, &BISHOP_DIRS, |pc| pc == bishop || pc == queen)
    }

    /// 各方向へ最初に当たる駒が `pred` を満たすか
    fn ray_hits(&self, sq: Square, dirs: &[(i8, i8)], pred: impl Fn(Piece) -> bool) -> bool {
        for &(df, dr) in dirs {
            let mut cur = sq;
            while let Some(s) = cur.offset(df, dr) {
                let pc = self.piece_on(s);
                if !pc.is_none() {
                    if pred(pc) {
                        return true;
                    }
                    break;
                }
                cur = s;
            }
        }
        false
    }

    /// 合法手の一覧
    pub fn legal_moves(&mut self) -> Vec<Move> {
        let us = self.side_to_move();
        let mut moves = Vec::with_capacity(64);
        self.generate_pseudo_legal(&mut moves);
        moves.retain(|&m| {
            self.do_move(m);
            let legal = !self.is_attacked(self.king_square(us), !us);
            self.undo_move(m);
            legal
        });
        moves
    }

    fn generate_pseudo_legal(&self, moves: &mut Vec<Move>) {
        let us = self.side_to_move();
        for (from, pc) in self.pieces() {
            if pc.color() != us {
                continue;
            }
            match pc.piece_type() {
                Some(PieceType::Pawn) => self.generate_pawn_moves(from, moves),
                Some(PieceType::Knight) => self.generate_steps(from, &KNIGHT_DELTAS, moves),
                Some(PieceType::Bishop) => self.generate_slides(from, &BISHOP_DIRS, moves),
                Some(PieceType::Rook) => self.generate_slides(from, &ROOK_DIRS, moves),
                Some(PieceType::Queen) => {
                    self.generate_slides(from, &ROOK_DIRS, moves);
                    self.generate_slides(from, &BISHOP_DIRS, moves);
                }
                Some(PieceType::King) => {
                    self.generate_steps(from, &KING_DELTAS, moves);
                    self.generate_castling(from, moves);
                }
                None => {}
            }
        }
    }

    #[inline]
    fn is_target(&self, sq: Square) -> bool {
        let pc = self.piece_on(sq);
        pc.is_none() || pc.color() != self.side_to_move()
    }

    fn generate_steps(&self, from: Square, deltas: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in deltas {
            if let Some(to) = from.offset(df, dr)
                && self.is_target(to)
            {
                moves.push(Move::new(from, to));
            }
        }
    }

    fn generate_slides(&self, from: Square, dirs: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in dirs {
            let mut cur = from;
            while let Some(to) = cur.offset(df, dr) {
                let pc = self.piece_on(to);
                if pc.is_none() {
                    moves.push(Move::new(from, to));
                } else {
                    if pc.color() != self.side_to_move() {
                        moves.push(Move::new(from, to));
                    }
                    break;
                }
                cur = to;
            }
        }
    }

    fn generate_pawn_moves(&self, from: Square, moves: &mut Vec<Move>) {
        let us = self.side_to_move();
        let (dr, start_rank, last_rank) = if us == Color::White { (1, 1, 7) } else { (-1, 6, 0) };
        let push = |to: Square, moves: &mut Vec<Move>| {
            if to.rank() == last_rank {
                for pt in PROMOTIONS {
                    moves.push(Move { from, to, promotion: Some(pt) });
                }
            } else {
                moves.push(Move::new(from, to));
            }
        };

        if let Some(one) = from.offset(0, dr)
            && self.piece_on(one).is_none()
        {
            push(one, moves);
            if from.rank() == start_rank
                && let Some(two) = one.offset(0, dr)
                && self.piece_on(two).is_none()
            {
                moves.push(Move::new(from, two));
            }
        }
        for df in [-1, 1] {
            let Some(to) = from.offset(df, dr) else { continue };
            let target = self.piece_on(to);
            if (!target.is_none() && target.color() != us) || Some(to) == self.ep_square() {
                push(to, moves);
            }
        }
    }

    fn generate_castling(&self, from: Square, moves: &mut Vec<Move>) {
        let us = self.side_to_move();
        let (home, oo, ooo) = match us {
            Color::White => (Square::E1, WHITE_OO, WHITE_OOO),
            Color::Black => (Square::E8, BLACK_OO, BLACK_OOO),
        };
        if from != home || self.is_attacked(home, !us) {
            return;
        }
        let rank = home.rank();
        let rook = Piece::make(us, PieceType::Rook);
        let sq = |file: u8| Square::from_file_rank(file, rank);

        if self.castling & oo != 0
            && self.piece_on(sq(7)) == rook
            && [5, 6].iter().all(|&f| self.piece_on(sq(f)).is_none())
            && [5, 6].iter().all(|&f| !self.is_attacked(sq(f), !us))
        {
            moves.push(Move::new(home, sq(6)));
        }
        if self.castling & ooo != 0
            && self.piece_on(sq(0)) == rook
            && [1, 2, 3].iter().all(|&f| self.piece_on(sq(f)).is_none())
            && [2, 3].iter().all(|&f| !self.is_attacked(sq(f), !us))
        {
            moves.push(Move::new(home, sq(2)));
        }
    }
}
