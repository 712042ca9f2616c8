//! 局面表現
//!
//! 評価関数が参照する盤面の読み取りインターフェース（駒配置・玉の位置・手番・駒数・駒割）と、
//! 差分更新用の [`DirtyPiece`] を生成する `do_move` / `undo_move` を提供する。
//! 盤面は 64 升のメールボックスで保持する。

mod fen;
mod movegen;
mod state;

pub use fen::START_FEN;
pub use movegen::Move;
pub use state::{ChangedPiece, DirtyPiece};

use crate::types::{ByColor, Color, Piece, PieceType, Square, Value};
use state::StateInfo;

/// 局面操作のエラー
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// FEN の書式エラー
    #[error("Invalid FEN ({reason}): {fen}")]
    InvalidFen { fen: String, reason: &'static str },

    /// 指し手文字列の書式エラー、または非合法手
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

/// キャスリング権のビット
pub(crate) mod castling {
    pub const WHITE_OO: u8 = 1;
    pub const WHITE_OOO: u8 = 2;
    pub const BLACK_OO: u8 = 4;
    pub const BLACK_OOO: u8 = 8;
}

/// 局面
#[derive(Clone)]
pub struct Position {
    board: [Piece; Square::NUM],
    side_to_move: Color,
    castling: u8,
    ep_square: Option<Square>,
    rule50: i32,
    game_ply: i32,
    /// 駒コードごとの枚数
    piece_count: [u8; Piece::NUM],
    king_square: ByColor<Square>,
    history: Vec<StateInfo>,
}

impl Position {
    /// 空の盤面（玉も置かれていない）
    fn empty() -> Self {
        Self {
            board: [Piece::NONE; Square::NUM],
            side_to_move: Color::White,
            castling: 0,
            ep_square: None,
            rule50: 0,
            game_ply: 0,
            piece_count: [0; Piece::NUM],
            king_square: ByColor::new(Square::E1, Square::E8),
            history: Vec::with_capacity(256),
        }
    }

    /// 平手初期局面
    pub fn startpos() -> Self {
        match Self::from_fen(START_FEN) {
            Ok(pos) => pos,
            Err(_) => unreachable!("START_FEN is well-formed"),
        }
    }

    // =========================================================================
    // 読み取りインターフェース
    // =========================================================================

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn piece_on(&self, sq: Square) -> Piece {
        self.board[sq.index()]
    }

    #[inline]
    pub fn king_square(&self, c: Color) -> Square {
        self.king_square[c]
    }

    /// 50手ルールのカウンタ（半手数）
    #[inline]
    pub fn rule50_count(&self) -> i32 {
        self.rule50
    }

    #[inline]
    pub fn game_ply(&self) -> i32 {
        self.game_ply
    }

    #[inline]
    pub fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    /// 指定した色・駒種の枚数
    #[inline]
    pub fn count(&self, c: Color, pt: PieceType) -> i32 {
        self.piece_count[Piece::make(c, pt).index()] as i32
    }

    /// 両色合計の指定駒種の枚数
    #[inline]
    pub fn count_both(&self, pt: PieceType) -> i32 {
        self.count(Color::White, pt) + self.count(Color::Black, pt)
    }

    /// 盤上の全駒数（玉を含む）
    #[inline]
    pub fn count_all(&self) -> i32 {
        self.piece_count.iter().map(|&n| n as i32).sum()
    }

    /// 歩と玉を除く駒割
    pub fn non_pawn_material(&self, c: Color) -> i32 {
        [PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen]
            .into_iter()
            .map(|pt| self.count(c, pt) * pt.non_pawn_value())
            .sum()
    }

    /// 両色合計の非歩駒割
    #[inline]
    pub fn non_pawn_material_total(&self) -> i32 {
        self.non_pawn_material(Color::White) + self.non_pawn_material(Color::Black)
    }

    /// 盤上の駒を A1 から順に列挙
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| {
            let pc = self.board[sq.index()];
            (!pc.is_none()).then_some((sq, pc))
        })
    }

    /// 手番側の玉に王手がかかっているか
    #[inline]
    pub fn in_check(&self) -> bool {
        let us = self.side_to_move;
        self.is_attacked(self.king_square[us], !us)
    }

    /// 駒割のみの簡易評価（`c` 視点）
    ///
    /// `PawnValue * 歩の枚数差 + 非歩駒割の差`
    pub fn simple_eval(&self, c: Color) -> Value {
        Value::new(
            Value::PAWN.raw() * (self.count(c, PieceType::Pawn) - self.count(!c, PieceType::Pawn))
                + (self.non_pawn_material(c) - self.non_pawn_material(!c)),
        )
    }

    // =========================================================================
    // 駒の配置
    // =========================================================================

    /// 升に駒を置く（空き升であること）
    pub fn put_piece(&mut self, pc: Piece, sq: Square) {
        debug_assert!(self.board[sq.index()].is_none());
        self.board[sq.index()] = pc;
        self.piece_count[pc.index()] += 1;
        if pc.piece_type() == Some(PieceType::King) {
            self.king_square[pc.color()] = sq;
        }
    }

    /// 升の駒を取り除いて返す
    pub fn remove_piece(&mut self, sq: Square) -> Piece {
        let pc = self.board[sq.index()];
        debug_assert!(!pc.is_none());
        self.board[sq.index()] = Piece::NONE;
        self.piece_count[pc.index()] -= 1;
        pc
    }

    #[inline]
    fn move_piece(&mut self, from: Square, to: Square) {
        let pc = self.remove_piece(from);
        self.put_piece(pc, to);
    }

    // =========================================================================
    // 着手・巻き戻し
    // =========================================================================

    /// 指し手を適用し、差分更新用の駒移動情報を返す
    ///
    /// 指し手は合法手であること（`legal_moves` が返すもの）。
    pub fn do_move(&mut self, m: Move) -> DirtyPiece {
        let us = self.side_to_move;
        let from = m.from;
        let to = m.to;
        let pc = self.piece_on(from);
        let mut dp = DirtyPiece::new();

        self.history.push(StateInfo {
            captured: Piece::NONE,
            castling: self.castling,
            ep_square: self.ep_square,
            rule50: self.rule50,
        });
        self.rule50 += 1;
        self.game_ply += 1;

        let is_pawn = pc.piece_type() == Some(PieceType::Pawn);

        if self.is_castling(m) {
            let (rook_from, rook_to) = castling_rook_squares(to);
            let rook = self.piece_on(rook_from);
            dp.push(pc, Some(from), Some(to));
            dp.push(rook, Some(rook_from), Some(rook_to));
            self.move_piece(from, to);
            self.move_piece(rook_from, rook_to);
        } else {
            dp.push(pc, Some(from), Some(to));

            let cap_sq = if is_pawn && Some(to) == self.ep_square && self.piece_on(to).is_none() {
                let dr = if us == Color::White { -1 } else { 1 };
                to.offset(0, dr)
            } else {
                Some(to)
            };
            if let Some(cap_sq) = cap_sq {
                let captured = self.piece_on(cap_sq);
                if !captured.is_none() {
                    dp.push(captured, Some(cap_sq), None);
                    self.remove_piece(cap_sq);
                    if let Some(st) = self.history.last_mut() {
                        st.captured = captured;
                    }
                    self.rule50 = 0;
                }
            }

            self.move_piece(from, to);

            if let Some(promo) = m.promotion {
                let promoted = Piece::make(us, promo);
                self.remove_piece(to);
                self.put_piece(promoted, to);
                dp.set_to(0, None);
                dp.push(promoted, None, Some(to));
            }
        }

        if is_pawn {
            self.rule50 = 0;
        }

        self.castling &= castling_mask(from) & castling_mask(to);
        self.ep_square = if is_pawn && from.rank().abs_diff(to.rank()) == 2 {
            from.offset(0, if us == Color::White { 1 } else { -1 })
        } else {
            None
        };
        self.side_to_move = !us;

        dp
    }

    /// 直前の `do_move` を巻き戻す
    pub fn undo_move(&mut self, m: Move) {
        let Some(st) = self.history.pop() else {
            debug_assert!(false, "undo_move without matching do_move");
            return;
        };
        self.side_to_move = !self.side_to_move;
        let us = self.side_to_move;
        let from = m.from;
        let to = m.to;

        if m.promotion.is_some() {
            self.remove_piece(to);
            self.put_piece(Piece::make(us, PieceType::Pawn), to);
        }

        let king_castled = self.piece_on(to).piece_type() == Some(PieceType::King)
            && from.rank() == to.rank()
            && from.file().abs_diff(to.file()) == 2;
        if king_castled {
            let (rook_from, rook_to) = castling_rook_squares(to);
            self.move_piece(to, from);
            self.move_piece(rook_to, rook_from);
        } else {
            self.move_piece(to, from);
            if !st.captured.is_none() {
                let is_ep = self.piece_on(from).piece_type() == Some(PieceType::Pawn)
                    && Some(to) == st.ep_square;
                let cap_sq = if is_ep {
                    to.offset(0, if us == Color::White { -1 } else { 1 })
                } else {
                    Some(to)
                };
                if let Some(cap_sq) = cap_sq {
                    self.put_piece(st.captured, cap_sq);
                }
            }
        }

        self.castling = st.castling;
        self.ep_square = st.ep_square;
        self.rule50 = st.rule50;
        self.game_ply -= 1;
    }

    /// 玉の2升移動（キャスリング）かどうか
    #[inline]
    fn is_castling(&self, m: Move) -> bool {
        self.piece_on(m.from).piece_type() == Some(PieceType::King)
            && m.from.rank() == m.to.rank()
            && m.from.file().abs_diff(m.to.file()) == 2
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

/// キャスリング時のルークの移動元・移動先
#[inline]
fn castling_rook_squares(king_to: Square) -> (Square, Square) {
    let rank = king_to.rank();
    if king_to.file() == 6 {
        (Square::from_file_rank(7, rank), Square::from_file_rank(5, rank))
    } else {
        (Square::from_file_rank(0, rank), Square::from_file_rank(3, rank))
    }
}

/// 升に触れる指し手で失われるキャスリング権を除くマスク
#[inline]
fn castling_mask(sq: Square) -> u8 {
    use castling::*;
    match sq {
        Square::E1 => !(WHITE_OO | WHITE_OOO),
        Square::H1 => !WHITE_OO,
        Square::A1 => !WHITE_OOO,
        Square::E8 => !(BLACK_OO | BLACK_OOO),
        Square::H8 => !BLACK_OO,
        Square::A8 => !BLACK_OOO,
        _ => !0,
    }
}
