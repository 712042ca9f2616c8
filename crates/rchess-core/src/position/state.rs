//! 局面の履歴情報と差分更新用の駒移動情報

use crate::types::{Piece, Square};

/// 1手分の巻き戻し情報
#[derive(Debug, Clone, Copy)]
pub(super) struct StateInfo {
    /// 取られた駒（なければ `Piece::NONE`）
    pub captured: Piece,
    /// 着手前のキャスリング権
    pub castling: u8,
    /// 着手前のアンパッサン升
    pub ep_square: Option<Square>,
    /// 着手前の50手ルールカウンタ
    pub rule50: i32,
}

/// 変化した駒1つ分
///
/// `from` が `None` なら盤上に現れた駒（成り）、`to` が `None` なら盤上から消えた駒（取られた駒・成る前の歩）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangedPiece {
    pub piece: Piece,
    pub from: Option<Square>,
    pub to: Option<Square>,
}

impl ChangedPiece {
    pub const EMPTY: ChangedPiece = ChangedPiece { piece: Piece::NONE, from: None, to: None };
}

/// 差分更新用の駒移動情報（固定長バッファでヒープ確保を回避）
///
/// 先頭要素は常に「動いた駒」。キャスリングでは玉が先頭、ルークが2番目になる。
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DirtyPiece {
    pieces: [ChangedPiece; Self::MAX_PIECES],
    len: u8,
}

impl DirtyPiece {
    /// 最大要素数（動いた駒 + 取られた駒 + 成った駒）
    pub const MAX_PIECES: usize = 3;

    #[inline]
    pub const fn new() -> Self {
        Self { pieces: [ChangedPiece::EMPTY; Self::MAX_PIECES], len: 0 }
    }

    /// 駒変化を追加
    #[inline]
    pub fn push(&mut self, piece: Piece, from: Option<Square>, to: Option<Square>) {
        let idx = self.len as usize;
        debug_assert!(idx < Self::MAX_PIECES, "DirtyPiece overflow");
        self.pieces[idx] = ChangedPiece { piece, from, to };
        self.len += 1;
    }

    /// 駒変化のスライスを取得
    #[inline]
    pub fn pieces(&self) -> &[ChangedPiece] {
        &self.pieces[..self.len as usize]
    }

    /// 先頭（動いた駒）の変化
    #[inline]
    pub fn moved(&self) -> Option<&ChangedPiece> {
        self.pieces().first()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 移動先の升を書き換える（成りで歩が消える場合に使用）
    #[inline]
    pub(super) fn set_to(&mut self, idx: usize, to: Option<Square>) {
        self.pieces[idx].to = to;
    }
}

impl Default for DirtyPiece {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DirtyPiece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.pieces()).finish()
    }
}
