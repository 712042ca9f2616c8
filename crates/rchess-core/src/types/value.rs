//! 評価値（Value）
//!
//! 値のスケールは NNUE の内部スケールで、歩1枚 ≈ 208（中盤駒割）。
//! `[TB_LOSS_IN_MAX_PLY, TB_WIN_IN_MAX_PLY]` の外側はテーブルベース・詰み用に予約されており、
//! 通常の評価値がこの帯に入ることはない。

use super::MAX_PLY;
use std::ops::{Add, Neg, Sub};

/// 評価値
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Value(i32);

impl Value {
    /// ゼロ
    pub const ZERO: Value = Value(0);
    /// 引き分け
    pub const DRAW: Value = Value(0);
    /// 詰み（勝ち側の最大スコア）
    pub const MATE: Value = Value(32000);
    /// 無限大
    pub const INFINITE: Value = Value(32001);
    /// 無効値
    pub const NONE: Value = Value(32002);

    /// 最大探索深度内での詰みスコア
    pub const MATE_IN_MAX_PLY: Value = Value(Self::MATE.0 - MAX_PLY as i32);
    /// テーブルベースで証明された勝ち
    pub const TB: Value = Value(Self::MATE_IN_MAX_PLY.0 - 1);
    /// 最大探索深度内でのテーブルベース勝ち（これ以上は予約帯）
    pub const TB_WIN_IN_MAX_PLY: Value = Value(Self::TB.0 - MAX_PLY as i32);
    /// 最大探索深度内でのテーブルベース負け（これ以下は予約帯）
    pub const TB_LOSS_IN_MAX_PLY: Value = Value(-Self::TB_WIN_IN_MAX_PLY.0);

    /// 駒割（中盤値）
    pub const PAWN: Value = Value(208);
    pub const KNIGHT: Value = Value(781);
    pub const BISHOP: Value = Value(825);
    pub const ROOK: Value = Value(1276);
    pub const QUEEN: Value = Value(2538);

    /// cp 表示の正規化定数（内部値 328 = 1ポーン）
    pub const NORMALIZE_TO_PAWN_VALUE: i32 = 328;

    /// 値から生成
    #[inline]
    pub const fn new(v: i32) -> Value {
        Value(v)
    }

    /// 生の値を取得
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// テーブルベース予約帯に入っているかどうか
    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.0 >= Self::TB_WIN_IN_MAX_PLY.0 || self.0 <= Self::TB_LOSS_IN_MAX_PLY.0
    }

    /// 内部値を centipawn に変換
    ///
    /// `100 * value / 328` で正規化する。
    #[inline]
    pub const fn to_cp(self) -> i32 {
        100 * self.0 / Self::NORMALIZE_TO_PAWN_VALUE
    }

    /// 白視点に変換（`stm` が黒なら符号反転）
    #[inline]
    pub fn white_relative(self, stm: super::Color) -> Value {
        if stm == super::Color::White { self } else { -self }
    }
}

impl Add for Value {
    type Output = Value;

    #[inline]
    fn add(self, rhs: Value) -> Value {
        Value(self.0 + rhs.0)
    }
}

impl Sub for Value {
    type Output = Value;

    #[inline]
    fn sub(self, rhs: Value) -> Value {
        Value(self.0 - rhs.0)
    }
}

impl Neg for Value {
    type Output = Value;

    #[inline]
    fn neg(self) -> Value {
        Value(-self.0)
    }
}
