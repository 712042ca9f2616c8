//! 最終評価値の合成
//!
//! 駒割のみの簡易評価で大差なら NNUE を省略し、そうでなければ NNUE の値に
//! 楽観値・複雑度・駒割を混ぜ、50手ルールのカウンタで 0 に向けて減衰させる。
//! 結果はテーブルベース用の予約帯に入らないよう丸める。

mod trace;

pub use trace::{format_cp_aligned_dot, format_cp_compact, trace};

use crate::nnue::stats::count_stat;
use crate::nnue::{Evaluator, NetKind, NnueEval};
use crate::position::Position;
use crate::types::{Color, PieceType, Value};

/// これを超える駒割差では NNUE を使わない
pub const LAZY_THRESHOLD: i32 = 2700;

/// これを超える駒割差では Small ネットワークを使う
pub const SMALL_NET_THRESHOLD: i32 = 1050;

/// 駒割のみの簡易評価（`c` 視点）
#[inline]
pub fn simple_eval(pos: &Position, c: Color) -> Value {
    pos.simple_eval(c)
}

/// 手番側から見た評価値
///
/// 王手がかかっていない局面で呼ぶこと。
pub fn evaluate(pos: &Position, evaluator: &mut Evaluator) -> Value {
    debug_assert!(!pos.in_check());

    let stm = pos.side_to_move();
    let shuffling = pos.rule50_count();
    let simple = simple_eval(pos, stm).raw();

    let v = if simple.abs() > LAZY_THRESHOLD {
        count_stat!(lazy);
        simple
    } else {
        let size = if simple.abs() > SMALL_NET_THRESHOLD { NetKind::Small } else { NetKind::Big };
        let NnueEval { value, complexity } = evaluator.evaluate_nnue(pos, size, true);
        let mut nnue = value.raw();
        let mut optimism = evaluator.optimism(stm).raw();

        // 複雑度と駒割との食い違いが大きいほど楽観値を強め、NNUE 値を弱める
        let disagreement = complexity + (simple - nnue).abs();
        optimism += optimism * disagreement / 512;
        nnue -= nnue * disagreement / 32768;

        let npm = pos.non_pawn_material_total() / 64;
        (nnue * (915 + npm + 9 * pos.count_both(PieceType::Pawn)) + optimism * (154 + npm)) / 1024
    };

    // 50手カウンタは FEN 由来で任意の値を取りうるので i64 で計算する
    let damped = i64::from(v) * (200 - i64::from(shuffling)) / 214;
    let bound = i64::from(Value::TB_WIN_IN_MAX_PLY.raw() - 1);
    Value::new(damped.clamp(-bound, bound) as i32)
}

#[cfg(test)]
mod tests;
