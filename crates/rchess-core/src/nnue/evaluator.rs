//! 探索スレッドごとの NNUE 評価器
//!
//! 共有モデル（[`Networks`]）への参照と、スレッド固有のアキュムレータスタック・楽観値を持つ。
//! 探索は1手ごとに [`push`](Evaluator::push) / [`pop`](Evaluator::pop) を呼び、
//! アキュムレータは評価時に必要な分だけ遅延計算される。

use super::accumulator::AccumulatorStack;
use super::constants::OUTPUT_SCALE;
use super::features::FeatureIndexTable;
use super::model::{NnueOutput, bucket_of};
use super::registry::Networks;
use super::stats::{NetKind, count_stat};
use crate::config::EvalConfig;
use crate::position::{DirtyPiece, Move, Position};
use crate::types::{ByColor, Color, Value};

/// 調整済み評価で PSQT 成分と位置成分の重みをずらす量（1024 分率）
const POSITIONAL_BIAS: i32 = 24;

/// 設定値 1 あたりの重み変化（1024 分率）
const STRATEGY_SCALE: i32 = 10;

/// 大差局面で Small ネットワークを先読みする閾値
const HINT_SMALL_THRESHOLD: i32 = 1500;

/// 評価戦略（駒割重視・位置重視）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Strategies {
    /// 駒割成分の重み調整（1024 分率）
    pub materialistic: i32,
    /// 位置成分の重み調整（1024 分率）
    pub positional: i32,
}

impl Strategies {
    /// 設定値（[-12, 12]）から作成
    pub fn from_config(config: &EvalConfig) -> Self {
        let config = config.clone().clamped();
        Self {
            materialistic: STRATEGY_SCALE * config.materialistic_strategy,
            positional: STRATEGY_SCALE * config.positional_strategy,
        }
    }
}

/// NNUE 評価の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NnueEval {
    /// 手番側から見た評価値
    pub value: Value,
    /// `|psqt - positional| / OutputScale`
    pub complexity: i32,
}

/// 探索スレッドごとの評価器
pub struct Evaluator {
    networks: Networks,
    stack: AccumulatorStack,
    optimism: ByColor<Value>,
    strategies: Strategies,
}

impl Evaluator {
    pub fn new(networks: Networks) -> Self {
        FeatureIndexTable::global();
        Self {
            networks,
            stack: AccumulatorStack::new(),
            optimism: ByColor::splat(Value::ZERO),
            strategies: Strategies::default(),
        }
    }

    pub fn with_strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn strategies(&self) -> Strategies {
        self.strategies
    }

    pub fn set_strategies(&mut self, strategies: Strategies) {
        self.strategies = strategies;
    }

    pub fn networks(&self) -> &Networks {
        &self.networks
    }

    /// モデルを差し替え、全アキュムレータを未計算にする
    pub fn set_networks(&mut self, networks: Networks) {
        self.networks = networks;
        self.stack.invalidate_all();
    }

    /// 新しいルート局面の前に呼ぶ
    pub fn reset(&mut self) {
        self.stack.reset();
    }

    #[inline]
    pub fn push(&mut self, dirty_piece: DirtyPiece) {
        self.stack.push(dirty_piece);
    }

    #[inline]
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// 局面を1手進め、差分をスタックに積む
    pub fn do_move(&mut self, pos: &mut Position, m: Move) {
        let dirty_piece = pos.do_move(m);
        self.push(dirty_piece);
    }

    pub fn undo_move(&mut self, pos: &mut Position, m: Move) {
        pos.undo_move(m);
        self.pop();
    }

    /// 手番側の楽観値
    #[inline]
    pub fn optimism(&self, c: Color) -> Value {
        self.optimism[c]
    }

    pub fn set_optimism(&mut self, c: Color, value: Value) {
        self.optimism[c] = value;
    }

    pub fn stack(&self) -> &AccumulatorStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut AccumulatorStack {
        &mut self.stack
    }

    // =========================================================================
    // 評価
    // =========================================================================

    /// 指定サイズ・指定バケットの生出力（OutputScale 倍）
    pub fn nnue_output(&mut self, pos: &Position, size: NetKind, bucket: usize) -> NnueOutput {
        match size {
            NetKind::Big => self.networks.big.propagate(pos, &mut self.stack, bucket),
            NetKind::Small => self.networks.small.propagate(pos, &mut self.stack, bucket),
        }
    }

    /// NNUE 評価値（手番側視点）
    ///
    /// `adjusted` のとき、位置成分をわずかに重く、さらに評価戦略の分だけ重みを変える。
    pub fn evaluate_nnue(&mut self, pos: &Position, size: NetKind, adjusted: bool) -> NnueEval {
        let bucket = bucket_of(pos);
        let NnueOutput { psqt, positional } = self.nnue_output(pos, size, bucket);
        count_stat!(count_evaluate, size);

        let complexity = (psqt - positional).abs() / OUTPUT_SCALE;
        let value = if adjusted {
            let materialistic = 1024 - POSITIONAL_BIAS + self.strategies.materialistic;
            let positional_weight = 1024 + POSITIONAL_BIAS + self.strategies.positional;
            (materialistic * psqt + positional_weight * positional) / (1024 * OUTPUT_SCALE)
        } else {
            (psqt + positional) / OUTPUT_SCALE
        };
        NnueEval { value: Value::new(value), complexity }
    }

    /// 次に評価されそうなネットワークのアキュムレータを計算しておく
    pub fn hint_common_parent_position(&mut self, pos: &Position) {
        if pos.simple_eval(pos.side_to_move()).raw().abs() > HINT_SMALL_THRESHOLD {
            self.networks.small.transformer().hint_common_access(pos, &mut self.stack);
        } else {
            self.networks.big.transformer().hint_common_access(pos, &mut self.stack);
        }
    }

    /// 現在のエントリの全アキュムレータを未計算にする
    pub fn invalidate_current(&mut self) {
        self.stack.current_mut().invalidate();
    }
}

#[cfg(test)]
mod tests;
