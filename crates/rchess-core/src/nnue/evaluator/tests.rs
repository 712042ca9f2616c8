use super::*;
use crate::nnue::constants::TRANSFORMED_FEATURE_DIMENSIONS_SMALL;
use crate::nnue::test_util::{networks, random_model};
use rand::SeedableRng;
use rand::seq::IndexedRandom;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;

/// 新しいスタックで一から計算した評価値
fn fresh_eval(pos: &Position, size: NetKind, adjusted: bool) -> NnueEval {
    let mut evaluator = Evaluator::new(networks());
    evaluator.evaluate_nnue(pos, size, adjusted)
}

#[test]
fn test_unadjusted_is_sum_over_output_scale() {
    let pos = Position::startpos();
    let mut evaluator = Evaluator::new(networks());
    let raw = evaluator.nnue_output(&pos, NetKind::Small, 7);
    let eval = evaluator.evaluate_nnue(&pos, NetKind::Small, false);
    assert_eq!(eval.value.raw(), (raw.psqt + raw.positional) / 16);
    assert_eq!(eval.complexity, (raw.psqt - raw.positional).abs() / 16);
}

#[test]
fn test_adjusted_weights_and_strategies() {
    let pos = Position::from_fen("r1bqkb1r/pppp1ppp/2n2n2/4p3/4P3/2N2N2/PPPP1PPP/R1BQKB1R w KQkq - 4 4")
        .unwrap();
    let mut evaluator = Evaluator::new(networks());
    let bucket = bucket_of(&pos);
    let raw = evaluator.nnue_output(&pos, NetKind::Big, bucket);

    let neutral = evaluator.evaluate_nnue(&pos, NetKind::Big, true);
    assert_eq!(neutral.value.raw(), (1000 * raw.psqt + 1048 * raw.positional) / (1024 * 16));

    let config = EvalConfig { materialistic_strategy: 12, positional_strategy: -5, ..EvalConfig::default() };
    evaluator.set_strategies(Strategies::from_config(&config));
    assert_eq!(evaluator.strategies(), Strategies { materialistic: 120, positional: -50 });
    let tuned = evaluator.evaluate_nnue(&pos, NetKind::Big, true);
    assert_eq!(tuned.value.raw(), (1120 * raw.psqt + 998 * raw.positional) / (1024 * 16));
    assert_eq!(tuned.complexity, neutral.complexity);
}

#[test]
fn test_strategies_from_config_clamps() {
    let config = EvalConfig { materialistic_strategy: 99, positional_strategy: -99, ..EvalConfig::default() };
    assert_eq!(Strategies::from_config(&config), Strategies { materialistic: 120, positional: -120 });
}

#[test]
fn test_incremental_evaluation_matches_fresh() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(31);
    let mut pos = Position::startpos();
    let mut evaluator = Evaluator::new(networks());
    let mut played = Vec::new();

    for ply in 0..40 {
        let size = if ply % 3 == 0 { NetKind::Small } else { NetKind::Big };
        // 数手に1回だけ評価して遅延更新の経路も通す
        if ply % 2 == 0 {
            assert_eq!(evaluator.evaluate_nnue(&pos, size, true), fresh_eval(&pos, size, true), "ply {ply}");
        }
        let moves = pos.legal_moves();
        let Some(&m) = moves.choose(&mut rng) else { break };
        evaluator.do_move(&mut pos, m);
        played.push(m);
    }

    while let Some(m) = played.pop() {
        evaluator.undo_move(&mut pos, m);
        assert_eq!(
            evaluator.evaluate_nnue(&pos, NetKind::Big, false),
            fresh_eval(&pos, NetKind::Big, false)
        );
    }
}

#[test]
fn test_hint_common_parent_position_selects_network() {
    let mut evaluator = Evaluator::new(networks());

    let balanced = Position::startpos();
    evaluator.hint_common_parent_position(&balanced);
    let entry = evaluator.stack().current();
    assert!(entry.big.computed[Color::White] && entry.big.computed[Color::Black]);
    assert!(!entry.small.computed[Color::White]);

    // 白がクイーン1枚多い（2538 > 1500）
    let lopsided = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 b - - 0 1").unwrap();
    evaluator.reset();
    evaluator.hint_common_parent_position(&lopsided);
    let entry = evaluator.stack().current();
    assert!(entry.small.computed[Color::White] && entry.small.computed[Color::Black]);
    assert!(!entry.big.computed[Color::White]);
}

#[test]
fn test_set_networks_invalidates_accumulators() {
    let pos = Position::startpos();
    let mut evaluator = Evaluator::new(networks());
    let before = evaluator.evaluate_nnue(&pos, NetKind::Small, false);

    let mut other = networks();
    other.small = Arc::new(random_model::<TRANSFORMED_FEATURE_DIMENSIONS_SMALL>(77));
    evaluator.set_networks(other.clone());
    assert!(!evaluator.stack().current().small.computed[Color::White]);

    let after = evaluator.evaluate_nnue(&pos, NetKind::Small, false);
    let mut expected = Evaluator::new(other);
    assert_eq!(after, expected.evaluate_nnue(&pos, NetKind::Small, false));
    assert_ne!(after, before);
}

#[test]
fn test_optimism_per_color() {
    let mut evaluator = Evaluator::new(networks());
    assert_eq!(evaluator.optimism(Color::White), Value::ZERO);
    evaluator.set_optimism(Color::Black, Value::new(-35));
    assert_eq!(evaluator.optimism(Color::Black), Value::new(-35));
    assert_eq!(evaluator.optimism(Color::White), Value::ZERO);
}

#[test]
fn test_invalidate_current_forces_recompute() {
    let pos = Position::startpos();
    let mut evaluator = Evaluator::new(networks());
    let first = evaluator.evaluate_nnue(&pos, NetKind::Big, true);
    evaluator.invalidate_current();
    assert!(!evaluator.stack().current().big.computed[Color::Black]);
    assert_eq!(evaluator.evaluate_nnue(&pos, NetKind::Big, true), first);
}
