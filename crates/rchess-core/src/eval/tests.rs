use super::*;
use crate::nnue::test_util::networks;
use crate::position::Move;
use crate::types::Square;

fn evaluator() -> Evaluator {
    Evaluator::new(networks())
}

/// NNUE 経路の評価値を式どおりに計算
fn expected_blend(pos: &Position, size: NetKind, optimism: i32) -> i32 {
    let stm = pos.side_to_move();
    let simple = pos.simple_eval(stm).raw();
    let NnueEval { value, complexity } = evaluator().evaluate_nnue(pos, size, true);
    let nnue = value.raw();
    let optimism = optimism + optimism * (complexity + (simple - nnue).abs()) / 512;
    let nnue = nnue - nnue * (complexity + (simple - nnue).abs()) / 32768;
    let npm = pos.non_pawn_material_total() / 64;
    let v = (nnue * (915 + npm + 9 * pos.count_both(PieceType::Pawn)) + optimism * (154 + npm)) / 1024;
    (v * (200 - pos.rule50_count()) / 214).clamp(-31506, 31506)
}

#[test]
fn test_simple_eval() {
    let pos = Position::from_fen("4k3/pp6/8/8/8/8/8/R2QK3 b - - 0 1").unwrap();
    assert_eq!(simple_eval(&pos, Color::White).raw(), 1276 + 2538 - 2 * 208);
    assert_eq!(simple_eval(&pos, Color::Black).raw(), -(1276 + 2538 - 2 * 208));
}

#[test]
fn test_lazy_path_above_threshold() {
    // 2 × 1276 + 208 = 2760
    let pos = Position::from_fen("4k3/8/8/8/8/8/P7/R3K2R w - - 0 1").unwrap();
    assert_eq!(simple_eval(&pos, Color::White).raw(), 2760);
    assert_eq!(evaluate(&pos, &mut evaluator()).raw(), 2760 * 200 / 214);

    let black = Position::from_fen("4k3/8/8/8/8/8/P7/R3K2R b - - 30 1").unwrap();
    assert_eq!(evaluate(&black, &mut evaluator()).raw(), -2760 * 170 / 214);
}

#[test]
fn test_lazy_path_skips_network() {
    let pos = Position::from_fen("4k3/8/8/8/8/8/P7/R3K2R w - - 0 1").unwrap();
    let mut evaluator = evaluator();
    evaluate(&pos, &mut evaluator);
    let entry = evaluator.stack().current();
    assert!(!entry.big.computed[Color::White] && !entry.small.computed[Color::White]);
}

#[test]
fn test_small_network_below_lazy_threshold() {
    // 2 × 1276 = 2552 (> 1050)
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K2R w - - 0 1").unwrap();
    let mut evaluator = evaluator();
    let v = evaluate(&pos, &mut evaluator);
    assert_eq!(v.raw(), expected_blend(&pos, NetKind::Small, 0));
    let entry = evaluator.stack().current();
    assert!(entry.small.computed[Color::White]);
    assert!(!entry.big.computed[Color::White]);
}

#[test]
fn test_big_network_for_balanced_material() {
    let pos = Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3").unwrap();
    let mut evaluator = evaluator();
    assert_eq!(evaluate(&pos, &mut evaluator).raw(), expected_blend(&pos, NetKind::Big, 0));
    assert!(evaluator.stack().current().big.computed[Color::Black]);
}

#[test]
fn test_optimism_and_shuffling() {
    let pos = Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 40 3").unwrap();
    let mut evaluator = evaluator();
    evaluator.set_optimism(Color::Black, Value::new(57));
    evaluator.set_optimism(Color::White, Value::new(-999));
    assert_eq!(evaluate(&pos, &mut evaluator).raw(), expected_blend(&pos, NetKind::Big, 57));
}

#[test]
fn test_evaluate_is_deterministic_across_paths() {
    let mut pos = Position::startpos();
    let mut evaluator = evaluator();
    let root = evaluate(&pos, &mut evaluator);

    let mut played = Vec::new();
    for text in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"] {
        let m = Move::from_uci(&pos, text).unwrap();
        evaluator.do_move(&mut pos, m);
        played.push(m);
        if !pos.in_check() {
            let v = evaluate(&pos, &mut evaluator);
            assert_eq!(v, evaluate(&pos, &mut self::evaluator()));
            assert!(!v.is_reserved());
        }
    }
    while let Some(m) = played.pop() {
        evaluator.undo_move(&mut pos, m);
    }
    assert_eq!(evaluate(&pos, &mut evaluator), root);
}

#[test]
fn test_trace_in_check() {
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K2r w - - 0 1").unwrap();
    assert!(pos.in_check());
    assert_eq!(trace(&pos, &mut evaluator()), "Final evaluation: none (in check)");
}

#[test]
fn test_trace_layout() {
    let pos = Position::startpos();
    let mut evaluator = evaluator();
    evaluator.set_optimism(Color::White, Value::new(100));
    let text = trace(&pos, &mut evaluator);
    assert_eq!(evaluator.optimism(Color::White), Value::ZERO);

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "");
    assert_eq!(lines[1], " NNUE derived piece values:");
    // 盤面 25 行、各行 65 文字
    for row in &lines[2..27] {
        assert_eq!(row.len(), 65);
    }
    assert_eq!(lines[2], "+-------".repeat(8) + "+");
    // 8段目の a 筋は黒の飛車、e 筋は玉（寄与なし）
    assert_eq!(&lines[3][..9], "|   r   |");
    assert_eq!(&lines[4][32..41], "|       |");
    assert_eq!(lines[28], " NNUE network contributions (White to move)");
    assert_eq!(lines[29], "+------------+------------+------------+------------+");
    assert_eq!(lines[30], "|   Bucket   |  Material  | Positional |   Total    |");

    let bucket_rows: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("|  ") && l.as_bytes().get(3).is_some_and(u8::is_ascii_digit))
        .collect();
    assert_eq!(bucket_rows.len(), 8);
    assert!(bucket_rows[7].ends_with(" <-- this bucket is used"));
    assert!(bucket_rows[..7].iter().all(|row| !row.contains("<--")));
    assert_eq!(bucket_rows[0].find(" |  "), Some(12));

    let nnue_line = lines.iter().find(|l| l.starts_with("NNUE evaluation")).unwrap();
    assert!(nnue_line.ends_with(" (white side)"));
    let final_line = lines.iter().find(|l| l.starts_with("Final evaluation")).unwrap();
    assert!(final_line.ends_with("(white side) [with scaled NNUE, ...]"));
    assert!(text.ends_with('\n'));
}

#[test]
fn test_trace_leaves_evaluator_consistent() {
    let mut pos = Position::startpos();
    let mut evaluator = evaluator();
    for text in ["d2d4", "d7d5"] {
        let m = Move::from_uci(&pos, text).unwrap();
        evaluator.do_move(&mut pos, m);
    }
    let before = evaluate(&pos, &mut evaluator);
    let index = evaluator.stack().current_index();
    let previous = evaluator.stack().current().previous;

    trace(&pos, &mut evaluator);

    assert_eq!(evaluator.stack().current_index(), index);
    assert_eq!(evaluator.stack().current().previous, previous);
    assert_eq!(evaluate(&pos, &mut evaluator), before);
}

#[test]
fn test_trace_piece_values_are_removal_differences() {
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
    let mut evaluator = evaluator();
    let text = trace(&pos, &mut evaluator);

    let base = evaluator.evaluate_nnue(&pos, NetKind::Big, false).value;
    let mut without = pos.clone();
    without.remove_piece(Square::from_file_rank(3, 0));
    let removed = self::evaluator().evaluate_nnue(&without, NetKind::Big, false).value;

    // d1 の升: 盤面の最下段 (y = 21)、x = 24
    let lines: Vec<&str> = text.lines().collect();
    let cell = &lines[2 + 21 + 2][24 + 2..24 + 7];
    assert_eq!(cell, format_cp_compact(base - removed));
}
