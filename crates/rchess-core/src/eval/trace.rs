//! 評価値の内訳表示（白視点）

use std::fmt::Write;

use super::evaluate;
use crate::nnue::constants::LAYER_STACKS;
use crate::nnue::{Evaluator, NetKind, bucket_of};
use crate::position::Position;
use crate::types::{Color, Piece, PieceType, Square, Value};

const BOARD_ROWS: usize = 3 * 8 + 1;
const BOARD_COLS: usize = 8 * 8 + 1;

const TABLE_SEPARATOR: &str = "+------------+------------+------------+------------+\n";

/// 評価値を5文字の pawn 単位に変換（`+1.23`, `+12.3`, `+123 `）
pub fn format_cp_compact(v: Value) -> String {
    let mut buf = [b' '; 5];
    buf[0] = sign_char(v);

    let mut cp = v.to_cp().unsigned_abs();
    let digit = |d: u32| b'0' + (d % 10) as u8;
    if cp >= 10000 {
        buf[1] = digit(cp / 10000);
        cp %= 10000;
        buf[2] = digit(cp / 1000);
        cp %= 1000;
        buf[3] = digit(cp / 100);
        buf[4] = b' ';
    } else if cp >= 1000 {
        buf[1] = digit(cp / 1000);
        cp %= 1000;
        buf[2] = digit(cp / 100);
        cp %= 100;
        buf[3] = b'.';
        buf[4] = digit(cp / 10);
    } else {
        buf[1] = digit(cp / 100);
        cp %= 100;
        buf[2] = b'.';
        buf[3] = digit(cp / 10);
        cp %= 10;
        buf[4] = digit(cp);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// 評価値を符号 + 小数点以下2桁の pawn 単位に変換（`+  1.23`）
pub fn format_cp_aligned_dot(v: Value) -> String {
    let pawns = (0.01 * f64::from(v.to_cp())).abs();
    format!("{}{:6.2}", sign_char(v) as char, pawns)
}

fn sign_char(v: Value) -> u8 {
    match v.raw() {
        x if x < 0 => b'-',
        x if x > 0 => b'+',
        _ => b' ',
    }
}

/// 評価値の内訳
///
/// 駒ごとの寄与（その駒を取り除いたときの評価値の差）、バケットごとの
/// PSQT・ネットワーク成分、最終評価値を白視点で表示する。楽観値は 0 にリセットされる。
pub fn trace(pos: &Position, evaluator: &mut Evaluator) -> String {
    if pos.in_check() {
        return "Final evaluation: none (in check)".to_string();
    }

    evaluator.set_optimism(Color::White, Value::ZERO);
    evaluator.set_optimism(Color::Black, Value::ZERO);

    let mut out = String::new();
    out.push('\n');
    out.push_str(&nnue_trace(pos, evaluator));
    out.push('\n');

    let stm = pos.side_to_move();
    let v = evaluator.evaluate_nnue(pos, NetKind::Big, false).value.white_relative(stm);
    let _ = writeln!(out, "NNUE evaluation        {:+.2} (white side)", 0.01 * f64::from(v.to_cp()));

    let v = evaluate(pos, evaluator).white_relative(stm);
    let _ = writeln!(
        out,
        "Final evaluation       {:+.2} (white side) [with scaled NNUE, ...]",
        0.01 * f64::from(v.to_cp())
    );
    out
}

/// 駒ごとの寄与の盤面とバケットごとの表
fn nnue_trace(pos: &Position, evaluator: &mut Evaluator) -> String {
    let stm = pos.side_to_move();
    let mut scratch = pos.clone();
    let mut board = [[b' '; BOARD_COLS]; BOARD_ROWS];

    // 盤面を書き換えて評価するので、現在のエントリを直前の手から切り離す
    let previous = evaluator.stack_mut().detach_current();

    let base = evaluator.evaluate_nnue(&scratch, NetKind::Big, false).value.white_relative(stm);
    for file in 0..8 {
        for rank in 0..8 {
            let sq = Square::from_file_rank(file, rank);
            let pc = scratch.piece_on(sq);
            let mut value = None;

            if !pc.is_none() && pc.piece_type() != Some(PieceType::King) {
                scratch.remove_piece(sq);
                evaluator.invalidate_current();
                let eval = evaluator.evaluate_nnue(&scratch, NetKind::Big, false).value.white_relative(stm);
                value = Some(base - eval);

                scratch.put_piece(pc, sq);
                evaluator.invalidate_current();
            }
            write_square(&mut board, file, rank, pc, value);
        }
    }

    let mut out = String::from(" NNUE derived piece values:\n");
    for row in &board {
        out.push_str(&String::from_utf8_lossy(row));
        out.push('\n');
    }
    out.push('\n');

    let _ = writeln!(
        out,
        " NNUE network contributions {}",
        if stm == Color::White { "(White to move)" } else { "(Black to move)" }
    );
    out.push_str(TABLE_SEPARATOR);
    out.push_str("|   Bucket   |  Material  | Positional |   Total    |\n");
    out.push_str("|            |   (PSQT)   |  (Layers)  |            |\n");
    out.push_str(TABLE_SEPARATOR);

    let used_bucket = bucket_of(&scratch);
    for bucket in 0..LAYER_STACKS {
        let output = evaluator.nnue_output(&scratch, NetKind::Big, bucket);
        let psqt = Value::new(output.psqt / crate::nnue::constants::OUTPUT_SCALE);
        let positional = Value::new(output.positional / crate::nnue::constants::OUTPUT_SCALE);

        let _ = write!(
            out,
            "|  {bucket}         |  {}   |  {}   |  {}   |",
            format_cp_aligned_dot(psqt),
            format_cp_aligned_dot(positional),
            format_cp_aligned_dot(psqt + positional)
        );
        if bucket == used_bucket {
            out.push_str(" <-- this bucket is used");
        }
        out.push('\n');
    }
    out.push_str(TABLE_SEPARATOR);

    evaluator.stack_mut().reattach_current(previous);
    out
}

/// 1升分の枠・駒・寄与を書き込む
fn write_square(
    board: &mut [[u8; BOARD_COLS]; BOARD_ROWS],
    file: u8,
    rank: u8,
    pc: Piece,
    value: Option<Value>,
) {
    let x = usize::from(file) * 8;
    let y = (7 - usize::from(rank)) * 3;

    for i in 1..8 {
        board[y][x + i] = b'-';
        board[y + 3][x + i] = b'-';
    }
    for i in 1..3 {
        board[y + i][x] = b'|';
        board[y + i][x + 8] = b'|';
    }
    for (row, col) in [(y, x), (y, x + 8), (y + 3, x + 8), (y + 3, x)] {
        board[row][col] = b'+';
    }
    if !pc.is_none() {
        board[y + 1][x + 4] = pc.to_char() as u8;
    }
    if let Some(value) = value {
        board[y + 2][x + 2..x + 7].copy_from_slice(format_cp_compact(value).as_bytes());
    }
}
