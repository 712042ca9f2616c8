//! 評価関数の補助ツール
//!
//! - `eval_trace`: 局面の評価値の内訳を表示
//! - `export_net`: 読み込んだネットワークをファイルに書き出す
//! - `eval_check`: ランダム対局の局面を評価し、値域と経路の統計を取る

pub mod common;
