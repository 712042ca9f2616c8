//! # rchess-core
//!
//! 差分更新・量子化 NNUE によるチェスの局面評価ライブラリ。
//!
//! ## モジュール構成
//!
//! - `types`: 基本型（Color, Square, Piece, Value, etc.）
//! - `position`: 局面表現、do_move/undo_move、合法手生成
//! - `nnue`: NNUE評価関数（特徴量・アキュムレータ・ネットワーク・ファイル形式・レジストリ）
//! - `eval`: 最終評価値の合成とトレース出力
//! - `config`: 評価関数の設定
//!

pub mod types;

pub mod position;

pub mod nnue;

pub mod eval;

pub mod config;
