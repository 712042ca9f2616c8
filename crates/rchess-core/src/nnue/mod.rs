//! NNUE（Efficiently Updatable Neural Network）評価関数
//!
//! HalfKAv2_hm 特徴量 + LayerStack 構造のネットワークを Big / Small の2サイズで持つ。
//!
//! ```text
//! 特徴量変換器 (HalfKAv2_hm): 22528 → H (各視点)、PSQT 8 バケット
//! pairwise product: 2 × H → H (u8)
//! LayerStack (駒数ベースの8バケット):
//!   fc_0: H → 16, SqrClippedReLU + ClippedReLU → 30
//!   fc_1: 30 → 32, ClippedReLU
//!   fc_2: 32 → 1 (+ fc_0[15] の bypass)
//! ```
//!
//! - Big: H = 2560
//! - Small: H = 128（大差局面用）
//!
//! ## 構成
//!
//! - [`ModelRegistry`]: ネットワークファイルの読み込み・保存・検証
//! - [`Networks`]: 読み込み済みモデルの `Arc` の組（全スレッドで共有、不変）
//! - [`Evaluator`]: スレッドごとのアキュムレータスタックと評価

pub mod accumulator;
pub mod aligned;
pub mod constants;
mod error;
mod evaluator;
pub mod feature_transformer;
pub mod features;
mod io;
pub mod layers;
mod leb128;
mod model;
pub mod network;
mod registry;
pub mod stats;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use accumulator::{Accumulator, AccumulatorStack, StackEntry};
pub use constants::{
    EVAL_FILE_DEFAULT_NAME_BIG, EVAL_FILE_DEFAULT_NAME_SMALL, TRANSFORMED_FEATURE_DIMENSIONS_BIG,
    TRANSFORMED_FEATURE_DIMENSIONS_SMALL,
};
pub use error::{NnueError, Result};
pub use evaluator::{Evaluator, NnueEval, Strategies};
pub use feature_transformer::FeatureTransformer;
pub use features::{Feature, FeatureIndex, HalfKAv2Hm};
pub use model::{Model, NnueOutput, bucket_of};
pub use network::Network;
pub use registry::{BigModel, EmbeddedNets, ModelRegistry, Networks, SmallModel, default_file_name};
pub use stats::{NetKind, eval_stats, reset_eval_stats};
