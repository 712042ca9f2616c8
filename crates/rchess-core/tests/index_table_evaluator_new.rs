//! 特徴量インデックス表は評価器の生成時に構築され、最初の評価では構築しない

use std::sync::Arc;

use rchess_core::nnue::features::FeatureIndexTable;
use rchess_core::nnue::{BigModel, Evaluator, Networks, SmallModel};

#[test]
fn test_evaluator_new_builds_index_table() {
    let networks = Networks {
        big: Arc::new(BigModel::new_zeroed("zero big")),
        small: Arc::new(SmallModel::new_zeroed("zero small")),
    };
    assert!(!FeatureIndexTable::is_built());

    let _evaluator = Evaluator::new(networks);
    assert!(FeatureIndexTable::is_built());
}
