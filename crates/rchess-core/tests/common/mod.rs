//! 統合テスト用の共通ヘルパー
#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rchess_core::nnue::test_util::random_model;
use rchess_core::nnue::{BigModel, Networks, SmallModel};
use rchess_core::position::{Move, Position};

pub fn big_model() -> Arc<BigModel> {
    static MODEL: OnceLock<Arc<BigModel>> = OnceLock::new();
    MODEL.get_or_init(|| Arc::new(random_model(0x1B16))).clone()
}

pub fn small_model() -> Arc<SmallModel> {
    static MODEL: OnceLock<Arc<SmallModel>> = OnceLock::new();
    MODEL.get_or_init(|| Arc::new(random_model(0x15A11))).clone()
}

pub fn networks() -> Networks {
    Networks { big: big_model(), small: small_model() }
}

/// 合法手からランダムに1手選ぶ（終局なら None）
pub fn random_move(pos: &mut Position, rng: &mut Xoshiro256PlusPlus) -> Option<Move> {
    let moves = pos.legal_moves();
    if moves.is_empty() {
        None
    } else {
        Some(moves[rng.random_range(0..moves.len())])
    }
}

/// よく使う局面（いずれも王手がかかっていない）
pub const TEST_FENS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
    "r1bq1rk1/pp2bppp/2n1pn2/3p4/2PP4/2N1PN2/PP3PPP/R2QKB1R b KQ - 0 8",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
];
