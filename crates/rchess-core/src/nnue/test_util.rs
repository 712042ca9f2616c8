//! テスト用の乱数ネットワーク
//!
//! 単体テストと `test-util` feature を有効にした統合テスト・ベンチで共有する。

use std::sync::{Arc, OnceLock};

use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::accumulator::{AccumulatorSlot, StackEntry};
use super::constants::{TRANSFORMED_FEATURE_DIMENSIONS_BIG, TRANSFORMED_FEATURE_DIMENSIONS_SMALL};
use super::feature_transformer::FeatureTransformer;
use super::model::Model;
use super::network::Network;
use super::registry::Networks;

/// `[-range, range]` の一様乱数で埋める（1回の乱数から4値を取り出す）
fn fill_i16(rng: &mut Xoshiro256PlusPlus, out: &mut [i16], range: i16) {
    let span = (2 * range + 1) as u64;
    for chunk in out.chunks_mut(4) {
        let mut bits = rng.next_u64();
        for v in chunk {
            *v = ((bits & 0xFFFF) % span) as i16 - range;
            bits >>= 16;
        }
    }
}

/// 特徴量変換器（アキュムレータが i16 で溢れない範囲）
pub fn random_transformer<const H: usize>(seed: u64) -> FeatureTransformer<H>
where
    StackEntry: AccumulatorSlot<H>,
{
    let mut ft = FeatureTransformer::<H>::new_zeroed();
    fill_transformer(&mut ft, seed);
    ft
}

fn fill_transformer<const H: usize>(ft: &mut FeatureTransformer<H>, seed: u64)
where
    StackEntry: AccumulatorSlot<H>,
{
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    for b in ft.biases_mut() {
        *b = rng.random_range(0..=127);
    }
    fill_i16(&mut rng, ft.weights_mut(), 20);
    for w in ft.psqt_weights_mut() {
        *w = rng.random_range(-3000..=3000);
    }
}

pub fn random_network<const H: usize>(rng: &mut Xoshiro256PlusPlus) -> Network<H> {
    let mut net = Network::<H>::new();
    for layer in net.layers_mut() {
        for b in layer.biases_mut() {
            *b = rng.random_range(-2000..=2000);
        }
        let input_dims = layer.input_dims();
        let padded = layer.padded_input_dims();
        for (k, w) in layer.weights_mut().iter_mut().enumerate() {
            // パディング部分は 0 のまま
            if k % padded < input_dims {
                *w = rng.random_range(-64..=64);
            }
        }
    }
    net
}

pub fn random_model<const H: usize>(seed: u64) -> Model<H>
where
    StackEntry: AccumulatorSlot<H>,
{
    let mut model = Model::<H>::new_zeroed(format!("random net {}/{seed}", H));
    fill_transformer(model.transformer_mut(), seed);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    for bucket in 0..crate::nnue::constants::LAYER_STACKS {
        *model.network_mut(bucket) = random_network::<H>(&mut rng);
    }
    model
}

/// 共有の Big モデル（確保が重いので1回だけ作る）
pub fn big_model() -> Arc<Model<TRANSFORMED_FEATURE_DIMENSIONS_BIG>> {
    static MODEL: OnceLock<Arc<Model<TRANSFORMED_FEATURE_DIMENSIONS_BIG>>> = OnceLock::new();
    MODEL.get_or_init(|| Arc::new(random_model(0xB16))).clone()
}

pub fn small_model() -> Arc<Model<TRANSFORMED_FEATURE_DIMENSIONS_SMALL>> {
    static MODEL: OnceLock<Arc<Model<TRANSFORMED_FEATURE_DIMENSIONS_SMALL>>> = OnceLock::new();
    MODEL.get_or_init(|| Arc::new(random_model(0x5A11))).clone()
}

pub fn networks() -> Networks {
    Networks { big: big_model(), small: small_model() }
}
