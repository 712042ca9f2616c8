//! LayerStack の1バケット分のネットワーク
//!
//! ```text
//! 変換後特徴量 (H, u8)
//!   fc_0: H → 16
//!   SqrClippedReLU(fc_0[0..15]) ++ ClippedReLU(fc_0[0..15]) → 30 (32 にパディング)
//!   fc_1: 30 → 32 → ClippedReLU
//!   fc_2: 32 → 1
//!   出力 = fc_2 + fc_0[15] * 9600 / 8128 (bypass)
//! ```

use std::io::{Read, Write};

use super::aligned::Aligned;
use super::constants::{
    BYPASS_DENOMINATOR, BYPASS_NUMERATOR, L2, L3, MAX_SIMD_WIDTH, NETWORK_HASH_SEED,
    ceil_to_multiple,
};
use super::error::Result;
use super::layers::{AffineTransform, activation_hash_value, clipped_relu, sqr_clipped_relu};

/// fc_0 の出力次元（L2 + bypass 1）
const FC_0_OUTPUTS: usize = L2 + 1;
/// fc_1 の入力次元（二乗側 + 線形側）
const FC_1_INPUTS: usize = L2 * 2;
/// fc_1 の入力バッファ長
const FC_1_PADDED_INPUTS: usize = ceil_to_multiple(FC_1_INPUTS, MAX_SIMD_WIDTH);

/// 1バケット分のネットワーク
///
/// `H` は特徴量変換器の出力次元（両視点合計）。
pub struct Network<const H: usize> {
    fc_0: AffineTransform,
    fc_1: AffineTransform,
    fc_2: AffineTransform,
}

impl<const H: usize> Network<H> {
    /// ゼロ初期化したネットワークを作成
    pub fn new() -> Self {
        Self {
            fc_0: AffineTransform::new(H, FC_0_OUTPUTS),
            fc_1: AffineTransform::new(FC_1_INPUTS, L3),
            fc_2: AffineTransform::new(L3, 1),
        }
    }

    /// 構造ハッシュ
    pub const fn hash_value() -> u32 {
        let mut hash = NETWORK_HASH_SEED ^ (H as u32 * 2);
        hash = AffineTransform::hash_value(FC_0_OUTPUTS, hash);
        hash = activation_hash_value(hash);
        hash = AffineTransform::hash_value(L3, hash);
        hash = activation_hash_value(hash);
        hash = AffineTransform::hash_value(1, hash);
        hash
    }

    /// 各層（fc_0, fc_1, fc_2）
    pub fn layers(&self) -> [&AffineTransform; 3] {
        [&self.fc_0, &self.fc_1, &self.fc_2]
    }

    pub fn layers_mut(&mut self) -> [&mut AffineTransform; 3] {
        [&mut self.fc_0, &mut self.fc_1, &mut self.fc_2]
    }

    /// パラメータが全て一致するか
    pub fn parameters_eq(&self, other: &Self) -> bool {
        self.layers()
            .iter()
            .zip(other.layers())
            .all(|(a, b)| a.biases() == b.biases() && a.weights() == b.weights())
    }

    /// パラメータを読み込み（活性化層はパラメータを持たない）
    pub fn read_parameters<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        self.fc_0.read_parameters(reader)?;
        self.fc_1.read_parameters(reader)?;
        self.fc_2.read_parameters(reader)?;
        Ok(())
    }

    pub fn write_parameters<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.fc_0.write_parameters(writer)?;
        self.fc_1.write_parameters(writer)?;
        self.fc_2.write_parameters(writer)?;
        Ok(())
    }

    /// 順伝播
    ///
    /// `transformed` は特徴量変換器の出力（`H` バイト）。戻り値は OutputScale 倍の評価値。
    pub fn propagate(&self, transformed: &[u8]) -> i32 {
        debug_assert!(transformed.len() >= H);

        let mut fc_0_out = Aligned([0i32; FC_0_OUTPUTS]);
        self.fc_0.propagate(transformed, &mut fc_0_out.0);

        // [0..15) 二乗側、[15..30) 線形側、[30..32) は 0 のまま
        let mut fc_1_in = Aligned([0u8; FC_1_PADDED_INPUTS]);
        sqr_clipped_relu(&fc_0_out.0[..L2], &mut fc_1_in.0[..L2]);
        clipped_relu(&fc_0_out.0[..L2], &mut fc_1_in.0[L2..FC_1_INPUTS]);

        let mut fc_1_out = Aligned([0i32; L3]);
        self.fc_1.propagate(&fc_1_in.0, &mut fc_1_out.0);

        let mut ac_1_out = Aligned([0u8; L3]);
        clipped_relu(&fc_1_out.0, &mut ac_1_out.0);

        let mut fc_2_out = [0i32; 1];
        self.fc_2.propagate(&ac_1_out.0, &mut fc_2_out);

        let forward = fc_0_out.0[L2] * BYPASS_NUMERATOR / BYPASS_DENOMINATOR;
        fc_2_out[0] + forward
    }
}

impl<const H: usize> Default for Network<H> {
    fn default() -> Self {
        Self::new()
    }
}
