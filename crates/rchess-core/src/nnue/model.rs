//! ネットワークファイル1つ分のモデル
//!
//! ## ファイル形式
//!
//! ```text
//! u32 version (0x7AF32F20)
//! u32 hash    (特徴量変換器 ^ ネットワーク)
//! u32 説明文字列の長さ + 説明文字列
//! u32 特徴量変換器ハッシュ + 特徴量変換器パラメータ (LEB128)
//! 8 × (u32 ネットワークハッシュ + ネットワークパラメータ)
//! EOF
//! ```
//!
//! 整数は全てリトルエンディアン。

use std::io::{Read, Write};

#[cfg(feature = "diagnostics")]
use log::info;

use super::accumulator::{AccumulatorSlot, AccumulatorStack, StackEntry};
use super::aligned::Aligned;
use super::constants::{LAYER_STACKS, MAX_DESCRIPTION_LEN, NNUE_VERSION};
use super::error::{NnueError, Result};
use super::feature_transformer::FeatureTransformer;
use super::io::{at_eof, read_u32, write_u32};
use super::network::Network;
use crate::position::Position;

/// 1サイズ分の NNUE 出力（OutputScale 倍のまま）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NnueOutput {
    /// PSQT（駒割）成分
    pub psqt: i32,
    /// ネットワーク（位置）成分
    pub positional: i32,
}

/// 読み込み済みの NNUE モデル
///
/// 読み込み後は不変で、`Arc` で全スレッドから共有される。
pub struct Model<const H: usize> {
    description: String,
    transformer: FeatureTransformer<H>,
    networks: Box<[Network<H>]>,
}

impl<const H: usize> std::fmt::Debug for Model<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<const H: usize> Model<H>
where
    StackEntry: AccumulatorSlot<H>,
{
    /// ゼロ初期化したモデルを確保
    pub fn new_zeroed(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            transformer: FeatureTransformer::new_zeroed(),
            networks: (0..LAYER_STACKS).map(|_| Network::new()).collect(),
        }
    }

    /// ファイル全体の構造ハッシュ
    pub const fn hash_value() -> u32 {
        FeatureTransformer::<H>::hash_value() ^ Network::<H>::hash_value()
    }

    /// 説明文字列（学習設定など）
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn transformer(&self) -> &FeatureTransformer<H> {
        &self.transformer
    }

    pub fn transformer_mut(&mut self) -> &mut FeatureTransformer<H> {
        &mut self.transformer
    }

    /// バケット `bucket` のネットワーク
    pub fn network(&self, bucket: usize) -> &Network<H> {
        &self.networks[bucket]
    }

    pub fn network_mut(&mut self, bucket: usize) -> &mut Network<H> {
        &mut self.networks[bucket]
    }

    /// パラメータが全て一致するか（説明文字列は比較しない）
    pub fn parameters_eq(&self, other: &Self) -> bool {
        self.transformer.parameters_eq(&other.transformer)
            && self.networks.iter().zip(other.networks.iter()).all(|(a, b)| a.parameters_eq(b))
    }

    // =========================================================================
    // 読み書き
    // =========================================================================

    /// ストリームから読み込み
    ///
    /// 新しく確保した領域に読み込むため、失敗しても既存のモデルには影響しない。
    /// パラメータの後ろにデータが残っている場合もエラー。
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let version = read_u32(reader)?;
        if version != NNUE_VERSION {
            return Err(NnueError::VersionMismatch { expected: NNUE_VERSION, found: version });
        }

        let hash = read_u32(reader)?;
        let description_len = read_u32(reader)? as usize;
        if description_len > MAX_DESCRIPTION_LEN {
            return Err(NnueError::DescriptionTooLong(description_len));
        }
        let mut description = vec![0u8; description_len];
        reader.read_exact(&mut description)?;
        if hash != Self::hash_value() {
            return Err(NnueError::HashMismatch {
                section: "Network file",
                expected: Self::hash_value(),
                found: hash,
            });
        }

        let mut model = Self::new_zeroed(String::from_utf8_lossy(&description));

        let transformer_hash = read_u32(reader)?;
        if transformer_hash != FeatureTransformer::<H>::hash_value() {
            return Err(NnueError::HashMismatch {
                section: "Feature transformer",
                expected: FeatureTransformer::<H>::hash_value(),
                found: transformer_hash,
            });
        }
        model.transformer.read_parameters(reader)?;

        for network in model.networks.iter_mut() {
            let network_hash = read_u32(reader)?;
            if network_hash != Network::<H>::hash_value() {
                return Err(NnueError::HashMismatch {
                    section: "Network",
                    expected: Network::<H>::hash_value(),
                    found: network_hash,
                });
            }
            network.read_parameters(reader)?;
        }

        if !at_eof(reader)? {
            return Err(NnueError::TrailingBytes);
        }

        #[cfg(feature = "diagnostics")]
        info!("[NNUE Load] {}: description=\"{}\"", H, model.description);

        Ok(model)
    }

    /// ストリームへ書き込み（[`read`](Self::read) の逆変換）
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_u32(writer, NNUE_VERSION)?;
        write_u32(writer, Self::hash_value())?;
        write_u32(writer, self.description.len() as u32)?;
        writer.write_all(self.description.as_bytes())?;

        write_u32(writer, FeatureTransformer::<H>::hash_value())?;
        self.transformer.write_parameters(writer)?;

        for network in self.networks.iter() {
            write_u32(writer, Network::<H>::hash_value())?;
            network.write_parameters(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    // =========================================================================
    // 評価
    // =========================================================================

    /// 指定バケットで PSQT 成分とネットワーク成分を計算
    ///
    /// アキュムレータは必要に応じて差分更新される。
    pub fn propagate(&self, pos: &Position, stack: &mut AccumulatorStack, bucket: usize) -> NnueOutput {
        let mut transformed = Aligned([0u8; H]);
        let psqt = self.transformer.transform(pos, stack, &mut transformed.0, bucket);
        let positional = self.networks[bucket].propagate(&transformed.0);
        NnueOutput { psqt, positional }
    }

    /// 局面の駒数に応じたバケットで評価
    #[inline]
    pub fn evaluate(&self, pos: &Position, stack: &mut AccumulatorStack) -> NnueOutput {
        self.propagate(pos, stack, bucket_of(pos))
    }
}

/// 駒数から決まるレイヤースタックのバケット
#[inline]
pub fn bucket_of(pos: &Position) -> usize {
    ((pos.count_all() - 1) / 4) as usize
}
