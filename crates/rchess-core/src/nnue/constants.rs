//! NNUE 関連の定数定義

/// 評価関数ファイルのバージョン
pub const NNUE_VERSION: u32 = 0x7AF3_2F20;

/// ネットワーク全体のハッシュ初期値
pub const NETWORK_HASH_SEED: u32 = 0xEC42_E90D;

/// アフィン層のハッシュ初期値
pub const AFFINE_HASH_SEED: u32 = 0xCC03_DAE4;

/// ClippedReLU / SqrClippedReLU のハッシュ初期値
pub const CLIPPED_RELU_HASH_SEED: u32 = 0x538D_24C7;

/// 評価値のスケーリング係数
pub const OUTPUT_SCALE: i32 = 16;

/// 重みのスケーリングビット数
pub const WEIGHT_SCALE_BITS: u32 = 6;

/// キャッシュラインサイズ（バイト）
pub const CACHE_LINE_SIZE: usize = 64;

/// SIMD 幅（バイト）。アフィン層の入力次元はこの倍数にパディングする
pub const MAX_SIMD_WIDTH: usize = 32;

/// PSQT バケット数
pub const PSQT_BUCKETS: usize = 8;

/// LayerStack のバケット数
pub const LAYER_STACKS: usize = 8;

/// Big ネットワークの変換後次元（片視点）
pub const TRANSFORMED_FEATURE_DIMENSIONS_BIG: usize = 2560;

/// Small ネットワークの変換後次元（片視点）
pub const TRANSFORMED_FEATURE_DIMENSIONS_SMALL: usize = 128;

/// 隠れ層1の出力次元（bypass 1 を除く）
pub const L2: usize = 15;

/// 隠れ層2の出力次元
pub const L3: usize = 32;

/// ClippedReLU の出力上限
pub const ACTIVATION_MAX: i32 = 127;

/// bypass 出力の係数 `600 * OUTPUT_SCALE / (127 * 2^WEIGHT_SCALE_BITS)` の分子
pub const BYPASS_NUMERATOR: i32 = 600 * OUTPUT_SCALE;

/// bypass 出力の係数の分母
pub const BYPASS_DENOMINATOR: i32 = ACTIVATION_MAX * (1 << WEIGHT_SCALE_BITS);

/// ネットワーク説明文字列の最大長
pub const MAX_DESCRIPTION_LEN: usize = 1 << 16;

/// LEB128 圧縮ブロックのマジック文字列
pub const LEB128_MAGIC: &[u8; 17] = b"COMPRESSED_LEB128";

/// 既定の Big ネットワークファイル名
pub const EVAL_FILE_DEFAULT_NAME_BIG: &str = "nn-0000000000a0.nnue";

/// 既定の Small ネットワークファイル名
pub const EVAL_FILE_DEFAULT_NAME_SMALL: &str = "nn-ecb35f70ff2a.nnue";

/// `n` を `base` の倍数に切り上げ
#[inline]
pub const fn ceil_to_multiple(n: usize, base: usize) -> usize {
    n.div_ceil(base) * base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_to_multiple() {
        assert_eq!(ceil_to_multiple(30, MAX_SIMD_WIDTH), 32);
        assert_eq!(ceil_to_multiple(32, MAX_SIMD_WIDTH), 32);
        assert_eq!(ceil_to_multiple(2560, MAX_SIMD_WIDTH), 2560);
        assert_eq!(ceil_to_multiple(0, MAX_SIMD_WIDTH), 0);
    }

    #[test]
    fn test_bypass_scale() {
        // 600 * 16 / (127 * 64)
        assert_eq!(BYPASS_NUMERATOR, 9600);
        assert_eq!(BYPASS_DENOMINATOR, 8128);
    }
}
