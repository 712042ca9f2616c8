//! ネットワーク層の実装
//!
//! - [`AffineTransform`]: 全結合アフィン変換層（u8 入力 × i8 重み + i32 バイアス）
//! - [`clipped_relu`]: `clamp(x >> 6, 0, 127)`
//! - [`sqr_clipped_relu`]: `min(127, x² >> 19)`
//!
//! スカラー版が基準実装で、`avx2` が有効なビルドではアフィン変換のみ AVX2 版を使う。
//! 両者の結果は常に一致する（テストで確認）。

use std::io::{Read, Write};

use super::aligned::AlignedBox;
use super::constants::{
    ACTIVATION_MAX, AFFINE_HASH_SEED, CLIPPED_RELU_HASH_SEED, MAX_SIMD_WIDTH, WEIGHT_SCALE_BITS,
    ceil_to_multiple,
};
use super::error::Result;
use super::io::{read_le_slice, write_le_slice};

// =============================================================================
// AffineTransform
// =============================================================================

/// 全結合アフィン変換層
///
/// 重みは `[output][padded_input]` の行優先で、ファイル上の並びと同じ。
pub struct AffineTransform {
    input_dims: usize,
    padded_input_dims: usize,
    output_dims: usize,
    biases: AlignedBox<i32>,
    weights: AlignedBox<i8>,
}

impl AffineTransform {
    /// ゼロ初期化した層を作成
    pub fn new(input_dims: usize, output_dims: usize) -> Self {
        let padded_input_dims = ceil_to_multiple(input_dims, MAX_SIMD_WIDTH);
        Self {
            input_dims,
            padded_input_dims,
            output_dims,
            biases: AlignedBox::new_zeroed(output_dims),
            weights: AlignedBox::new_zeroed(output_dims * padded_input_dims),
        }
    }

    #[inline]
    pub fn input_dims(&self) -> usize {
        self.input_dims
    }

    #[inline]
    pub fn padded_input_dims(&self) -> usize {
        self.padded_input_dims
    }

    #[inline]
    pub fn output_dims(&self) -> usize {
        self.output_dims
    }

    /// 構造ハッシュ（前段のハッシュを畳み込む）
    pub const fn hash_value(output_dims: usize, prev_hash: u32) -> u32 {
        let mut hash = AFFINE_HASH_SEED.wrapping_add(output_dims as u32);
        hash ^= prev_hash >> 1;
        hash ^= prev_hash << 31;
        hash
    }

    pub fn biases(&self) -> &[i32] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [i32] {
        &mut self.biases
    }

    /// 重み（`[output][padded_input]`）
    pub fn weights(&self) -> &[i8] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [i8] {
        &mut self.weights
    }

    /// パラメータを読み込み（バイアス → 重み、非圧縮）
    pub fn read_parameters<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        read_le_slice(reader, &mut self.biases)?;
        read_le_slice(reader, &mut self.weights)?;
        Ok(())
    }

    /// パラメータを書き込み
    pub fn write_parameters<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_le_slice(writer, &self.biases)?;
        write_le_slice(writer, &self.weights)?;
        Ok(())
    }

    /// 順伝播
    ///
    /// `input` は `padded_input_dims` 以上の長さで、パディング部分は 0 であること。
    #[inline]
    pub fn propagate(&self, input: &[u8], output: &mut [i32]) {
        debug_assert!(input.len() >= self.padded_input_dims);
        debug_assert!(output.len() >= self.output_dims);

        #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
        {
            self.propagate_avx2(input, output);
        }

        #[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
        {
            self.propagate_scalar(input, output);
        }
    }

    /// スカラー版（基準実装）
    pub fn propagate_scalar(&self, input: &[u8], output: &mut [i32]) {
        let input = &input[..self.input_dims];
        for (i, out) in output[..self.output_dims].iter_mut().enumerate() {
            let row = &self.weights[i * self.padded_input_dims..][..self.input_dims];
            let dot: i32 = row.iter().zip(input).map(|(&w, &x)| i32::from(w) * i32::from(x)).sum();
            *out = self.biases[i] + dot;
        }
    }

    /// AVX2 版
    ///
    /// `maddubs` は u8 × i8 の2要素和を i16 に飽和させるが、入力は 127 以下なので飽和しない。
    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    pub fn propagate_avx2(&self, input: &[u8], output: &mut [i32]) {
        use std::arch::x86_64::*;

        let padded = self.padded_input_dims;
        let input = &input[..padded];

        // SAFETY:
        // - input は padded バイト（スライスで長さを保証）
        // - 各行は weights[i * padded..(i + 1) * padded] の範囲内
        // - padded は32の倍数なので、32バイト単位の unaligned load は範囲外を読まない
        unsafe {
            let ones = _mm256_set1_epi16(1);
            for (i, out) in output[..self.output_dims].iter_mut().enumerate() {
                let row = self.weights[i * padded..(i + 1) * padded].as_ptr();
                let mut acc = _mm256_setzero_si256();
                for k in (0..padded).step_by(32) {
                    let x = _mm256_loadu_si256(input.as_ptr().add(k) as *const __m256i);
                    let w = _mm256_loadu_si256(row.add(k) as *const __m256i);
                    let product = _mm256_maddubs_epi16(x, w);
                    acc = _mm256_add_epi32(acc, _mm256_madd_epi16(product, ones));
                }
                *out = self.biases[i] + hsum_i32_avx2(acc);
            }
        }
    }
}

/// AVX2 での水平加算（i32×8 → i32）
#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
#[inline]
unsafe fn hsum_i32_avx2(v: std::arch::x86_64::__m256i) -> i32 {
    use std::arch::x86_64::*;

    let hi = _mm256_extracti128_si256(v, 1);
    let lo = _mm256_castsi256_si128(v);
    let sum128 = _mm_add_epi32(lo, hi);

    let hi64 = _mm_unpackhi_epi64(sum128, sum128);
    let sum64 = _mm_add_epi32(sum128, hi64);

    let hi32 = _mm_shuffle_epi32(sum64, 1);
    let sum32 = _mm_add_epi32(sum64, hi32);

    _mm_cvtsi128_si32(sum32)
}

// =============================================================================
// 活性化関数
// =============================================================================

/// 活性化層の構造ハッシュ（ClippedReLU / SqrClippedReLU 共通）
#[inline]
pub const fn activation_hash_value(prev_hash: u32) -> u32 {
    CLIPPED_RELU_HASH_SEED.wrapping_add(prev_hash)
}

/// ClippedReLU: `clamp(x >> WEIGHT_SCALE_BITS, 0, 127)`
#[inline]
pub fn clipped_relu(input: &[i32], output: &mut [u8]) {
    for (out, &x) in output.iter_mut().zip(input) {
        *out = (x >> WEIGHT_SCALE_BITS).clamp(0, ACTIVATION_MAX) as u8;
    }
}

/// SqrClippedReLU: `min(127, x² >> (2 * WEIGHT_SCALE_BITS + 7))`
///
/// 二乗で符号が消えるため、負の入力も正の出力になる。
#[inline]
pub fn sqr_clipped_relu(input: &[i32], output: &mut [u8]) {
    for (out, &x) in output.iter_mut().zip(input) {
        let squared = i64::from(x) * i64::from(x);
        *out = (squared >> (2 * WEIGHT_SCALE_BITS + 7)).min(i64::from(ACTIVATION_MAX)) as u8;
    }
}
