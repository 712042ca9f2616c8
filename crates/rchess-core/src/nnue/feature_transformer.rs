//! 特徴量変換器（入力層）
//!
//! HalfKAv2_hm 特徴量から、片視点 `H` 次元の i16 アキュムレータと
//! 8 バケットの i32 PSQT アキュムレータを計算する。
//!
//! 出力は視点ごとに前半・後半を掛け合わせる pairwise product で `H / 2` 次元に畳み、
//! 手番側 → 相手側の順に並べた `H` バイトの u8 ベクトルになる。

use std::io::{Read, Write};

use super::accumulator::{
    Accumulator, AccumulatorSlot, AccumulatorStack, IndexList, StackEntry,
};
use super::aligned::AlignedBox;
use super::constants::{ACTIVATION_MAX, PSQT_BUCKETS, TRANSFORMED_FEATURE_DIMENSIONS_BIG};
use super::error::Result;
use super::features::{Feature, FeatureIndex, HalfKAv2Hm};
use super::leb128::{read_leb128_block, write_leb128_block};
use super::stats::{NetKind, count_stat};
use crate::position::{DirtyPiece, Position};
use crate::types::{Color, Square};

/// 特徴量インデックスの範囲外アクセス時のパニック
#[cold]
#[inline(never)]
fn feature_index_oob(index: FeatureIndex, max: usize) -> ! {
    panic!("Feature index out of range: {index} (max: {max})")
}

/// 特徴量変換器
///
/// `H` は片視点の変換後次元（Big: 2560, Small: 128）。
pub struct FeatureTransformer<const H: usize> {
    /// バイアス [H]
    biases: AlignedBox<i16>,
    /// 重み [DIMENSIONS][H]
    weights: AlignedBox<i16>,
    /// PSQT 重み [DIMENSIONS][PSQT_BUCKETS]
    psqt_weights: AlignedBox<i32>,
}

impl<const H: usize> FeatureTransformer<H>
where
    StackEntry: AccumulatorSlot<H>,
{
    /// 入力次元
    pub const INPUT_DIMENSIONS: usize = HalfKAv2Hm::DIMENSIONS;
    /// 出力次元（両視点合計）
    pub const OUTPUT_DIMENSIONS: usize = H;

    /// ゼロ初期化した変換器を確保
    pub fn new_zeroed() -> Self {
        Self {
            biases: AlignedBox::new_zeroed(H),
            weights: AlignedBox::new_zeroed(H * Self::INPUT_DIMENSIONS),
            psqt_weights: AlignedBox::new_zeroed(PSQT_BUCKETS * Self::INPUT_DIMENSIONS),
        }
    }

    /// 構造ハッシュ
    pub const fn hash_value() -> u32 {
        HalfKAv2Hm::HASH_VALUE ^ (H as u32 * 2)
    }

    pub fn biases_mut(&mut self) -> &mut [i16] {
        &mut self.biases
    }

    pub fn weights_mut(&mut self) -> &mut [i16] {
        &mut self.weights
    }

    pub fn psqt_weights_mut(&mut self) -> &mut [i32] {
        &mut self.psqt_weights
    }

    /// パラメータが全て一致するか
    pub fn parameters_eq(&self, other: &Self) -> bool {
        self.biases[..] == other.biases[..]
            && self.weights[..] == other.weights[..]
            && self.psqt_weights[..] == other.psqt_weights[..]
    }

    /// パラメータを読み込み（LEB128 ブロック × 3）
    pub fn read_parameters<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        read_leb128_block(reader, &mut self.biases)?;
        read_leb128_block(reader, &mut self.weights)?;
        read_leb128_block(reader, &mut self.psqt_weights)?;
        Ok(())
    }

    /// パラメータを書き込み
    pub fn write_parameters<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_leb128_block(writer, &self.biases)?;
        write_leb128_block(writer, &self.weights)?;
        write_leb128_block(writer, &self.psqt_weights)?;
        Ok(())
    }

    #[inline]
    fn net_kind() -> NetKind {
        if H == TRANSFORMED_FEATURE_DIMENSIONS_BIG { NetKind::Big } else { NetKind::Small }
    }

    // =========================================================================
    // アキュムレータの計算
    // =========================================================================

    /// 差分計算を使わずに1視点分を計算
    pub fn refresh_accumulator(&self, pos: &Position, perspective: Color, acc: &mut Accumulator<H>) {
        let mut active = IndexList::new();
        HalfKAv2Hm::append_active_indices(pos, perspective, &mut active);

        let accumulation = &mut acc.accumulation[perspective];
        accumulation.copy_from_slice(&self.biases);
        let psqt = &mut acc.psqt_accumulation[perspective];
        *psqt = [0; PSQT_BUCKETS];

        for index in active.iter() {
            self.add_weights(accumulation, index);
            self.add_psqt_weights(psqt, index);
        }
        acc.computed[perspective] = true;
        count_stat!(count_refresh, Self::net_kind());
    }

    /// 直前のアキュムレータに1手分の差分を適用
    ///
    /// `ksq` は `perspective` 側の玉の升で、`prev` から変わっていないこと。
    pub fn apply_incremental(
        &self,
        ksq: Square,
        dirty_piece: &DirtyPiece,
        perspective: Color,
        prev: &Accumulator<H>,
        cur: &mut Accumulator<H>,
    ) {
        debug_assert!(prev.computed[perspective], "incremental update from a stale accumulator");
        debug_assert!(!HalfKAv2Hm::requires_refresh(dirty_piece, perspective));

        let mut removed = IndexList::new();
        let mut added = IndexList::new();
        HalfKAv2Hm::append_changed_indices(ksq, dirty_piece, perspective, &mut removed, &mut added);

        let accumulation = &mut cur.accumulation[perspective];
        accumulation.copy_from_slice(&prev.accumulation[perspective]);
        let psqt = &mut cur.psqt_accumulation[perspective];
        *psqt = prev.psqt_accumulation[perspective];

        for index in removed.iter() {
            self.sub_weights(accumulation, index);
            self.sub_psqt_weights(psqt, index);
        }
        for index in added.iter() {
            self.add_weights(accumulation, index);
            self.add_psqt_weights(psqt, index);
        }
        cur.computed[perspective] = true;
    }

    /// 現在のエントリの1視点分を計算済みにする
    ///
    /// 直前のエントリから遡り、計算済みの祖先が見つかれば差分を順に適用する。
    /// 自玉の移動に当たるか、差分の累計コストが全計算のコストを超えたら全計算する。
    /// 経由したエントリも計算済みになる。
    pub fn update_accumulator(&self, pos: &Position, stack: &mut AccumulatorStack, perspective: Color) {
        let cur_idx = stack.current_index();
        if slot::<H>(stack.entry_at(cur_idx)).computed[perspective] {
            count_stat!(count_already_computed, Self::net_kind());
            return;
        }

        let mut gain = HalfKAv2Hm::refresh_cost(pos);
        let mut idx = cur_idx;
        loop {
            let entry = stack.entry_at(idx);
            if slot::<H>(entry).computed[perspective] {
                break;
            }
            let Some(prev) = entry.previous else { break };
            if HalfKAv2Hm::requires_refresh(&entry.dirty_piece, perspective) {
                break;
            }
            gain -= HalfKAv2Hm::update_cost(&entry.dirty_piece) + 1;
            if gain < 0 {
                break;
            }
            idx = prev;
        }

        if slot::<H>(stack.entry_at(idx)).computed[perspective]
            && self.forward_update(pos, stack, idx, perspective)
        {
            return;
        }

        let cur = slot_mut::<H>(stack.current_mut());
        self.refresh_accumulator(pos, perspective, cur);
    }

    /// 計算済みの `source_idx` から現在まで差分を順に適用
    fn forward_update(
        &self,
        pos: &Position,
        stack: &mut AccumulatorStack,
        source_idx: usize,
        perspective: Color,
    ) -> bool {
        let Some(path) = stack.collect_path(source_idx) else {
            return false;
        };
        let ksq = pos.king_square(perspective);

        for step in path.iter() {
            let Some(prev_idx) = stack.entry_at(step).previous else {
                return false;
            };
            let (prev, cur) = stack.pair_mut(prev_idx, step);
            let dirty_piece = cur.dirty_piece;
            self.apply_incremental(ksq, &dirty_piece, perspective, slot::<H>(prev), slot_mut::<H>(cur));
        }

        if path.len() == 1 {
            count_stat!(count_update, Self::net_kind());
        } else {
            count_stat!(count_forward_update, Self::net_kind());
        }
        true
    }

    /// 次の評価に備えて両視点を計算しておく
    pub fn hint_common_access(&self, pos: &Position, stack: &mut AccumulatorStack) {
        self.update_accumulator(pos, stack, Color::White);
        self.update_accumulator(pos, stack, Color::Black);
    }

    /// 変換後の特徴量を `output`（`H` バイト）に書き込み、PSQT 値を返す
    ///
    /// 手番側の半分が先頭、相手側の半分が後半に並ぶ。
    pub fn transform(
        &self,
        pos: &Position,
        stack: &mut AccumulatorStack,
        output: &mut [u8],
        bucket: usize,
    ) -> i32 {
        self.hint_common_access(pos, stack);

        let acc = slot::<H>(stack.current());
        let stm = pos.side_to_move();
        let perspectives = [stm, !stm];

        let psqt = (acc.psqt_accumulation[stm][bucket] - acc.psqt_accumulation[!stm][bucket]) / 2;

        let half = H / 2;
        for (p, &perspective) in perspectives.iter().enumerate() {
            let accumulation = &acc.accumulation[perspective];
            let out = &mut output[p * half..(p + 1) * half];
            for (j, o) in out.iter_mut().enumerate() {
                let sum0 = i32::from(accumulation[j]).clamp(0, ACTIVATION_MAX);
                let sum1 = i32::from(accumulation[j + half]).clamp(0, ACTIVATION_MAX);
                *o = (sum0 * sum1 / 128) as u8;
            }
        }

        psqt
    }

    // =========================================================================
    // 重み行の加減算
    // =========================================================================

    #[inline]
    fn weight_row(&self, index: FeatureIndex) -> &[i16] {
        let offset = index as usize * H;
        if offset + H > self.weights.len() {
            feature_index_oob(index, Self::INPUT_DIMENSIONS);
        }
        &self.weights[offset..offset + H]
    }

    #[inline]
    fn psqt_row(&self, index: FeatureIndex) -> &[i32] {
        let offset = index as usize * PSQT_BUCKETS;
        if offset + PSQT_BUCKETS > self.psqt_weights.len() {
            feature_index_oob(index, Self::INPUT_DIMENSIONS);
        }
        &self.psqt_weights[offset..offset + PSQT_BUCKETS]
    }

    #[inline]
    fn add_weights(&self, accumulation: &mut [i16; H], index: FeatureIndex) {
        for (acc, &weight) in accumulation.iter_mut().zip(self.weight_row(index)) {
            *acc = acc.wrapping_add(weight);
        }
    }

    #[inline]
    fn sub_weights(&self, accumulation: &mut [i16; H], index: FeatureIndex) {
        for (acc, &weight) in accumulation.iter_mut().zip(self.weight_row(index)) {
            *acc = acc.wrapping_sub(weight);
        }
    }

    #[inline]
    fn add_psqt_weights(&self, psqt: &mut [i32; PSQT_BUCKETS], index: FeatureIndex) {
        for (acc, &weight) in psqt.iter_mut().zip(self.psqt_row(index)) {
            *acc = acc.wrapping_add(weight);
        }
    }

    #[inline]
    fn sub_psqt_weights(&self, psqt: &mut [i32; PSQT_BUCKETS], index: FeatureIndex) {
        for (acc, &weight) in psqt.iter_mut().zip(self.psqt_row(index)) {
            *acc = acc.wrapping_sub(weight);
        }
    }
}

#[inline]
fn slot<const H: usize>(entry: &StackEntry) -> &Accumulator<H>
where
    StackEntry: AccumulatorSlot<H>,
{
    <StackEntry as AccumulatorSlot<H>>::accumulator(entry)
}

#[inline]
fn slot_mut<const H: usize>(entry: &mut StackEntry) -> &mut Accumulator<H>
where
    StackEntry: AccumulatorSlot<H>,
{
    <StackEntry as AccumulatorSlot<H>>::accumulator_mut(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nnue::constants::TRANSFORMED_FEATURE_DIMENSIONS_SMALL;
    use crate::nnue::test_util::random_transformer;
    use crate::position::Move;
    use rand::SeedableRng;
    use rand::seq::IndexedRandom;
    use rand_xoshiro::Xoshiro256PlusPlus;

    const SMALL: usize = TRANSFORMED_FEATURE_DIMENSIONS_SMALL;

    fn refreshed(ft: &FeatureTransformer<SMALL>, pos: &Position) -> Accumulator<SMALL> {
        let mut acc = Accumulator::new();
        for perspective in Color::ALL {
            ft.refresh_accumulator(pos, perspective, &mut acc);
        }
        acc
    }

    fn assert_matches_refresh(ft: &FeatureTransformer<SMALL>, pos: &Position, stack: &mut AccumulatorStack) {
        ft.hint_common_access(pos, stack);
        let expected = refreshed(ft, pos);
        let actual = &stack.current().small;
        for perspective in Color::ALL {
            assert!(actual.computed[perspective]);
            assert_eq!(actual.accumulation[perspective], expected.accumulation[perspective]);
            assert_eq!(actual.psqt_accumulation[perspective], expected.psqt_accumulation[perspective]);
        }
    }

    #[test]
    fn test_hash_value() {
        assert_eq!(FeatureTransformer::<SMALL>::hash_value(), 0x7f23_4cb8 ^ 256);
        assert_eq!(FeatureTransformer::<TRANSFORMED_FEATURE_DIMENSIONS_BIG>::hash_value(), 0x7f23_4cb8 ^ 5120);
    }

    #[test]
    fn test_refresh_is_bias_plus_rows() {
        let ft = random_transformer::<SMALL>(1);
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let acc = refreshed(&ft, &pos);
        let ksq = pos.king_square(Color::White);
        let wk = crate::nnue::features::make_index(Color::White, Square::E1, crate::types::Piece::W_KING, ksq);
        let bk = crate::nnue::features::make_index(Color::White, Square::E8, crate::types::Piece::B_KING, ksq);
        for j in 0..SMALL {
            let expected = ft.biases[j]
                .wrapping_add(ft.weights[wk as usize * SMALL + j])
                .wrapping_add(ft.weights[bk as usize * SMALL + j]);
            assert_eq!(acc.accumulation[Color::White][j], expected);
        }
    }

    #[test]
    fn test_incremental_matches_refresh_along_playout() {
        let ft = random_transformer::<SMALL>(2);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut pos = Position::startpos();
        let mut stack = AccumulatorStack::new();
        let mut played = Vec::new();

        assert_matches_refresh(&ft, &pos, &mut stack);
        for _ in 0..60 {
            let moves = pos.legal_moves();
            let Some(&m) = moves.choose(&mut rng) else { break };
            let dp = pos.do_move(m);
            stack.push(dp);
            played.push(m);
            assert_matches_refresh(&ft, &pos, &mut stack);
        }
        while let Some(m) = played.pop() {
            pos.undo_move(m);
            stack.pop();
            assert_matches_refresh(&ft, &pos, &mut stack);
        }
    }

    #[test]
    fn test_lazy_chain_replays_from_ancestor() {
        let ft = random_transformer::<SMALL>(3);
        let mut pos = Position::startpos();
        let mut stack = AccumulatorStack::new();
        ft.hint_common_access(&pos, &mut stack);

        // 評価せずに3手進めてから、まとめて差分更新
        for text in ["g1f3", "g8f6", "b1c3"] {
            let m = Move::from_uci(&pos, text).unwrap();
            stack.push(pos.do_move(m));
        }
        assert_matches_refresh(&ft, &pos, &mut stack);
        for idx in 1..3 {
            assert!(stack.entry_at(idx).small.computed[Color::White]);
        }
    }

    #[test]
    fn test_king_move_forces_refresh_for_own_perspective_only() {
        let ft = random_transformer::<SMALL>(4);
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w Q - 0 1").unwrap();
        let mut stack = AccumulatorStack::new();
        ft.hint_common_access(&pos, &mut stack);

        let m = Move::from_uci(&pos, "e1d2").unwrap();
        let dp = pos.do_move(m);
        assert!(HalfKAv2Hm::requires_refresh(&dp, Color::White));
        assert!(!HalfKAv2Hm::requires_refresh(&dp, Color::Black));
        stack.push(dp);
        assert_matches_refresh(&ft, &pos, &mut stack);
    }

    #[test]
    fn test_transform_orders_side_to_move_first() {
        let ft = random_transformer::<SMALL>(5);
        let mut pos = Position::startpos();
        let mut stack = AccumulatorStack::new();
        let mut white_first = [0u8; SMALL];
        ft.transform(&pos, &mut stack, &mut white_first, 7);

        let m = Move::from_uci(&pos, "g1f3").unwrap();
        stack.push(pos.do_move(m));
        let mut black_first = [0u8; SMALL];
        let psqt = ft.transform(&pos, &mut stack, &mut black_first, 7);

        let acc = &stack.current().small;
        let half = SMALL / 2;
        for j in 0..half {
            let a = i32::from(acc.accumulation[Color::Black][j]).clamp(0, 127);
            let b = i32::from(acc.accumulation[Color::Black][j + half]).clamp(0, 127);
            assert_eq!(i32::from(black_first[j]), a * b / 128);
        }
        let expected_psqt = (acc.psqt_accumulation[Color::Black][7] - acc.psqt_accumulation[Color::White][7]) / 2;
        assert_eq!(psqt, expected_psqt);
        assert!(black_first.iter().all(|&x| x <= 127));
    }

    #[test]
    fn test_parameters_round_trip() {
        let ft = random_transformer::<SMALL>(6);
        let mut bytes = Vec::new();
        ft.write_parameters(&mut bytes).unwrap();
        let mut back = FeatureTransformer::<SMALL>::new_zeroed();
        back.read_parameters(&mut std::io::Cursor::new(&bytes)).unwrap();
        assert!(back.parameters_eq(&ft));
    }
}
