//! アキュムレータとアキュムレータスタック
//!
//! アキュムレータは「アクティブな特徴量の重み行の総和 + バイアス」を視点ごとに保持する
//! キャッシュ。探索の1手ごとにスタックのエントリを1つ進め、着手の差分
//! （[`DirtyPiece`]）を記録しておく。値の計算は評価が必要になった時点まで遅延し、
//! 計算済みの祖先から差分を順に適用するか、全計算するかを特徴量変換器が選ぶ。

use super::constants::{PSQT_BUCKETS, TRANSFORMED_FEATURE_DIMENSIONS_BIG, TRANSFORMED_FEATURE_DIMENSIONS_SMALL};
use super::features::FeatureIndex;
use crate::position::DirtyPiece;
use crate::types::{ByColor, MAX_PLY};

/// アクティブ特徴量の最大数（盤上の駒は最大32枚）
pub const MAX_ACTIVE_FEATURES: usize = 32;

/// 1手で変化する特徴量の最大数
pub const MAX_CHANGED_FEATURES: usize = DirtyPiece::MAX_PIECES;

/// 差分更新で辿るパスの最大長
pub const MAX_PATH_LENGTH: usize = 32;

/// スタックのエントリ数
pub const STACK_SIZE: usize = MAX_PLY + 16;

// =============================================================================
// IndexList - 固定長のインデックスリスト
// =============================================================================

/// ヒープ確保しない固定長のインデックスリスト
///
/// 要素型の既定は特徴量インデックス。スタック上の位置を並べる場合は `usize` を使う。
#[derive(Clone, Copy)]
pub struct IndexList<const N: usize, T = FeatureIndex> {
    indices: [T; N],
    len: usize,
}

impl<const N: usize, T: Copy + Default> IndexList<N, T> {
    #[inline]
    pub fn new() -> Self {
        Self { indices: [T::default(); N], len: 0 }
    }

    /// 末尾に追加（満杯なら追加せず false）
    #[inline]
    pub fn push(&mut self, index: T) -> bool {
        if self.len == N {
            return false;
        }
        self.indices[self.len] = index;
        self.len += 1;
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.indices[..self.len]
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.as_slice().iter().copied()
    }

    #[inline]
    pub fn reverse(&mut self) {
        self.indices[..self.len].reverse();
    }
}

impl<const N: usize, T: Copy + Default> Default for IndexList<N, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, T: Copy + Default + std::fmt::Debug> std::fmt::Debug for IndexList<N, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// 差分更新で辿るスタック上の位置の列
pub type PathList = IndexList<MAX_PATH_LENGTH, usize>;

// =============================================================================
// Accumulator
// =============================================================================

/// 特徴量変換器の出力（変換前）を保持するアキュムレータ
///
/// `H` は片視点の変換後次元（Big: 2560, Small: 128）。
#[repr(C, align(64))]
#[derive(Clone)]
pub struct Accumulator<const H: usize> {
    /// 各視点の累積値
    pub accumulation: ByColor<[i16; H]>,
    /// 各視点の PSQT 累積値
    pub psqt_accumulation: ByColor<[i32; PSQT_BUCKETS]>,
    /// 計算済みフラグ（視点ごと）
    pub computed: ByColor<bool>,
}

impl<const H: usize> Accumulator<H> {
    pub fn new() -> Self {
        Self {
            accumulation: ByColor([[0; H]; 2]),
            psqt_accumulation: ByColor::splat([0; PSQT_BUCKETS]),
            computed: ByColor::splat(false),
        }
    }

    /// 両視点を未計算にする
    #[inline]
    pub fn invalidate(&mut self) {
        self.computed = ByColor::splat(false);
    }
}

impl<const H: usize> Default for Accumulator<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// スタックエントリから、指定サイズのアキュムレータを取り出す
///
/// 特徴量変換器は変換後次元 `H` についてジェネリックなので、
/// この trait を通して Big / Small のどちらかのアキュムレータを選ぶ。
pub trait AccumulatorSlot<const H: usize> {
    fn accumulator(&self) -> &Accumulator<H>;
    fn accumulator_mut(&mut self) -> &mut Accumulator<H>;
}

// =============================================================================
// StackEntry
// =============================================================================

/// スタックエントリ（1手分）
#[derive(Clone)]
pub struct StackEntry {
    pub big: Accumulator<TRANSFORMED_FEATURE_DIMENSIONS_BIG>,
    pub small: Accumulator<TRANSFORMED_FEATURE_DIMENSIONS_SMALL>,
    /// このエントリに至った着手の差分
    pub dirty_piece: DirtyPiece,
    /// 直前のエントリ（ルートなら `None`）
    pub previous: Option<usize>,
}

impl StackEntry {
    pub fn new() -> Self {
        Self {
            big: Accumulator::new(),
            small: Accumulator::new(),
            dirty_piece: DirtyPiece::new(),
            previous: None,
        }
    }

    /// Big / Small の両方を未計算にする
    #[inline]
    pub fn invalidate(&mut self) {
        self.big.invalidate();
        self.small.invalidate();
    }
}

impl Default for StackEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatorSlot<TRANSFORMED_FEATURE_DIMENSIONS_BIG> for StackEntry {
    #[inline]
    fn accumulator(&self) -> &Accumulator<TRANSFORMED_FEATURE_DIMENSIONS_BIG> {
        &self.big
    }

    #[inline]
    fn accumulator_mut(&mut self) -> &mut Accumulator<TRANSFORMED_FEATURE_DIMENSIONS_BIG> {
        &mut self.big
    }
}

impl AccumulatorSlot<TRANSFORMED_FEATURE_DIMENSIONS_SMALL> for StackEntry {
    #[inline]
    fn accumulator(&self) -> &Accumulator<TRANSFORMED_FEATURE_DIMENSIONS_SMALL> {
        &self.small
    }

    #[inline]
    fn accumulator_mut(&mut self) -> &mut Accumulator<TRANSFORMED_FEATURE_DIMENSIONS_SMALL> {
        &mut self.small
    }
}

// =============================================================================
// AccumulatorStack
// =============================================================================

/// アキュムレータスタック
///
/// 探索スレッドごとに1つ持つ。エントリは起動時に全て確保し、探索中は確保しない。
pub struct AccumulatorStack {
    entries: Box<[StackEntry]>,
    current: usize,
}

impl AccumulatorStack {
    pub fn new() -> Self {
        let entries: Vec<StackEntry> = (0..STACK_SIZE).map(|_| StackEntry::new()).collect();
        Self { entries: entries.into_boxed_slice(), current: 0 }
    }

    /// ルート局面に戻す（ルートのアキュムレータは未計算になる）
    pub fn reset(&mut self) {
        self.current = 0;
        let root = &mut self.entries[0];
        root.previous = None;
        root.dirty_piece = DirtyPiece::new();
        root.invalidate();
    }

    /// 1手進める
    #[inline]
    pub fn push(&mut self, dirty_piece: DirtyPiece) {
        let prev = self.current;
        self.current += 1;
        debug_assert!(self.current < STACK_SIZE, "accumulator stack overflow");
        let entry = &mut self.entries[self.current];
        entry.previous = Some(prev);
        entry.dirty_piece = dirty_piece;
        entry.invalidate();
    }

    /// 1手戻す
    #[inline]
    pub fn pop(&mut self) {
        debug_assert!(self.current > 0, "accumulator stack underflow");
        self.current = self.current.saturating_sub(1);
    }

    #[inline]
    pub fn current(&self) -> &StackEntry {
        &self.entries[self.current]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut StackEntry {
        &mut self.entries[self.current]
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn entry_at(&self, index: usize) -> &StackEntry {
        &self.entries[index]
    }

    #[inline]
    pub fn entry_at_mut(&mut self, index: usize) -> &mut StackEntry {
        &mut self.entries[index]
    }

    /// `prev_idx` のエントリへの不変参照と `cur_idx` のエントリへの可変参照を同時に取得
    #[inline]
    pub fn pair_mut(&mut self, prev_idx: usize, cur_idx: usize) -> (&StackEntry, &mut StackEntry) {
        debug_assert!(prev_idx < cur_idx, "prev_idx ({prev_idx}) must be < cur_idx ({cur_idx})");
        let (left, right) = self.entries.split_at_mut(cur_idx);
        (&left[prev_idx], &mut right[0])
    }

    /// `source_idx` の次から現在までのエントリを古い順に列挙
    ///
    /// 連結が途切れた場合、またはパスが長すぎる場合は `None`。
    pub fn collect_path(&self, source_idx: usize) -> Option<PathList> {
        let mut path = PathList::new();
        let mut idx = self.current;
        while idx != source_idx {
            if !path.push(idx) {
                return None;
            }
            idx = self.entries[idx].previous?;
        }
        path.reverse();
        Some(path)
    }

    /// 全エントリを未計算にする（ネットワーク差し替え時）
    pub fn invalidate_all(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.invalidate();
        }
    }

    /// 現在のエントリを直前のエントリから切り離し、未計算にする
    ///
    /// 盤面を一時的に書き換えて評価する場合に使う。戻り値は元の連結先で、
    /// [`reattach_current`](Self::reattach_current) に渡して復元する。
    pub fn detach_current(&mut self) -> Option<usize> {
        let entry = self.current_mut();
        entry.invalidate();
        entry.previous.take()
    }

    /// [`detach_current`](Self::detach_current) で切り離した連結を復元し、未計算にする
    pub fn reattach_current(&mut self, previous: Option<usize>) {
        let entry = self.current_mut();
        entry.previous = previous;
        entry.invalidate();
    }
}

impl Default for AccumulatorStack {
    fn default() -> Self {
        Self::new()
    }
}
