//! HalfKAv2_hm 特徴量
//!
//! 自玉の位置（32 バケット、左右ミラー）× 駒の位置（64升 × 11 駒クラス）。
//! 自玉が e〜h 筋にいれば盤をそのまま、a〜d 筋にいれば左右反転して扱うため、
//! 玉の位置は常に e〜h 筋側に正規化される。黒視点ではさらに上下を反転する。
//!
//! インデックスは `(sq ^ orient) + piece_square_index + king_bucket`。
//! 全組み合わせを起動時に1度だけ計算したテーブル [`FeatureIndexTable`] から引く。

use std::sync::OnceLock;

use super::accumulator::{IndexList, MAX_ACTIVE_FEATURES, MAX_CHANGED_FEATURES};
use crate::position::{DirtyPiece, Position};
use crate::types::{Color, Piece, PieceType, Square};

// =============================================================================
// 特徴量の定義
// =============================================================================

/// 特徴量インデックス
pub type FeatureIndex = u32;

/// 1つの玉バケットあたりの駒クラス × 升の数（11 × 64）
pub const PS_NB: usize = 11 * Square::NUM;

// 駒クラスの基底オフセット（自駒 / 相手駒）
const PS_NONE: u32 = 0;
const PS_OWN_PAWN: u32 = 0;
const PS_THEIR_PAWN: u32 = 64;
const PS_OWN_KNIGHT: u32 = 2 * 64;
const PS_THEIR_KNIGHT: u32 = 3 * 64;
const PS_OWN_BISHOP: u32 = 4 * 64;
const PS_THEIR_BISHOP: u32 = 5 * 64;
const PS_OWN_ROOK: u32 = 6 * 64;
const PS_THEIR_ROOK: u32 = 7 * 64;
const PS_OWN_QUEEN: u32 = 8 * 64;
const PS_THEIR_QUEEN: u32 = 9 * 64;
/// 玉は色を区別しない
const PS_KING: u32 = 10 * 64;

/// [視点][駒] → 駒クラスの基底オフセット
const PIECE_SQUARE_INDEX: [[u32; Piece::NUM]; Color::NUM] = [
    // 白視点
    [
        PS_NONE, PS_OWN_PAWN, PS_OWN_KNIGHT, PS_OWN_BISHOP, PS_OWN_ROOK, PS_OWN_QUEEN, PS_KING,
        PS_NONE, PS_NONE, PS_THEIR_PAWN, PS_THEIR_KNIGHT, PS_THEIR_BISHOP, PS_THEIR_ROOK,
        PS_THEIR_QUEEN, PS_KING, PS_NONE,
    ],
    // 黒視点
    [
        PS_NONE, PS_THEIR_PAWN, PS_THEIR_KNIGHT, PS_THEIR_BISHOP, PS_THEIR_ROOK, PS_THEIR_QUEEN,
        PS_KING, PS_NONE, PS_NONE, PS_OWN_PAWN, PS_OWN_KNIGHT, PS_OWN_BISHOP, PS_OWN_ROOK,
        PS_OWN_QUEEN, PS_KING, PS_NONE,
    ],
];

/// 升の向きを揃える XOR 値
#[inline]
const fn orient(perspective: Color, ksq: Square) -> u32 {
    let mirror = ksq.file() < 4;
    match (perspective, mirror) {
        (Color::White, true) => Square::H1.index() as u32,
        (Color::White, false) => Square::A1.index() as u32,
        (Color::Black, true) => Square::H8.index() as u32,
        (Color::Black, false) => Square::A8.index() as u32,
    }
}

/// 玉バケットの基底オフセット（`PS_NB` 単位）
///
/// 自陣1段目が 28〜31、8段目が 0〜3。筋は左右対称に畳む。
#[inline]
const fn king_bucket(perspective: Color, ksq: Square) -> u32 {
    let file = ksq.file();
    let mirrored_file = if file < 4 { file } else { 7 - file };
    let row = match perspective {
        Color::White => 7 - ksq.rank(),
        Color::Black => ksq.rank(),
    };
    (row as u32 * 4 + mirrored_file as u32) * PS_NB as u32
}

/// 特徴量インデックスを式から直接計算
///
/// テーブル構築とテストでのみ使用する。評価中は [`FeatureIndexTable::get`] を使う。
#[inline]
pub const fn make_index(perspective: Color, sq: Square, pc: Piece, ksq: Square) -> FeatureIndex {
    (sq.index() as u32 ^ orient(perspective, ksq))
        + PIECE_SQUARE_INDEX[perspective.index()][pc.index()]
        + king_bucket(perspective, ksq)
}

// =============================================================================
// FeatureIndexTable
// =============================================================================

static INDEX_TABLE: OnceLock<FeatureIndexTable> = OnceLock::new();

/// [視点][升][駒][玉の升] → 特徴量インデックス
pub struct FeatureIndexTable {
    indices: Box<[u16]>,
}

impl FeatureIndexTable {
    const LEN: usize = Color::NUM * Square::NUM * Piece::NUM * Square::NUM;

    fn build() -> Self {
        let mut indices = vec![0u16; Self::LEN].into_boxed_slice();
        for perspective in Color::ALL {
            for sq in Square::all() {
                for pc in 0..Piece::NUM {
                    let piece = Piece::from_index(pc);
                    for ksq in Square::all() {
                        let idx = make_index(perspective, sq, piece, ksq);
                        debug_assert!((idx as usize) < HalfKAv2Hm::DIMENSIONS);
                        indices[Self::slot(perspective, sq, piece, ksq)] = idx as u16;
                    }
                }
            }
        }
        Self { indices }
    }

    /// プロセス共有のテーブル（未構築ならここで構築）
    ///
    /// 起動時に [`ModelRegistry::init`](super::ModelRegistry::init) と
    /// [`Evaluator::new`](super::Evaluator::new) から呼ばれるので、評価中に構築が走ることはない。
    #[inline]
    pub fn global() -> &'static FeatureIndexTable {
        INDEX_TABLE.get_or_init(Self::build)
    }

    /// 構築済みか
    pub fn is_built() -> bool {
        INDEX_TABLE.get().is_some()
    }

    #[inline]
    const fn slot(perspective: Color, sq: Square, pc: Piece, ksq: Square) -> usize {
        ((perspective.index() * Square::NUM + sq.index()) * Piece::NUM + pc.index()) * Square::NUM
            + ksq.index()
    }

    #[inline]
    pub fn get(&self, perspective: Color, sq: Square, pc: Piece, ksq: Square) -> FeatureIndex {
        FeatureIndex::from(self.indices[Self::slot(perspective, sq, pc, ksq)])
    }
}

// =============================================================================
// Feature trait
// =============================================================================

/// 入力特徴量の集合
///
/// 特徴量変換器はこの trait を通してインデックスの列挙と
/// 差分更新の可否・コストの判定を行う。
pub trait Feature {
    /// 構造ハッシュ
    const HASH_VALUE: u32;
    /// 特徴量の次元数
    const DIMENSIONS: usize;
    /// 同時にアクティブになる最大数
    const MAX_ACTIVE: usize;

    /// アクティブな特徴量インデックスを追記
    fn append_active_indices(
        pos: &Position,
        perspective: Color,
        active: &mut IndexList<MAX_ACTIVE_FEATURES>,
    );

    /// 変化した特徴量インデックスを追記
    fn append_changed_indices(
        ksq: Square,
        dirty_piece: &DirtyPiece,
        perspective: Color,
        removed: &mut IndexList<MAX_CHANGED_FEATURES>,
        added: &mut IndexList<MAX_CHANGED_FEATURES>,
    );

    /// 差分更新できず全計算が必要か
    fn requires_refresh(dirty_piece: &DirtyPiece, perspective: Color) -> bool;

    /// 1手分の差分更新のコスト
    fn update_cost(dirty_piece: &DirtyPiece) -> i32;

    /// 全計算のコスト
    fn refresh_cost(pos: &Position) -> i32;
}

/// HalfKAv2_hm 特徴量
pub struct HalfKAv2Hm;

impl Feature for HalfKAv2Hm {
    const HASH_VALUE: u32 = 0x7f23_4cb8;
    const DIMENSIONS: usize = Square::NUM * PS_NB / 2;
    const MAX_ACTIVE: usize = 32;

    #[inline]
    fn append_active_indices(
        pos: &Position,
        perspective: Color,
        active: &mut IndexList<MAX_ACTIVE_FEATURES>,
    ) {
        let table = FeatureIndexTable::global();
        let ksq = pos.king_square(perspective);
        for (sq, pc) in pos.pieces() {
            let pushed = active.push(table.get(perspective, sq, pc, ksq));
            debug_assert!(pushed, "too many active features");
        }
    }

    #[inline]
    fn append_changed_indices(
        ksq: Square,
        dirty_piece: &DirtyPiece,
        perspective: Color,
        removed: &mut IndexList<MAX_CHANGED_FEATURES>,
        added: &mut IndexList<MAX_CHANGED_FEATURES>,
    ) {
        let table = FeatureIndexTable::global();
        for cp in dirty_piece.pieces() {
            if let Some(from) = cp.from {
                removed.push(table.get(perspective, from, cp.piece, ksq));
            }
            if let Some(to) = cp.to {
                added.push(table.get(perspective, to, cp.piece, ksq));
            }
        }
    }

    #[inline]
    fn requires_refresh(dirty_piece: &DirtyPiece, perspective: Color) -> bool {
        dirty_piece.moved().is_some_and(|cp| cp.piece == Piece::make(perspective, PieceType::King))
    }

    #[inline]
    fn update_cost(dirty_piece: &DirtyPiece) -> i32 {
        dirty_piece.len() as i32
    }

    #[inline]
    fn refresh_cost(pos: &Position) -> i32 {
        pos.count_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Move;

    #[test]
    fn test_dimensions() {
        assert_eq!(PS_NB, 704);
        assert_eq!(HalfKAv2Hm::DIMENSIONS, 22528);
    }

    #[test]
    fn test_make_index_known_values() {
        let e1 = Square::E1;
        let e2 = Square::parse("e2").unwrap();
        // 白玉 e1: 反転なし、バケット 31
        assert_eq!(make_index(Color::White, e2, Piece::W_PAWN, e1), 12 + 31 * 704);
        assert_eq!(make_index(Color::White, e1, Piece::W_KING, e1), 4 + 640 + 31 * 704);
        // 白玉 d1: 左右反転（e2 → d2）
        assert_eq!(make_index(Color::White, e2, Piece::B_PAWN, Square::D1), (12 ^ 7) + 64 + 31 * 704);
        // 黒玉 e8: 上下反転（e2 → e7）、バケット 31
        assert_eq!(make_index(Color::Black, e2, Piece::W_PAWN, Square::E8), (12 ^ 56) + 64 + 31 * 704);
        assert_eq!(make_index(Color::Black, Square::E8, Piece::B_KING, Square::E8), 4 + 640 + 31 * 704);
    }

    #[test]
    fn test_index_range_and_table() {
        let table = FeatureIndexTable::global();
        for perspective in Color::ALL {
            for ksq in Square::all() {
                for sq in Square::all() {
                    for pc in [Piece::W_PAWN, Piece::B_QUEEN, Piece::W_KING, Piece::B_KING] {
                        let idx = make_index(perspective, sq, pc, ksq);
                        assert!((idx as usize) < HalfKAv2Hm::DIMENSIONS);
                        assert_eq!(table.get(perspective, sq, pc, ksq), idx);
                    }
                }
            }
        }
    }

    #[test]
    fn test_mirror_symmetry() {
        // 盤全体を上下反転・色反転した局面は、反対の視点から同じ特徴量になる
        let flip = |sq: Square| Square::from_file_rank(sq.file(), 7 - sq.rank());
        let swap = |pc: Piece| Piece::make(!pc.color(), pc.piece_type().unwrap());
        for ksq in Square::all() {
            for sq in Square::all() {
                for pc in [Piece::W_KNIGHT, Piece::B_ROOK, Piece::W_KING] {
                    assert_eq!(
                        make_index(Color::White, sq, pc, ksq),
                        make_index(Color::Black, flip(sq), swap(pc), flip(ksq))
                    );
                }
            }
        }
    }

    #[test]
    fn test_active_indices_startpos() {
        let pos = Position::startpos();
        for perspective in Color::ALL {
            let mut active = IndexList::new();
            HalfKAv2Hm::append_active_indices(&pos, perspective, &mut active);
            assert_eq!(active.len(), 32);
        }
        assert_eq!(HalfKAv2Hm::refresh_cost(&pos), 32);
    }

    #[test]
    fn test_changed_indices_and_refresh_rule() {
        let mut pos = Position::startpos();
        let m = Move::from_uci(&pos, "e2e4").unwrap();
        let dp = pos.do_move(m);
        assert!(!HalfKAv2Hm::requires_refresh(&dp, Color::White));
        assert!(!HalfKAv2Hm::requires_refresh(&dp, Color::Black));
        assert_eq!(HalfKAv2Hm::update_cost(&dp), 1);

        let mut removed = IndexList::new();
        let mut added = IndexList::new();
        let ksq = pos.king_square(Color::White);
        HalfKAv2Hm::append_changed_indices(ksq, &dp, Color::White, &mut removed, &mut added);
        assert_eq!(removed.as_slice(), [make_index(Color::White, Square::parse("e2").unwrap(), Piece::W_PAWN, ksq)]);
        assert_eq!(added.as_slice(), [make_index(Color::White, Square::parse("e4").unwrap(), Piece::W_PAWN, ksq)]);

        let m = Move::from_uci(&pos, "e7e5").unwrap();
        pos.do_move(m);
        let m = Move::from_uci(&pos, "e1e2").unwrap();
        let dp = pos.do_move(m);
        assert!(HalfKAv2Hm::requires_refresh(&dp, Color::White));
        assert!(!HalfKAv2Hm::requires_refresh(&dp, Color::Black));
    }
}
