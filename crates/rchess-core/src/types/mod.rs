//! 基本型定義
//!
//! 手番・駒種・駒・升と、手番をキーとする2要素コンテナ [`ByColor`]。

mod value;

pub use value::Value;

use std::fmt;
use std::ops::{Index, IndexMut, Not};

/// 探索の最大深さ（アキュムレータスタックのサイズ決定に使用）
pub const MAX_PLY: usize = 246;

// =============================================================================
// Color
// =============================================================================

/// 手番（視点）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    /// 色の数
    pub const NUM: usize = 2;
    /// 全色
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Not for Color {
    type Output = Color;

    #[inline]
    fn not(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

// =============================================================================
// ByColor - 視点をキーとする2要素コンテナ
// =============================================================================

/// 視点ごとに値を持つ2要素コンテナ
///
/// 白用・黒用の配列を手で二重化せず、`Color` で添字付けする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct ByColor<T>(pub [T; Color::NUM]);

impl<T> ByColor<T> {
    #[inline]
    pub const fn new(white: T, black: T) -> Self {
        Self([white, black])
    }

    /// 両視点の要素を走査
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Color, &T)> {
        Color::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Copy> ByColor<T> {
    /// 両視点に同じ値を設定して作成
    #[inline]
    pub const fn splat(value: T) -> Self {
        Self([value; Color::NUM])
    }
}

impl<T> Index<Color> for ByColor<T> {
    type Output = T;

    #[inline]
    fn index(&self, c: Color) -> &T {
        &self.0[c.index()]
    }
}

impl<T> IndexMut<Color> for ByColor<T> {
    #[inline]
    fn index_mut(&mut self, c: Color) -> &mut T {
        &mut self.0[c.index()]
    }
}

// =============================================================================
// PieceType
// =============================================================================

/// 駒種
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PieceType {
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 4,
    Queen = 5,
    King = 6,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    /// 駒割（中盤値）
    ///
    /// 玉と歩は非歩駒の駒割に含めないため 0 を返す。
    #[inline]
    pub const fn non_pawn_value(self) -> i32 {
        match self {
            PieceType::Knight => Value::KNIGHT.raw(),
            PieceType::Bishop => Value::BISHOP.raw(),
            PieceType::Rook => Value::ROOK.raw(),
            PieceType::Queen => Value::QUEEN.raw(),
            PieceType::Pawn | PieceType::King => 0,
        }
    }

    #[inline]
    pub const fn from_u8(v: u8) -> Option<PieceType> {
        match v {
            1 => Some(PieceType::Pawn),
            2 => Some(PieceType::Knight),
            3 => Some(PieceType::Bishop),
            4 => Some(PieceType::Rook),
            5 => Some(PieceType::Queen),
            6 => Some(PieceType::King),
            _ => None,
        }
    }
}

// =============================================================================
// Piece
// =============================================================================

/// 駒（色 + 駒種）
///
/// エンコードは `color * 8 + piece_type`。白歩 = 1 .. 白玉 = 6、黒歩 = 9 .. 黒玉 = 14。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Piece(u8);

impl Piece {
    /// 駒コードの上限（テーブルサイズ用）
    pub const NUM: usize = 16;

    pub const NONE: Piece = Piece(0);
    pub const W_PAWN: Piece = Piece(1);
    pub const W_KNIGHT: Piece = Piece(2);
    pub const W_BISHOP: Piece = Piece(3);
    pub const W_ROOK: Piece = Piece(4);
    pub const W_QUEEN: Piece = Piece(5);
    pub const W_KING: Piece = Piece(6);
    pub const B_PAWN: Piece = Piece(9);
    pub const B_KNIGHT: Piece = Piece(10);
    pub const B_BISHOP: Piece = Piece(11);
    pub const B_ROOK: Piece = Piece(12);
    pub const B_QUEEN: Piece = Piece(13);
    pub const B_KING: Piece = Piece(14);

    #[inline]
    pub const fn make(color: Color, pt: PieceType) -> Piece {
        Piece(((color as u8) << 3) | pt as u8)
    }

    /// 駒コードから作成（テーブル構築用、下位4ビットのみ使用）
    #[inline]
    pub const fn from_index(index: usize) -> Piece {
        Piece((index & 15) as u8)
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 駒の色（`NONE` に対しては呼ばないこと）
    #[inline]
    pub const fn color(self) -> Color {
        if self.0 >> 3 == 0 { Color::White } else { Color::Black }
    }

    /// 駒種（`NONE` の場合は `None`）
    #[inline]
    pub const fn piece_type(self) -> Option<PieceType> {
        PieceType::from_u8(self.0 & 7)
    }

    /// FEN文字
    pub const fn to_char(self) -> char {
        match self.0 {
            1 => 'P',
            2 => 'N',
            3 => 'B',
            4 => 'R',
            5 => 'Q',
            6 => 'K',
            9 => 'p',
            10 => 'n',
            11 => 'b',
            12 => 'r',
            13 => 'q',
            14 => 'k',
            _ => ' ',
        }
    }

    /// FEN文字から変換
    pub fn from_char(c: char) -> Option<Piece> {
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        let pt = match c.to_ascii_lowercase() {
            'p' => PieceType::Pawn,
            'n' => PieceType::Knight,
            'b' => PieceType::Bishop,
            'r' => PieceType::Rook,
            'q' => PieceType::Queen,
            'k' => PieceType::King,
            _ => return None,
        };
        Some(Piece::make(color, pt))
    }
}

impl fmt::Debug for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Piece::NONE")
        } else {
            write!(f, "Piece({})", self.to_char())
        }
    }
}

// =============================================================================
// Square
// =============================================================================

/// 升（A1 = 0, H1 = 7, A8 = 56, H8 = 63）
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Square(u8);

impl Square {
    pub const NUM: usize = 64;

    pub const A1: Square = Square(0);
    pub const C1: Square = Square(2);
    pub const D1: Square = Square(3);
    pub const E1: Square = Square(4);
    pub const F1: Square = Square(5);
    pub const G1: Square = Square(6);
    pub const H1: Square = Square(7);
    pub const A8: Square = Square(56);
    pub const C8: Square = Square(58);
    pub const D8: Square = Square(59);
    pub const E8: Square = Square(60);
    pub const F8: Square = Square(61);
    pub const G8: Square = Square(62);
    pub const H8: Square = Square(63);

    /// 筋（0 = a筋）と段（0 = 1段目）から作成
    #[inline]
    pub const fn from_file_rank(file: u8, rank: u8) -> Square {
        debug_assert!(file < 8 && rank < 8);
        Square(rank * 8 + file)
    }

    /// インデックスから作成（範囲外は `None`）
    #[inline]
    pub const fn from_index(index: usize) -> Option<Square> {
        if index < Self::NUM { Some(Square(index as u8)) } else { None }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn file(self) -> u8 {
        self.0 & 7
    }

    #[inline]
    pub const fn rank(self) -> u8 {
        self.0 >> 3
    }

    /// 筋・段のオフセットを加えた升（盤外なら `None`）
    #[inline]
    pub const fn offset(self, df: i8, dr: i8) -> Option<Square> {
        let f = self.file() as i8 + df;
        let r = self.rank() as i8 + dr;
        if f < 0 || f > 7 || r < 0 || r > 7 {
            None
        } else {
            Some(Square::from_file_rank(f as u8, r as u8))
        }
    }

    /// 全升を A1 から順に走査
    pub fn all() -> impl Iterator<Item = Square> {
        (0..Self::NUM as u8).map(Square)
    }

    /// "e4" 形式の文字列から変換
    pub fn parse(s: &str) -> Option<Square> {
        let mut chars = s.chars();
        let f = chars.next()?;
        let r = chars.next()?;
        if chars.next().is_some() || !('a'..='h').contains(&f) || !('1'..='8').contains(&r) {
            return None;
        }
        Some(Square::from_file_rank(f as u8 - b'a', r as u8 - b'1'))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file()) as char, (b'1' + self.rank()) as char)
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
