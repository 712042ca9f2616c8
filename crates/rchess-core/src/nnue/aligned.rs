//! アライメント保証付きのゼロ初期化メモリ
//!
//! ネットワークの重みテーブルはキャッシュライン境界（大きなテーブルは Linux では
//! 2MB 境界 + `MADV_HUGEPAGE`）に配置する。確保・ゼロ初期化・解放は [`AlignedBox`] が
//! 一括して受け持ち、呼び出し側にアライメント計算は漏れない。

use std::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use super::constants::CACHE_LINE_SIZE;

/// 64バイトアライメントのラッパー（スタック上のバッファ用）
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aligned<T>(pub T);

impl<T: Default> Default for Aligned<T> {
    fn default() -> Self {
        Self(T::default())
    }
}

/// ゼロのビットパターンが有効な値となる整数型
///
/// # Safety
///
/// 全ビット 0 がその型の有効な値であり、`Drop` を持たないこと。
pub unsafe trait Zeroable: Copy + Send + Sync + 'static {}

unsafe impl Zeroable for i8 {}
unsafe impl Zeroable for u8 {}
unsafe impl Zeroable for i16 {}
unsafe impl Zeroable for i32 {}

/// Large Pages 相当の扱いをするサイズの閾値
#[cfg(any(target_os = "linux", target_os = "android"))]
const HUGE_PAGE_THRESHOLD: usize = 2 * 1024 * 1024;

/// アライメント保証付きのゼロ初期化済みスライス
pub struct AlignedBox<T: Zeroable> {
    ptr: NonNull<T>,
    len: usize,
    layout: Option<Layout>,
}

// SAFETY: 所有権を持つ連続領域であり、T: Send + Sync
unsafe impl<T: Zeroable> Send for AlignedBox<T> {}
unsafe impl<T: Zeroable> Sync for AlignedBox<T> {}

impl<T: Zeroable> AlignedBox<T> {
    /// `len` 要素をゼロ初期化して確保
    ///
    /// 確保に失敗した場合は `handle_alloc_error` でプロセスを停止する。
    pub fn new_zeroed(len: usize) -> Self {
        let size = len.checked_mul(std::mem::size_of::<T>()).unwrap_or(usize::MAX);
        if size == 0 {
            return Self { ptr: NonNull::dangling(), len, layout: None };
        }

        let align = Self::alignment_for(size);
        let layout = match Layout::from_size_align(size, align) {
            Ok(layout) => layout.pad_to_align(),
            Err(_) => handle_alloc_error(Layout::new::<T>()),
        };

        // SAFETY: size > 0 の layout
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw as *mut T) else {
            handle_alloc_error(layout);
        };

        #[cfg(any(target_os = "linux", target_os = "android"))]
        if layout.size() >= HUGE_PAGE_THRESHOLD {
            // SAFETY: 確保済み領域に対するヒントのみ
            let result = unsafe { libc::madvise(raw as *mut _, layout.size(), libc::MADV_HUGEPAGE) };
            if result != 0 {
                log::debug!("madvise(MADV_HUGEPAGE) failed for {} bytes", layout.size());
            }
        }

        Self { ptr, len, layout: Some(layout) }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[inline]
    fn alignment_for(size: usize) -> usize {
        if size >= HUGE_PAGE_THRESHOLD { HUGE_PAGE_THRESHOLD } else { CACHE_LINE_SIZE }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    #[inline]
    fn alignment_for(_size: usize) -> usize {
        CACHE_LINE_SIZE
    }
}

impl<T: Zeroable> Deref for AlignedBox<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        // SAFETY: ptr は len 要素分の初期化済み領域（len == 0 なら dangling で可）
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Zeroable> DerefMut for AlignedBox<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: 同上。&mut self により排他
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Zeroable> Drop for AlignedBox<T> {
    fn drop(&mut self) {
        if let Some(layout) = self.layout {
            // SAFETY: new_zeroed で同じ layout により確保した領域
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, layout) };
        }
    }
}

impl<T: Zeroable + std::fmt::Debug> std::fmt::Debug for AlignedBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBox").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_zeroed_alignment() {
        let buf = AlignedBox::<i16>::new_zeroed(1000);
        assert_eq!(buf.len(), 1000);
        assert_eq!(buf.as_ptr() as usize % CACHE_LINE_SIZE, 0);
        assert!(buf.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_large_allocation_is_zeroed() {
        let mut buf = AlignedBox::<i32>::new_zeroed(1 << 20);
        assert_eq!(buf.as_ptr() as usize % CACHE_LINE_SIZE, 0);
        assert_eq!(buf[(1 << 20) - 1], 0);
        buf[12345] = -7;
        assert_eq!(buf[12345], -7);
    }

    #[test]
    fn test_empty_allocation() {
        let buf = AlignedBox::<i8>::new_zeroed(0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_aligned_wrapper() {
        let a = Aligned([0u8; 3]);
        assert_eq!(&a as *const _ as usize % 64, 0);
    }
}
