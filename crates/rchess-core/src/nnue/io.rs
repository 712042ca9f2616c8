//! リトルエンディアン整数の読み書き
//!
//! ホストのバイトオーダーに関わらず、ファイル上は常にリトルエンディアン。

use std::io::{self, Read, Write};

/// リトルエンディアンで読み書きできる整数型
pub trait LittleEndian: Copy + Sized {
    const SIZE: usize;

    fn from_le_slice(bytes: &[u8]) -> Self;
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_little_endian {
    ($($t:ty),*) => {
        $(
            impl LittleEndian for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_little_endian!(i8, i16, i32, u32);

/// u32 を1つ読み込み
#[inline]
pub fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// u32 を1つ書き込み
#[inline]
pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// `out.len()` 個の整数を読み込み
pub fn read_le_slice<R: Read, T: LittleEndian>(reader: &mut R, out: &mut [T]) -> io::Result<()> {
    let mut buf = vec![0u8; out.len() * T::SIZE];
    reader.read_exact(&mut buf)?;
    for (dst, chunk) in out.iter_mut().zip(buf.chunks_exact(T::SIZE)) {
        *dst = T::from_le_slice(chunk);
    }
    Ok(())
}

/// 整数列を書き込み
pub fn write_le_slice<W: Write, T: LittleEndian>(writer: &mut W, values: &[T]) -> io::Result<()> {
    let mut buf = Vec::with_capacity(values.len() * T::SIZE);
    for &v in values {
        v.write_le(&mut buf);
    }
    writer.write_all(&buf)
}

/// ストリームが終端に達しているか（1バイト読めたら false）
pub fn at_eof<R: Read>(reader: &mut R) -> io::Result<bool> {
    let mut trailing = [0u8; 1];
    loop {
        match reader.read(&mut trailing) {
            Ok(0) => return Ok(true),
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_u32_is_little_endian() {
        let mut out = Vec::new();
        write_u32(&mut out, 0x7AF3_2F20).unwrap();
        assert_eq!(out, [0x20, 0x2F, 0xF3, 0x7A]);
        assert_eq!(read_u32(&mut Cursor::new(out)).unwrap(), 0x7AF3_2F20);
    }

    #[test]
    fn test_slice_layout() {
        let mut out = Vec::new();
        write_le_slice(&mut out, &[-2i32, 1]).unwrap();
        assert_eq!(out, [0xFE, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00]);

        let mut back = [0i32; 2];
        read_le_slice(&mut Cursor::new(&out), &mut back).unwrap();
        assert_eq!(back, [-2, 1]);
    }

    #[test]
    fn test_truncated_read_fails() {
        let mut back = [0i32; 2];
        let err = read_le_slice(&mut Cursor::new([0u8; 7]), &mut back).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_at_eof() {
        let mut c = Cursor::new([1u8]);
        assert!(!at_eof(&mut c).unwrap());
        assert!(at_eof(&mut c).unwrap());
    }
}
