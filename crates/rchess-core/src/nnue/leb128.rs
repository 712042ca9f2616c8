//! LEB128（Little Endian Base 128）圧縮ブロック
//!
//! 特徴量変換器のパラメータ（バイアス・重み・PSQT 重み）は、それぞれ次の形式の
//! ブロックとして格納される:
//!
//! ```text
//! "COMPRESSED_LEB128" (17 bytes)
//! u32 LE  後続のバイト数
//! 符号付き LEB128 の値 × N
//! ```
//!
//! 各バイトの下位7ビットがデータ、最上位ビットが継続フラグ。最終バイトの
//! 0x40 ビットが符号ビットとなる。

use std::io::{Read, Write};

use super::constants::LEB128_MAGIC;
use super::error::{NnueError, Result};
use super::io::{read_u32, write_u32};

/// 読み込みバッファのサイズ
const BUF_SIZE: usize = 4096;

/// LEB128 ブロックに格納できる整数型
pub trait Leb128Int: Copy + Into<i64> + TryFrom<i64> {}

impl Leb128Int for i16 {}
impl Leb128Int for i32 {}

/// 圧縮ブロックを `out.len()` 個ぶん読み込む
///
/// マジック不一致、途中終了、型に収まらない値、余剰バイトはいずれもエラー。
pub fn read_leb128_block<R: Read, T: Leb128Int>(reader: &mut R, out: &mut [T]) -> Result<()> {
    let mut magic = [0u8; LEB128_MAGIC.len()];
    reader.read_exact(&mut magic)?;
    if &magic != LEB128_MAGIC {
        return Err(NnueError::Leb128Magic);
    }

    let mut bytes_left = read_u32(reader)?;
    let mut buf = [0u8; BUF_SIZE];
    let mut buf_pos = BUF_SIZE;
    let mut buf_len = BUF_SIZE;

    for dst in out.iter_mut() {
        let mut result: i64 = 0;
        let mut shift = 0u32;
        loop {
            if buf_pos == buf_len {
                if bytes_left == 0 {
                    return Err(NnueError::Leb128Truncated);
                }
                buf_len = (bytes_left as usize).min(BUF_SIZE);
                reader.read_exact(&mut buf[..buf_len])?;
                buf_pos = 0;
            }
            let byte = buf[buf_pos];
            buf_pos += 1;
            bytes_left -= 1;

            if shift >= 64 {
                return Err(NnueError::Leb128Overflow(result));
            }
            result |= i64::from(byte & 0x7f) << shift;
            shift += 7;

            if byte & 0x80 == 0 {
                // 符号拡張
                if shift < 64 && byte & 0x40 != 0 {
                    result |= !0i64 << shift;
                }
                break;
            }
        }
        *dst = T::try_from(result).map_err(|_| NnueError::Leb128Overflow(result))?;
    }

    // 未読のバイト（バッファ内 + ストリーム上）が残っていないこと
    if bytes_left != 0 {
        return Err(NnueError::Leb128Length { remaining: bytes_left });
    }
    Ok(())
}

/// 値列を圧縮ブロックとして書き込む
pub fn write_leb128_block<W: Write, T: Leb128Int>(writer: &mut W, values: &[T]) -> Result<()> {
    let mut encoded = Vec::with_capacity(values.len() * 2);
    for &v in values {
        encode_signed(v.into(), &mut encoded);
    }
    let byte_count = u32::try_from(encoded.len()).map_err(|_| {
        NnueError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "LEB128 block exceeds 4 GiB",
        ))
    })?;

    writer.write_all(LEB128_MAGIC)?;
    write_u32(writer, byte_count)?;
    writer.write_all(&encoded)?;
    Ok(())
}

/// 1値を符号付き LEB128 でエンコード
#[inline]
fn encode_signed(mut value: i64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = if byte & 0x40 == 0 { value == 0 } else { value == -1 };
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// ブロックのヘッダ + 任意のペイロード
    fn block(payload: &[u8], declared: u32) -> Vec<u8> {
        let mut data = LEB128_MAGIC.to_vec();
        data.extend_from_slice(&declared.to_le_bytes());
        data.extend_from_slice(payload);
        data
    }

    fn encode(v: i64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_signed(v, &mut out);
        out
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(1), [0x01]);
        assert_eq!(encode(63), [0x3F]);
        assert_eq!(encode(64), [0xC0, 0x00]);
        assert_eq!(encode(127), [0xFF, 0x00]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(-1), [0x7F]);
        assert_eq!(encode(-64), [0x40]);
        assert_eq!(encode(-65), [0xBF, 0x7F]);
        assert_eq!(encode(-128), [0x80, 0x7F]);
        assert_eq!(encode(i16::MAX as i64), [0xFF, 0xFF, 0x01]);
        assert_eq!(encode(i16::MIN as i64), [0x80, 0x80, 0x7E]);
    }

    #[test]
    fn test_read_block_stream() {
        // 0, -1, 128
        let data = block(&[0x00, 0x7F, 0x80, 0x01], 4);
        let mut out = [7i16; 3];
        read_leb128_block(&mut Cursor::new(data), &mut out).unwrap();
        assert_eq!(out, [0, -1, 128]);
    }

    #[test]
    fn test_block_round_trip_extremes() {
        let values = [i32::MIN, -65, -1, 0, 1, 64, i32::MAX];
        let mut data = Vec::new();
        write_leb128_block(&mut data, &values).unwrap();

        let mut back = [0i32; 7];
        read_leb128_block(&mut Cursor::new(data), &mut back).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_read_spans_buffer_boundary() {
        // 1値 3 バイト × 2000 でバッファ境界をまたぐ
        let values: Vec<i16> = (0..2000).map(|i| if i % 2 == 0 { i16::MAX } else { i16::MIN }).collect();
        let mut data = Vec::new();
        write_leb128_block(&mut data, &values).unwrap();

        let mut back = vec![0i16; values.len()];
        read_leb128_block(&mut Cursor::new(data), &mut back).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = block(&[0x00], 1);
        data[0] = b'X';
        let mut out = [0i16; 1];
        assert!(matches!(
            read_leb128_block(&mut Cursor::new(data), &mut out),
            Err(NnueError::Leb128Magic)
        ));
    }

    #[test]
    fn test_leftover_bytes() {
        let data = block(&[0x01, 0x02], 2);
        let mut out = [0i16; 1];
        assert!(matches!(
            read_leb128_block(&mut Cursor::new(data), &mut out),
            Err(NnueError::Leb128Length { remaining: 1 })
        ));
    }

    #[test]
    fn test_declared_count_too_small() {
        let data = block(&[0x01, 0x02], 1);
        let mut out = [0i16; 2];
        assert!(matches!(
            read_leb128_block(&mut Cursor::new(data), &mut out),
            Err(NnueError::Leb128Truncated)
        ));
    }

    #[test]
    fn test_stream_shorter_than_declared() {
        let data = block(&[0x01], 5);
        let mut out = [0i16; 2];
        assert!(matches!(read_leb128_block(&mut Cursor::new(data), &mut out), Err(NnueError::Io(_))));
    }

    #[test]
    fn test_value_out_of_i16_range() {
        // 32768
        let data = block(&[0x80, 0x80, 0x02], 3);
        let mut out = [0i16; 1];
        assert!(matches!(
            read_leb128_block(&mut Cursor::new(data), &mut out),
            Err(NnueError::Leb128Overflow(32768))
        ));
    }
}
