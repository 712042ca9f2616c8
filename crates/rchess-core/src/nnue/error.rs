//! NNUE のエラー型

use std::io;

/// ネットワークファイルの読み書き・レジストリ操作のエラー
#[derive(thiserror::Error, Debug)]
pub enum NnueError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// ファイル先頭のバージョンが一致しない
    #[error("Unsupported network version: expected {expected:#010x}, got {found:#010x}")]
    VersionMismatch { expected: u32, found: u32 },

    /// アーキテクチャハッシュが一致しない
    #[error("{section} hash mismatch: expected {expected:#010x}, got {found:#010x}")]
    HashMismatch { section: &'static str, expected: u32, found: u32 },

    /// 説明文字列が長すぎる
    #[error("Invalid description length: {0}")]
    DescriptionTooLong(usize),

    /// LEB128 ブロックのマジック文字列が不正
    #[error("Invalid LEB128 block magic")]
    Leb128Magic,

    /// LEB128 ブロックのバイト数と実際の値の数が合わない
    #[error("LEB128 block length mismatch: {remaining} bytes left over")]
    Leb128Length { remaining: u32 },

    /// バイト数を使い切る前に値が終わらなかった
    #[error("LEB128 block truncated")]
    Leb128Truncated,

    /// 値が格納先の型に収まらない
    #[error("LEB128 value out of range: {0}")]
    Leb128Overflow(i64),

    /// パラメータの後ろに余分なバイトがある
    #[error("Trailing bytes after network parameters")]
    TrailingBytes,

    /// ネットワークが読み込まれていない
    #[error("Network is not loaded: {0}")]
    NotLoaded(String),

    /// 既定以外のネットワークをファイル名なしで保存しようとした
    #[error("Failed to export a net: a non-embedded net can only be saved if the filename is specified")]
    NoFileName,

    /// 設定ファイルのエラー
    #[error("Config error: {0}")]
    Config(String),
}

impl NnueError {
    /// 書式不正（バージョン・ハッシュ・圧縮ブロック・余剰バイト）かどうか
    pub fn is_format_error(&self) -> bool {
        !matches!(self, NnueError::NotLoaded(_) | NnueError::NoFileName | NnueError::Config(_))
            && !matches!(self, NnueError::Io(e) if e.kind() != io::ErrorKind::UnexpectedEof)
    }
}

pub type Result<T> = std::result::Result<T, NnueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_classification() {
        assert!(NnueError::TrailingBytes.is_format_error());
        assert!(NnueError::Leb128Magic.is_format_error());
        assert!(NnueError::Io(io::Error::from(io::ErrorKind::UnexpectedEof)).is_format_error());
        assert!(!NnueError::Io(io::Error::from(io::ErrorKind::NotFound)).is_format_error());
        assert!(!NnueError::NoFileName.is_format_error());
    }

    #[test]
    fn test_display_hash_mismatch() {
        let err = NnueError::HashMismatch { section: "Feature transformer", expected: 1, found: 2 };
        assert_eq!(
            err.to_string(),
            "Feature transformer hash mismatch: expected 0x00000001, got 0x00000002"
        );
    }
}
