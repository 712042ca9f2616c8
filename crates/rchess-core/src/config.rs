//! 評価関数の設定
//!
//! TOML ファイルから読み込む。全項目が省略可能で、省略時は既定値。
//!
//! ```toml
//! eval_file = "nn-0000000000a0.nnue"
//! nnue_directory = "/usr/share/rchess"
//! materialistic_strategy = 0
//! positional_strategy = 0
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::nnue::{EVAL_FILE_DEFAULT_NAME_BIG, NnueError};

/// 評価戦略の絶対値の上限
pub const STRATEGY_LIMIT: i32 = 12;

/// 評価関数の設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    /// Big ネットワークのファイル名（空なら既定名）
    pub eval_file: String,
    /// 追加の探索ディレクトリ
    pub nnue_directory: Option<PathBuf>,
    /// 駒割重視度 [-12, 12]
    pub materialistic_strategy: i32,
    /// 位置重視度 [-12, 12]
    pub positional_strategy: i32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            eval_file: EVAL_FILE_DEFAULT_NAME_BIG.to_string(),
            nnue_directory: None,
            materialistic_strategy: 0,
            positional_strategy: 0,
        }
    }
}

impl EvalConfig {
    /// TOML 文字列から読み込み（戦略値は範囲内に丸める）
    pub fn from_toml_str(text: &str) -> Result<Self, NnueError> {
        let config: EvalConfig =
            toml::from_str(text).map_err(|e| NnueError::Config(e.message().to_string()))?;
        Ok(config.clamped())
    }

    /// TOML ファイルから読み込み
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NnueError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| NnueError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// 戦略値を `[-STRATEGY_LIMIT, STRATEGY_LIMIT]` に丸める
    pub fn clamped(mut self) -> Self {
        self.materialistic_strategy =
            self.materialistic_strategy.clamp(-STRATEGY_LIMIT, STRATEGY_LIMIT);
        self.positional_strategy = self.positional_strategy.clamp(-STRATEGY_LIMIT, STRATEGY_LIMIT);
        self
    }

    /// 読み込むべき Big ネットワークのファイル名
    pub fn big_file_name(&self) -> &str {
        if self.eval_file.is_empty() { EVAL_FILE_DEFAULT_NAME_BIG } else { &self.eval_file }
    }
}
