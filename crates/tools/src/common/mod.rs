//! ツール共通の初期化処理

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use rchess_core::config::EvalConfig;
use rchess_core::nnue::{ModelRegistry, NetKind, Networks};
use rchess_core::position::{Move, Position};

/// コマンドラインで指定するネットワークのサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetSizeArg {
    Big,
    Small,
}

impl From<NetSizeArg> for NetKind {
    fn from(size: NetSizeArg) -> Self {
        match size {
            NetSizeArg::Big => NetKind::Big,
            NetSizeArg::Small => NetKind::Small,
        }
    }
}

/// 設定ファイルの項目を上書きするオプション
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Big ネットワークのファイル名
    #[arg(long)]
    pub eval_file: Option<String>,

    /// ネットワークを探す追加のディレクトリ
    #[arg(long)]
    pub nnue_directory: Option<PathBuf>,

    /// 駒割重視度 [-12, 12]
    #[arg(long, allow_hyphen_values = true)]
    pub materialistic_strategy: Option<i32>,

    /// 位置重視度 [-12, 12]
    #[arg(long, allow_hyphen_values = true)]
    pub positional_strategy: Option<i32>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: EvalConfig) -> EvalConfig {
        if let Some(eval_file) = &self.eval_file {
            config.eval_file = eval_file.clone();
        }
        if let Some(dir) = &self.nnue_directory {
            config.nnue_directory = Some(dir.clone());
        }
        if let Some(v) = self.materialistic_strategy {
            config.materialistic_strategy = v;
        }
        if let Some(v) = self.positional_strategy {
            config.positional_strategy = v;
        }
        config.clamped()
    }
}

/// ログを stderr に出す（既定レベル info、`RUST_LOG` で上書き）
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
}

/// 設定ファイルを読み（省略時は既定値）、コマンドラインの指定で上書きする
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<EvalConfig> {
    let config = match path {
        Some(path) => EvalConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EvalConfig::default(),
    };
    Ok(overrides.apply(config))
}

/// 設定どおりにネットワークを読み込み、両サイズが揃っているか確認する
pub fn load_networks(config: &EvalConfig) -> Result<(ModelRegistry, Networks)> {
    let mut registry = ModelRegistry::new();
    registry.init(config);
    registry.verify(config).context("network verification failed")?;
    let networks = registry.networks()?;
    Ok((registry, networks))
}

/// FEN（省略時は初期局面）から UCI 形式の指し手を進めた局面
pub fn position_from_args(fen: Option<&str>, moves: &[String]) -> Result<Position> {
    let mut pos = match fen {
        Some(fen) => Position::from_fen(fen).with_context(|| format!("invalid FEN: {fen}"))?,
        None => Position::startpos(),
    };
    for text in moves {
        let m = Move::from_uci(&pos, text).with_context(|| format!("illegal move: {text}"))?;
        pos.do_move(m);
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_args() {
        let moves = vec!["e2e4".to_string(), "e7e5".to_string()];
        let pos = position_from_args(None, &moves).unwrap();
        assert_eq!(pos.to_fen(), "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2");

        assert!(position_from_args(None, &["e2e5".to_string()]).is_err());
        assert!(position_from_args(Some("not a fen"), &[]).is_err());
    }

    #[test]
    fn test_load_config_default() {
        let config = load_config(None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config, EvalConfig::default());
    }

    #[test]
    fn test_overrides_are_clamped() {
        let overrides = ConfigOverrides {
            eval_file: Some("custom.nnue".to_string()),
            materialistic_strategy: Some(-40),
            positional_strategy: Some(5),
            ..Default::default()
        };
        let config = overrides.apply(EvalConfig::default());
        assert_eq!(config.eval_file, "custom.nnue");
        assert_eq!(config.materialistic_strategy, -12);
        assert_eq!(config.positional_strategy, 5);
        assert_eq!(config.nnue_directory, None);
    }

    #[test]
    fn test_net_size_arg() {
        assert_eq!(NetKind::from(NetSizeArg::Small), NetKind::Small);
        assert_eq!(NetSizeArg::from_str("big", true).unwrap(), NetSizeArg::Big);
    }
}
