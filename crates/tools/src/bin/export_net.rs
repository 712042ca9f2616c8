//! ネットワークの書き出し
//!
//! 設定どおりに読み込んだネットワーク（または `--input` で指定したファイル）を
//! 同じ形式で書き出す。出力先を省略できるのは既定名のネットワークのみ。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use rchess_core::nnue::{ModelRegistry, NetKind};
use tools::common::{ConfigOverrides, NetSizeArg, init_logger, load_config};

#[derive(Parser, Debug)]
#[command(name = "export_net")]
#[command(about = "読み込んだネットワークをファイルに書き出す")]
struct Cli {
    /// 設定ファイル（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// 書き出すネットワークのサイズ
    #[arg(long, value_enum, default_value_t = NetSizeArg::Big)]
    size: NetSizeArg,

    /// 設定の代わりに直接読み込むファイル
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 出力ファイル（省略時は既定名で作業ディレクトリへ）
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_input(registry: &mut ModelRegistry, path: &Path, size: NetKind) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid input path: {}", path.display()))?;
    if !registry.load_eval_file(name, path, size) {
        bail!("failed to load {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();
    let size = NetKind::from(cli.size);

    let mut registry = ModelRegistry::new();
    match &cli.input {
        Some(path) => load_input(&mut registry, path, size)?,
        None => {
            let config = load_config(cli.config.as_deref(), &cli.overrides)?;
            registry.init(&config);
        }
    }

    let Some(name) = registry.current_file_name(size) else {
        bail!("{size:?} network is not loaded");
    };
    info!("Exporting {name}: {}", registry.description(size).unwrap_or(""));

    if !registry.save_eval_file(cli.output.as_deref(), size) {
        bail!("failed to export the {size:?} network");
    }
    Ok(())
}
