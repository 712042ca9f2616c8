//! 評価値の内訳表示
//!
//! 駒ごとの寄与、バケットごとの PSQT・ネットワーク成分、最終評価値を白視点で表示する。
//!
//! ```bash
//! cargo run --release -p tools --bin eval_trace -- \
//!   --config eval.toml --fen "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3"
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::error;
use rchess_core::eval::trace;
use rchess_core::nnue::{Evaluator, Strategies};
use tools::common::{ConfigOverrides, init_logger, load_config, load_networks, position_from_args};

#[derive(Parser, Debug)]
#[command(name = "eval_trace")]
#[command(about = "局面の評価値の内訳を表示する")]
struct Cli {
    /// 設定ファイル（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// 局面（省略時は初期局面）
    #[arg(long)]
    fen: Option<String>,

    /// 局面から進める指し手（UCI 形式）
    #[arg(long, num_args = 1..)]
    moves: Vec<String>,
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), &cli.overrides)?;
    let (_registry, networks) = load_networks(&config)?;
    let pos = position_from_args(cli.fen.as_deref(), &cli.moves)?;

    let mut evaluator = Evaluator::new(networks).with_strategies(Strategies::from_config(&config));
    println!("{}", pos.to_fen());
    print!("{}", trace(&pos, &mut evaluator));
    Ok(())
}

fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
