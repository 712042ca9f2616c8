//! ランダム対局による評価関数の点検
//!
//! ランダムな合法手で対局を進め、王手でない局面をすべて差分更新で評価する。
//! `--verify` を付けると、毎回アキュムレータを作り直した評価値と突き合わせる。
//! 評価値がテーブルベース用の予約帯に入った場合や不一致があった場合は失敗する。
//!
//! ```bash
//! cargo run --release -p tools --features nnue-stats --bin eval_check -- --games 200 --verify
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::Parser;
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rchess_core::eval::evaluate;
use rchess_core::nnue::{Evaluator, Strategies, eval_stats, reset_eval_stats};
use rchess_core::position::Move;
use tools::common::{ConfigOverrides, init_logger, load_config, load_networks, position_from_args};

#[derive(Parser, Debug)]
#[command(name = "eval_check")]
#[command(about = "ランダム対局の局面を評価して値域と差分更新を点検する")]
struct Cli {
    /// 設定ファイル（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// 開始局面（省略時は初期局面）
    #[arg(long)]
    fen: Option<String>,

    /// 対局数
    #[arg(long, default_value_t = 100)]
    games: usize,

    /// 1局の最大手数
    #[arg(long, default_value_t = 200)]
    max_plies: usize,

    /// 乱数シード
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// 全計算の評価値と比較する
    #[arg(long, default_value_t = false)]
    verify: bool,
}

#[derive(Debug, Default)]
struct Summary {
    positions: u64,
    mismatches: u64,
    min: i32,
    max: i32,
    sum: i64,
}

impl Summary {
    fn record(&mut self, v: i32) {
        if self.positions == 0 {
            self.min = v;
            self.max = v;
        }
        self.positions += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.sum += i64::from(v);
    }

    fn mean(&self) -> f64 {
        match self.positions {
            0 => 0.0,
            n => self.sum as f64 / n as f64,
        }
    }
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), &cli.overrides)?;
    let (_registry, networks) = load_networks(&config)?;
    let strategies = Strategies::from_config(&config);
    let root = position_from_args(cli.fen.as_deref(), &[])?;

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(cli.seed);
    let mut evaluator = Evaluator::new(networks.clone()).with_strategies(strategies);
    let mut summary = Summary::default();
    reset_eval_stats();
    let start = Instant::now();

    for game in 0..cli.games {
        let mut pos = root.clone();
        evaluator.reset();
        let mut played: Vec<Move> = Vec::new();

        for _ in 0..cli.max_plies {
            let moves = pos.legal_moves();
            if moves.is_empty() {
                break;
            }
            let m = moves[rng.random_range(0..moves.len())];
            evaluator.do_move(&mut pos, m);
            played.push(m);
            if pos.in_check() {
                continue;
            }

            let v = evaluate(&pos, &mut evaluator);
            if v.is_reserved() {
                bail!("evaluation {} is in the reserved range at {}", v.raw(), pos.to_fen());
            }
            if cli.verify {
                let fresh =
                    evaluate(&pos, &mut Evaluator::new(networks.clone()).with_strategies(strategies));
                if fresh != v {
                    warn!("mismatch at {}: incremental {} / fresh {}", pos.to_fen(), v.raw(), fresh.raw());
                    summary.mismatches += 1;
                }
            }
            summary.record(v.raw());
        }

        while let Some(m) = played.pop() {
            evaluator.undo_move(&mut pos, m);
        }
        if (game + 1) % 10 == 0 {
            info!("{}/{} games, {} positions", game + 1, cli.games, summary.positions);
        }
    }

    let elapsed = start.elapsed();
    eprintln!("=== eval_check ===");
    eprintln!("positions:  {:>12}", summary.positions);
    eprintln!("min / max:  {:>6} / {}", summary.min, summary.max);
    eprintln!("mean:       {:>12.1}", summary.mean());
    eprintln!(
        "speed:      {:>12.0} evals/s",
        summary.positions as f64 / elapsed.as_secs_f64().max(1e-9)
    );
    if cfg!(feature = "nnue-stats") {
        eval_stats().print_report();
    }

    if summary.mismatches > 0 {
        bail!("{} positions differ from a fresh evaluation", summary.mismatches);
    }
    Ok(())
}
