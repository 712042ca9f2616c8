//! アキュムレータ更新・評価経路の統計カウンタ
//!
//! `nnue-stats` feature 有効時のみカウントし、無効時はマクロが空になる。
//! Big / Small ネットワークごとに refresh と差分更新の比率を測る。
//!
//! ```bash
//! cargo run --release -p tools --features rchess-core/nnue-stats --bin eval_check -- ...
//! ```

#[cfg(feature = "nnue-stats")]
use std::sync::atomic::{AtomicU64, Ordering};

/// ネットワークのサイズ（Big / Small）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetKind {
    Big = 0,
    Small = 1,
}

#[cfg(feature = "nnue-stats")]
#[derive(Default)]
struct NetCounters {
    refresh: AtomicU64,
    update: AtomicU64,
    forward_update: AtomicU64,
    already_computed: AtomicU64,
    evaluate: AtomicU64,
}

#[cfg(feature = "nnue-stats")]
impl NetCounters {
    const fn new() -> Self {
        Self {
            refresh: AtomicU64::new(0),
            update: AtomicU64::new(0),
            forward_update: AtomicU64::new(0),
            already_computed: AtomicU64::new(0),
            evaluate: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> NetStats {
        NetStats {
            refresh: self.refresh.load(Ordering::Relaxed),
            update: self.update.load(Ordering::Relaxed),
            forward_update: self.forward_update.load(Ordering::Relaxed),
            already_computed: self.already_computed.load(Ordering::Relaxed),
            evaluate: self.evaluate.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for c in [&self.refresh, &self.update, &self.forward_update, &self.already_computed, &self.evaluate]
        {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// 全スレッド共有の統計
#[cfg(feature = "nnue-stats")]
pub struct EvalStats {
    nets: [NetCounters; 2],
    /// 駒割のみで打ち切った評価
    lazy: AtomicU64,
}

#[cfg(feature = "nnue-stats")]
impl EvalStats {
    const fn new() -> Self {
        Self { nets: [NetCounters::new(), NetCounters::new()], lazy: AtomicU64::new(0) }
    }

    #[inline]
    pub fn count_refresh(&self, net: NetKind) {
        self.nets[net as usize].refresh.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_update(&self, net: NetKind) {
        self.nets[net as usize].update.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_forward_update(&self, net: NetKind) {
        self.nets[net as usize].forward_update.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_already_computed(&self, net: NetKind) {
        self.nets[net as usize].already_computed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_evaluate(&self, net: NetKind) {
        self.nets[net as usize].evaluate.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_lazy(&self) {
        self.lazy.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(feature = "nnue-stats")]
pub static EVAL_STATS: EvalStats = EvalStats::new();

/// 1ネットワーク分の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetStats {
    pub refresh: u64,
    /// 直前局面からの1手差分更新
    pub update: u64,
    /// 祖先からの複数手差分更新
    pub forward_update: u64,
    pub already_computed: u64,
    pub evaluate: u64,
}

impl NetStats {
    pub fn total_updates(&self) -> u64 {
        self.refresh + self.update + self.forward_update
    }

    /// refresh 率（%）
    pub fn refresh_rate(&self) -> f64 {
        match self.total_updates() {
            0 => 0.0,
            total => self.refresh as f64 / total as f64 * 100.0,
        }
    }
}

/// 統計スナップショット
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStatsSnapshot {
    pub big: NetStats,
    pub small: NetStats,
    pub lazy: u64,
}

impl EvalStatsSnapshot {
    /// レポートを stderr に出力
    pub fn print_report(&self) {
        eprintln!("=== NNUE Accumulator Stats ===");
        eprintln!("lazy (material only):  {:>12}", self.lazy);
        for (name, s) in [("big", &self.big), ("small", &self.small)] {
            eprintln!("[{name}]");
            eprintln!("  evaluate calls:      {:>12}", s.evaluate);
            eprintln!("  already computed:    {:>12}", s.already_computed);
            eprintln!("  refresh:             {:>12} ({:>5.1}%)", s.refresh, s.refresh_rate());
            eprintln!("  update (1-step):     {:>12}", s.update);
            eprintln!("  forward_update:      {:>12}", s.forward_update);
        }
        eprintln!("==============================");
    }
}

#[cfg(feature = "nnue-stats")]
pub fn reset_eval_stats() {
    for net in &EVAL_STATS.nets {
        net.reset();
    }
    EVAL_STATS.lazy.store(0, Ordering::Relaxed);
}

#[cfg(feature = "nnue-stats")]
pub fn eval_stats() -> EvalStatsSnapshot {
    EvalStatsSnapshot {
        big: EVAL_STATS.nets[0].snapshot(),
        small: EVAL_STATS.nets[1].snapshot(),
        lazy: EVAL_STATS.lazy.load(Ordering::Relaxed),
    }
}

/// 統計カウンタをリセット（no-op）
#[cfg(not(feature = "nnue-stats"))]
#[inline]
pub fn reset_eval_stats() {}

/// 統計スナップショットを取得（常に空）
#[cfg(not(feature = "nnue-stats"))]
#[inline]
pub fn eval_stats() -> EvalStatsSnapshot {
    EvalStatsSnapshot::default()
}

// ============================================================================
// インライン統計カウント用マクロ
// ============================================================================

#[cfg(feature = "nnue-stats")]
macro_rules! count_stat {
    (lazy) => {
        $crate::nnue::stats::EVAL_STATS.count_lazy()
    };
    ($method:ident, $net:expr) => {
        $crate::nnue::stats::EVAL_STATS.$method($net)
    };
}

#[cfg(not(feature = "nnue-stats"))]
macro_rules! count_stat {
    (lazy) => {};
    ($method:ident, $net:expr) => {{
        let _ = $net;
    }};
}

pub(crate) use count_stat;
