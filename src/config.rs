// =============================================================================
// Runtime Configuration — tunables from spec §6.4, with atomic save
// =============================================================================
//
// Every tunable the system exposes lives here. Persistence uses the same
// atomic tmp + rename pattern used throughout this codebase's state files:
// write to a temporary sibling, fsync, rename over the target, so a crash
// mid-write never corrupts the config on disk.
//
// All fields carry `#[serde(default = "...")]` so that adding a field never
// breaks loading an older config file.
// =============================================================================

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── default-value helpers (required by serde `default = "..."`) ───────────

fn d_scan_interval() -> u64 {
    45
}
fn d_monitor_interval() -> u64 {
    30
}
fn d_buyer_interval() -> u64 {
    15
}
fn d_seller_interval() -> u64 {
    15
}
fn d_hot_check_interval() -> u64 {
    5
}
fn d_watchlist_size() -> usize {
    25
}
fn d_base_universe_size() -> usize {
    500
}
fn d_min_gap_pct() -> f64 {
    0.03
}
fn d_min_premarket_volume() -> f64 {
    50_000.0
}
fn d_min_premarket_rel_volume() -> f64 {
    2.0
}
fn d_price_min() -> f64 {
    2.0
}
fn d_price_max() -> f64 {
    50.0
}
fn d_min_entry_score() -> f64 {
    60.0
}
fn d_min_breakout_pct() -> f64 {
    0.01
}
fn d_min_relative_volume() -> f64 {
    2.0
}
fn d_rsi_min() -> f64 {
    40.0
}
fn d_rsi_max() -> f64 {
    75.0
}
fn d_true() -> bool {
    true
}
fn d_signal_max_age_seconds() -> i64 {
    60
}
fn d_max_slippage_pct() -> f64 {
    0.02
}
fn d_max_spread_pct() -> f64 {
    0.02
}
fn d_limit_order_buffer() -> f64 {
    0.005
}
fn d_max_positions() -> usize {
    20
}
fn d_stop_loss_pct() -> f64 {
    0.025
}
fn d_breakeven_profit() -> f64 {
    0.05
}
fn d_decel_exit_threshold() -> f64 {
    0.5
}
fn d_min_profit_for_decel_check() -> f64 {
    0.05
}
fn d_cooldown_minutes() -> i64 {
    15
}
fn d_api_rate_limit() -> u32 {
    200
}
fn d_eod_liquidation_minutes() -> i64 {
    5
}
fn d_order_poll_timeout_seconds() -> u64 {
    30
}
fn d_order_poll_interval_seconds() -> u64 {
    1
}
fn d_lock_timeout_seconds() -> u64 {
    5
}

/// Tier table: `(min_score, position_pct)` in ascending score order, per
/// spec §4.3. Not a config field (the tier boundaries are spec-fixed), kept
/// here as a shared constant.
pub const POSITION_SIZE_TIERS: &[(f64, f64)] = &[(95.0, 0.10), (85.0, 0.07), (60.0, 0.05)];

/// Tiered trailing-stop table from spec §4.4: `(min_profit_pct, trail_pct)`
/// in descending profit order so the first match wins.
pub const TRAILING_STOP_TIERS: &[(f64, f64)] = &[
    (0.20, 0.05),
    (0.15, 0.04),
    (0.10, 0.03),
    (0.05, 0.02),
];

/// Top-level runtime configuration. Every field has a serde default so older
/// JSON files missing new fields still deserialize correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "d_scan_interval")]
    pub scan_interval_seconds: u64,
    #[serde(default = "d_monitor_interval")]
    pub monitor_interval_seconds: u64,
    #[serde(default = "d_buyer_interval")]
    pub buyer_interval_seconds: u64,
    #[serde(default = "d_seller_interval")]
    pub seller_interval_seconds: u64,
    #[serde(default = "d_hot_check_interval")]
    pub hot_check_interval_seconds: u64,

    #[serde(default = "d_watchlist_size")]
    pub daily_watchlist_size: usize,
    #[serde(default = "d_base_universe_size")]
    pub base_universe_size: usize,

    #[serde(default = "d_min_gap_pct")]
    pub min_gap_pct: f64,
    #[serde(default = "d_min_premarket_volume")]
    pub min_premarket_volume: f64,
    #[serde(default = "d_min_premarket_rel_volume")]
    pub min_premarket_rel_volume: f64,
    #[serde(default = "d_price_min")]
    pub price_min: f64,
    #[serde(default = "d_price_max")]
    pub price_max: f64,

    #[serde(default = "d_min_entry_score")]
    pub min_entry_score: f64,
    #[serde(default = "d_min_breakout_pct")]
    pub min_breakout_pct: f64,
    #[serde(default = "d_min_relative_volume")]
    pub min_relative_volume: f64,
    #[serde(default = "d_rsi_min")]
    pub rsi_min: f64,
    #[serde(default = "d_rsi_max")]
    pub rsi_max: f64,
    #[serde(default = "d_true")]
    pub require_above_vwap: bool,

    #[serde(default = "d_signal_max_age_seconds")]
    pub signal_max_age_seconds: i64,
    #[serde(default = "d_max_slippage_pct")]
    pub max_slippage_pct: f64,
    #[serde(default = "d_max_spread_pct")]
    pub max_spread_pct: f64,
    #[serde(default = "d_true")]
    pub use_limit_orders: bool,
    #[serde(default = "d_limit_order_buffer")]
    pub limit_order_buffer: f64,

    #[serde(default = "d_max_positions")]
    pub max_positions: usize,

    #[serde(default = "d_stop_loss_pct")]
    pub stop_loss_pct: f64,
    #[serde(default = "d_breakeven_profit")]
    pub breakeven_profit: f64,
    #[serde(default = "d_decel_exit_threshold")]
    pub decel_exit_threshold: f64,
    #[serde(default = "d_min_profit_for_decel_check")]
    pub min_profit_for_decel_check: f64,

    #[serde(default = "d_cooldown_minutes")]
    pub cooldown_minutes: i64,
    #[serde(default = "d_api_rate_limit")]
    pub api_rate_limit: u32,

    #[serde(default = "d_eod_liquidation_minutes")]
    pub eod_liquidation_minutes: i64,

    #[serde(default = "d_order_poll_timeout_seconds")]
    pub order_poll_timeout_seconds: u64,
    #[serde(default = "d_order_poll_interval_seconds")]
    pub order_poll_interval_seconds: u64,

    #[serde(default = "d_lock_timeout_seconds")]
    pub lock_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_interval_seconds: d_scan_interval(),
            monitor_interval_seconds: d_monitor_interval(),
            buyer_interval_seconds: d_buyer_interval(),
            seller_interval_seconds: d_seller_interval(),
            hot_check_interval_seconds: d_hot_check_interval(),
            daily_watchlist_size: d_watchlist_size(),
            base_universe_size: d_base_universe_size(),
            min_gap_pct: d_min_gap_pct(),
            min_premarket_volume: d_min_premarket_volume(),
            min_premarket_rel_volume: d_min_premarket_rel_volume(),
            price_min: d_price_min(),
            price_max: d_price_max(),
            min_entry_score: d_min_entry_score(),
            min_breakout_pct: d_min_breakout_pct(),
            min_relative_volume: d_min_relative_volume(),
            rsi_min: d_rsi_min(),
            rsi_max: d_rsi_max(),
            require_above_vwap: d_true(),
            signal_max_age_seconds: d_signal_max_age_seconds(),
            max_slippage_pct: d_max_slippage_pct(),
            max_spread_pct: d_max_spread_pct(),
            use_limit_orders: d_true(),
            limit_order_buffer: d_limit_order_buffer(),
            max_positions: d_max_positions(),
            stop_loss_pct: d_stop_loss_pct(),
            breakeven_profit: d_breakeven_profit(),
            decel_exit_threshold: d_decel_exit_threshold(),
            min_profit_for_decel_check: d_min_profit_for_decel_check(),
            cooldown_minutes: d_cooldown_minutes(),
            api_rate_limit: d_api_rate_limit(),
            eod_liquidation_minutes: d_eod_liquidation_minutes(),
            order_poll_timeout_seconds: d_order_poll_timeout_seconds(),
            order_poll_interval_seconds: d_order_poll_interval_seconds(),
            lock_timeout_seconds: d_lock_timeout_seconds(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults (with a warning) if the
    /// file is absent or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, path = %path.as_ref().display(), "failed to load config, using defaults");
                Self::default()
            }
        }
    }

    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(cfg)
    }

    /// Persist atomically: write to `<path>.tmp`, fsync, rename over `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(&tmp_path)
            .with_context(|| format!("failed to create {}", tmp_path.display()))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "config saved (atomic)");
        Ok(())
    }

    /// Position-size percentage of equity for a given entry score, per the
    /// §4.3 tier table (60-84 => 5%, 85-94 => 7%, 95+ => 10%).
    pub fn position_size_pct(score: f64) -> f64 {
        for &(min_score, pct) in POSITION_SIZE_TIERS {
            if score >= min_score {
                return pct;
            }
        }
        0.0
    }

    /// Trailing-stop percentage below peak for a given unrealized profit
    /// fraction, per the §4.4 tier table. Returns `None` if profit is below
    /// the lowest tier (5%) — the break-even ratchet may still apply.
    pub fn trailing_stop_pct(profit_pct: f64) -> Option<f64> {
        for &(min_profit, trail_pct) in TRAILING_STOP_TIERS {
            if profit_pct >= min_profit {
                return Some(trail_pct);
            }
        }
        None
    }
}
