// =============================================================================
// Shared domain types — the entities of spec §3
// =============================================================================

use serde::{Deserialize, Serialize};

/// One entry in the 25-symbol `DailyWatchlist` produced by PreMarketScanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyWatchlistEntry {
    pub symbol: String,
    pub rank: u32,
    pub prior_close: f64,
    pub premarket_price: f64,
    pub premarket_high: f64,
    pub premarket_volume: f64,
    pub gap_pct: f64,
    pub relative_volume: f64,
    pub score: f64,
}

/// The full daily watchlist, keyed by trading date (`YYYY-MM-DD`, exchange
/// local date) so the Scanner can tell a stale file from today's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyWatchlist {
    pub date: String,
    pub entries: Vec<DailyWatchlistEntry>,
}

/// Where a breakout percentage was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutRef {
    PremarketHigh,
    SessionHigh,
    PriorClose,
}

impl std::fmt::Display for BreakoutRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PremarketHigh => write!(f, "premarket_high"),
            Self::SessionHigh => write!(f, "session_high"),
            Self::PriorClose => write!(f, "prior_close"),
        }
    }
}

/// An entry signal emitted by the Scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    /// Unix epoch seconds (wall clock) when the signal was computed.
    pub timestamp: i64,
    pub price: f64,
    pub score: f64,
    pub vwap: f64,
    pub rsi: f64,
    pub breakout_pct: f64,
    pub breakout_ref: BreakoutRef,
    pub relative_volume: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub premarket_high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gap_pct: Option<f64>,
}

/// An open position, created by the Buyer on fill and mutated by the
/// Monitor (stop ratchet only — entry fields never change after creation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub quantity: i64,
    /// Unix epoch seconds of the fill.
    pub entry_time: i64,
    pub current_stop: f64,
    pub peak_price: f64,
    pub signal_score: f64,
    pub signal_price: f64,
    pub vwap_at_entry: f64,
    pub rsi_at_entry: f64,
    pub breakout_pct: f64,
}

/// Reason an exit was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    Deceleration,
    Eod,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopLoss => write!(f, "stop_loss"),
            Self::TrailingStop => write!(f, "trailing_stop"),
            Self::Deceleration => write!(f, "deceleration"),
            Self::Eod => write!(f, "eod"),
        }
    }
}

/// An exit signal emitted by the Monitor, consumed by the Seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellSignal {
    pub symbol: String,
    pub timestamp: i64,
    pub reason: ExitReason,
    pub trigger_price: f64,
}

/// A completed round-trip trade. `trades.json` is append-only; no `Trade` is
/// ever modified after being written (spec invariant 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: i64,
    pub pnl_pct: f64,
    pub pnl_dollars: f64,
    pub reason: ExitReason,
    pub signal_score: f64,
}

/// A symbol's cooldown window after an exit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cooldown {
    /// Unix epoch seconds after which the symbol may be bought again.
    pub until: i64,
}

/// Per-service lifecycle state, as tracked by the Orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Crashed,
    Stopping,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Crashed => "crashed",
            Self::Stopping => "stopping",
        };
        write!(f, "{s}")
    }
}

/// Status of a single supervised service, as reported by `orchestrator
/// status` and served by `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub state: ServiceState,
    pub pid: Option<u32>,
    pub heartbeat_age_seconds: Option<i64>,
    pub restart_count: u32,
}

/// Whole-engine status snapshot written by the Orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub generated_at: i64,
    pub services: Vec<ServiceStatus>,
}

pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Millisecond-precision wall clock, used by the rate limiter's refill math
/// where whole-second resolution would under-count a fast-draining bucket.
pub fn now_unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
