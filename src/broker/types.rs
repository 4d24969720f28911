// =============================================================================
// Broker-agnostic types for the trading client interface (spec §6.1)
// =============================================================================

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Market clock, as reported by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    pub is_open: bool,
    pub next_open: chrono::DateTime<chrono::Utc>,
    pub next_close: chrono::DateTime<chrono::Utc>,
}

/// Account equity/cash snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub equity: f64,
    pub cash: f64,
}

/// One broker-side open position, as returned by `list_positions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: String,
    pub qty: f64,
    pub avg_entry_price: f64,
}

/// Top-of-book bid/ask for a symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn is_valid(&self) -> bool {
        self.bid > 0.0 && self.ask > 0.0 && self.ask >= self.bid
    }
}

/// Bar timeframe accepted by `get_bars` (spec §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    OneMin,
    TwoMin,
    FiveMin,
    OneDay,
}

impl Timeframe {
    /// Alpaca's wire representation, e.g. `"1Min"`, `"5Min"`, `"1Day"`.
    pub fn as_alpaca_str(&self) -> &'static str {
        match self {
            Self::OneMin => "1Min",
            Self::TwoMin => "2Min",
            Self::FiveMin => "5Min",
            Self::OneDay => "1Day",
        }
    }
}

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bar {
    pub t: chrono::DateTime<chrono::Utc>,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: i64,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub limit_price: Option<f64>,
}

impl OrderRequest {
    pub fn day_limit_buy(symbol: impl Into<String>, qty: i64, limit_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            qty,
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Day,
            limit_price: Some(limit_price),
        }
    }

    pub fn day_market_sell(symbol: impl Into<String>, qty: i64) -> Self {
        Self {
            symbol: symbol.into(),
            qty,
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            limit_price: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Expired,
    Rejected,
    PendingCancel,
    Other,
}

impl OrderStatus {
    pub fn from_alpaca_str(s: &str) -> Self {
        match s {
            "new" | "accepted" | "pending_new" => Self::New,
            "partially_filled" => Self::PartiallyFilled,
            "filled" => Self::Filled,
            "canceled" => Self::Canceled,
            "expired" => Self::Expired,
            "rejected" => Self::Rejected,
            "pending_cancel" => Self::PendingCancel,
            _ => Self::Other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Expired | Self::Rejected
        )
    }
}

/// Status of a submitted order, as polled via `get_order` (spec §4.6).
#[derive(Debug, Clone)]
pub struct OrderStatusReport {
    pub order_id: String,
    pub status: OrderStatus,
    pub filled_qty: f64,
    pub filled_avg_price: Option<f64>,
}

pub(crate) fn parse_decimal_str(s: &str) -> f64 {
    f64::from_str(s).unwrap_or(0.0)
}
