// =============================================================================
// Broker trading client — the narrow interface the core depends on (§6.1)
// =============================================================================

pub mod alpaca;
pub mod rate_limit;
pub mod types;

use async_trait::async_trait;

pub use alpaca::AlpacaClient;
pub use rate_limit::RateLimiter;
pub use types::{
    Account, Bar, BrokerPosition, Clock, OrderRequest, OrderStatus, OrderStatusReport, Quote,
    Timeframe,
};

/// The broker is consumed exclusively through this trait; every field of the
/// core is broker-agnostic (spec §6.1).
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn get_clock(&self) -> anyhow::Result<Clock>;
    async fn get_account(&self) -> anyhow::Result<Account>;
    async fn list_positions(&self) -> anyhow::Result<Vec<BrokerPosition>>;
    async fn get_latest_quote(&self, symbol: &str) -> anyhow::Result<Quote>;
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> anyhow::Result<Vec<Bar>>;
    async fn submit_order(&self, order: OrderRequest) -> anyhow::Result<String>;
    async fn get_order(&self, order_id: &str) -> anyhow::Result<OrderStatusReport>;
    async fn cancel_order(&self, order_id: &str) -> anyhow::Result<()>;
}

/// Outcome of driving one order through its lifecycle (spec §4.6): either a
/// fill to act on (full or the filled remainder of a timed-out partial), or
/// nothing to act on (no shares ever changed hands).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderOutcome {
    Filled { qty: f64, avg_price: f64 },
    NoFill,
}

/// Drive an order through §4.6's shared lifecycle: poll every 1 s up to
/// `max_wait`.
///
/// - `filled` → `Filled` with the reported quantity/price.
/// - `partially_filled` still open at `max_wait` → cancel the remainder,
///   treat the filled portion as `Filled`.
/// - `canceled`/`rejected`/`expired` → `NoFill`.
/// - timeout with zero fill → cancel and treat as `NoFill`.
pub async fn run_order_lifecycle(
    broker: &dyn BrokerClient,
    order_id: &str,
    max_wait: std::time::Duration,
) -> anyhow::Result<OrderOutcome> {
    let deadline = tokio::time::Instant::now() + max_wait;
    loop {
        let report = broker.get_order(order_id).await?;

        if report.status == OrderStatus::Filled {
            return Ok(OrderOutcome::Filled {
                qty: report.filled_qty,
                avg_price: report.filled_avg_price.unwrap_or(0.0),
            });
        }
        if matches!(
            report.status,
            OrderStatus::Canceled | OrderStatus::Expired | OrderStatus::Rejected
        ) {
            return Ok(OrderOutcome::NoFill);
        }

        if tokio::time::Instant::now() >= deadline {
            let _ = broker.cancel_order(order_id).await;
            return if report.status == OrderStatus::PartiallyFilled && report.filled_qty > 0.0 {
                Ok(OrderOutcome::Filled {
                    qty: report.filled_qty,
                    avg_price: report.filled_avg_price.unwrap_or(0.0),
                })
            } else {
                Ok(OrderOutcome::NoFill)
            };
        }

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}
