// =============================================================================
// Seller — execute exits and finalize bookkeeping (spec §4.5)
// =============================================================================

use std::time::Duration;

use tracing::{error, info, warn};

use crate::broker::{run_order_lifecycle, BrokerClient, OrderOutcome, OrderRequest};
use crate::config::Config;
use crate::state::{cooldowns, positions, sell_signals, trades, StateDir};
use crate::types::{now_unix, SellSignal, Trade};

/// Compute P&L for a closed trade.
fn pnl(entry_price: f64, exit_price: f64, quantity: i64) -> (f64, f64) {
    let pnl_pct = (exit_price - entry_price) / entry_price;
    let pnl_dollars = (exit_price - entry_price) * quantity as f64;
    (pnl_pct, pnl_dollars)
}

/// Process one pending sell signal. Returns `true` if it was resolved
/// (filled-and-finalized, or dropped because the position was already
/// closed) and should be removed from the pending queue.
async fn process_one(
    broker: &dyn BrokerClient,
    state: &StateDir,
    cfg: &Config,
    signal: &SellSignal,
) -> anyhow::Result<bool> {
    let broker_positions = broker.list_positions().await?;
    let held_qty = broker_positions
        .iter()
        .find(|p| p.symbol == signal.symbol)
        .map(|p| p.qty)
        .unwrap_or(0.0);

    if held_qty == 0.0 {
        info!(symbol = %signal.symbol, "position already closed at broker, dropping sell signal");
        positions::remove(state, &signal.symbol)?;
        return Ok(true);
    }

    let order_id = broker
        .submit_order(OrderRequest::day_market_sell(&signal.symbol, held_qty as i64))
        .await?;

    let outcome = run_order_lifecycle(
        broker,
        &order_id,
        Duration::from_secs(cfg.order_poll_timeout_seconds),
    )
    .await?;

    let (filled_qty, exit_price) = match outcome {
        OrderOutcome::Filled { qty, avg_price } if qty > 0.0 => {
            (qty, if avg_price > 0.0 { avg_price } else { signal.trigger_price })
        }
        _ => {
            warn!(symbol = %signal.symbol, "sell order did not fill this cycle");
            return Ok(false);
        }
    };

    let removed = positions::remove(state, &signal.symbol)?;

    if let Some(position) = removed {
        let (pnl_pct, pnl_dollars) = pnl(position.entry_price, exit_price, filled_qty as i64);
        trades::append(
            state,
            Trade {
                symbol: signal.symbol.clone(),
                entry_time: position.entry_time,
                exit_time: now_unix(),
                entry_price: position.entry_price,
                exit_price,
                quantity: filled_qty as i64,
                pnl_pct,
                pnl_dollars,
                reason: signal.reason,
                signal_score: position.signal_score,
            },
        )?;
    }

    let now = now_unix();
    cooldowns::start_cooldown(
        state,
        &signal.symbol,
        now + cfg.cooldown_minutes * 60,
        now,
    )?;

    Ok(true)
}

/// Run one Seller cycle: process `sell_signals.json` in arrival order,
/// clearing resolved entries (spec §4.5 steps 1-4). An entry that fails to
/// resolve 3 cycles in a row is logged at ERROR (step 5).
pub async fn run(
    broker: &dyn BrokerClient,
    state: &StateDir,
    cfg: &Config,
    failure_counts: &mut std::collections::HashMap<String, u32>,
) -> anyhow::Result<()> {
    let pending = sell_signals::load(state);
    let mut still_pending = Vec::new();

    for signal in pending {
        match process_one(broker, state, cfg, &signal).await {
            Ok(true) => {
                failure_counts.remove(&signal.symbol);
            }
            Ok(false) => {
                let count = failure_counts.entry(signal.symbol.clone()).or_insert(0);
                *count += 1;
                if *count >= 3 {
                    error!(symbol = %signal.symbol, attempts = *count, "sell signal failed to resolve after 3 consecutive cycles");
                }
                still_pending.push(signal);
            }
            Err(e) => {
                warn!(symbol = %signal.symbol, error = %e, "sell cycle error, will retry next cycle");
                still_pending.push(signal);
            }
        }
    }

    sell_signals::retain_pending(state, &still_pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pnl_is_computed_from_entry_and_exit() {
        let (pct, dollars) = pnl(5.71, 5.50, 875);
        assert!(pct < 0.0);
        assert!((dollars - (5.50 - 5.71) * 875.0).abs() < 1e-9);
    }
}
