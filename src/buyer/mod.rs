// =============================================================================
// Buyer — consume fresh signals, revalidate price, submit buy orders
// (spec §4.3)
// =============================================================================

pub mod dedupe;

use std::time::Duration;

use tracing::{info, warn};

use crate::broker::{run_order_lifecycle, BrokerClient, OrderOutcome, OrderRequest, Quote};
use crate::config::Config;
use crate::state::{cooldowns, positions, signals, StateDir};
use crate::types::{now_unix, Position, Signal};
use dedupe::SignalDedupe;

/// Why a quote was rejected (spec §4.3 bullet list), kept explicit so tests
/// can assert on the exact failure reason instead of a bare bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteRejection {
    MissingOrNonPositive,
    SpreadTooWide,
    UpsideSlippage,
    PriceCollapsed,
}

/// Validate a freshly-fetched quote against the signal's reference price
/// (spec §4.3 "Fetch the latest bid/ask quote. Reject if: ..."). Pure so it
/// can be unit tested without a broker.
pub fn validate_quote(quote: &Quote, signal_price: f64, cfg: &Config) -> Result<f64, QuoteRejection> {
    if !quote.is_valid() {
        return Err(QuoteRejection::MissingOrNonPositive);
    }
    let mid = quote.mid();
    if (quote.ask - quote.bid) / mid > cfg.max_spread_pct {
        return Err(QuoteRejection::SpreadTooWide);
    }
    let drift = (mid - signal_price) / signal_price;
    if drift > cfg.max_slippage_pct {
        return Err(QuoteRejection::UpsideSlippage);
    }
    if drift < -0.03 {
        return Err(QuoteRejection::PriceCollapsed);
    }
    Ok(mid)
}

/// Position size in whole shares for a given equity, score, and reference
/// price (spec §4.3 tier table). Returns `None` if the computed quantity is
/// not positive.
pub fn position_size(equity: f64, score: f64, mid: f64) -> Option<i64> {
    let pct = Config::position_size_pct(score);
    let qty = (equity * pct / mid).floor() as i64;
    if qty > 0 {
        Some(qty)
    } else {
        None
    }
}

/// Run one Buyer cycle.
pub async fn run(
    broker: &dyn BrokerClient,
    state: &StateDir,
    cfg: &Config,
    dedupe: &mut SignalDedupe,
    fast_path_only: bool,
) -> anyhow::Result<()> {
    let now = now_unix();
    let mut candidates = signals::discard_stale(signals::load(state), now, cfg.signal_max_age_seconds);
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    if fast_path_only {
        candidates.retain(|s| s.score >= 90.0);
    }

    let mut open_positions = positions::load(state);

    for signal in candidates {
        if dedupe.already_processed(&signal.symbol, signal.timestamp) {
            continue;
        }
        if open_positions.contains_key(&signal.symbol) {
            continue;
        }
        if cooldowns::is_cooling_down(state, &signal.symbol, now) {
            continue;
        }
        if open_positions.len() >= cfg.max_positions {
            break;
        }

        match try_buy(broker, state, cfg, &signal).await {
            Ok(Some(position)) => {
                info!(symbol = %position.symbol, qty = position.quantity, entry = position.entry_price, "position opened");
                open_positions.insert(position.symbol.clone(), position);
            }
            Ok(None) => {}
            Err(e) => warn!(symbol = %signal.symbol, error = %e, "buy attempt failed"),
        }
    }

    Ok(())
}

async fn try_buy(
    broker: &dyn BrokerClient,
    state: &StateDir,
    cfg: &Config,
    signal: &Signal,
) -> anyhow::Result<Option<Position>> {
    let quote = broker.get_latest_quote(&signal.symbol).await?;
    let mid = match validate_quote(&quote, signal.price, cfg) {
        Ok(mid) => mid,
        Err(reason) => {
            info!(symbol = %signal.symbol, ?reason, "quote rejected");
            return Ok(None);
        }
    };

    let account = broker.get_account().await?;
    let Some(qty) = position_size(account.equity, signal.score, mid) else {
        return Ok(None);
    };

    let limit_price = round2(mid * (1.0 + cfg.limit_order_buffer));
    let order_id = broker
        .submit_order(OrderRequest::day_limit_buy(&signal.symbol, qty, limit_price))
        .await?;

    let outcome = run_order_lifecycle(
        broker,
        &order_id,
        Duration::from_secs(cfg.order_poll_timeout_seconds),
    )
    .await?;

    let (filled_qty, filled_price) = match outcome {
        OrderOutcome::Filled { qty, avg_price } if qty > 0.0 => (qty, avg_price),
        _ => return Ok(None),
    };

    let position = Position {
        symbol: signal.symbol.clone(),
        entry_price: filled_price,
        quantity: filled_qty as i64,
        entry_time: now_unix(),
        current_stop: filled_price * (1.0 - cfg.stop_loss_pct),
        peak_price: filled_price,
        signal_score: signal.score,
        signal_price: signal.price,
        vwap_at_entry: signal.vwap,
        rsi_at_entry: signal.rsi,
        breakout_pct: signal.breakout_pct,
    };
    positions::insert_new(state, position.clone())?;
    Ok(Some(position))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn rejects_non_positive_quote() {
        let quote = Quote { bid: 0.0, ask: 0.0 };
        assert_eq!(validate_quote(&quote, 10.0, &cfg()), Err(QuoteRejection::MissingOrNonPositive));
    }

    #[test]
    fn rejects_wide_spread() {
        let quote = Quote { bid: 9.5, ask: 10.5 }; // spread 10%/mid ~10%
        assert_eq!(validate_quote(&quote, 10.0, &cfg()), Err(QuoteRejection::SpreadTooWide));
    }

    #[test]
    fn rejects_upside_slippage() {
        let quote = Quote { bid: 10.40, ask: 10.42 }; // mid ~10.41, 4.1% above 10.0
        assert_eq!(validate_quote(&quote, 10.0, &cfg()), Err(QuoteRejection::UpsideSlippage));
    }

    #[test]
    fn rejects_collapsed_price() {
        let quote = Quote { bid: 9.6, ask: 9.62 }; // mid ~9.61, -3.9% vs 10.0
        assert_eq!(validate_quote(&quote, 10.0, &cfg()), Err(QuoteRejection::PriceCollapsed));
    }

    #[test]
    fn accepts_quote_within_band() {
        let quote = Quote { bid: 5.69, ask: 5.71 };
        let mid = validate_quote(&quote, 5.70, &cfg()).unwrap();
        assert!((mid - 5.70).abs() < 1e-9);
    }

    #[test]
    fn happy_path_position_size_matches_spec_scenario() {
        // spec §8 scenario 1: equity=100000, score=65 (5% tier), mid=5.71 => qty 875
        let qty = position_size(100_000.0, 65.0, 5.71).unwrap();
        assert_eq!(qty, 875);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(position_size(1000.0, 60.0, 500.0).is_none());
    }

    #[test]
    fn limit_price_buffer_matches_spec_scenario() {
        let limit = round2(5.71 * 1.005);
        assert!((limit - 5.74).abs() < 1e-6);
    }
}
