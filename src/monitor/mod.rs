// =============================================================================
// Monitor — evaluate every open Position against risk rules (spec §4.4)
// =============================================================================

pub mod rules;

use tracing::{debug, info, warn};

use crate::broker::{BrokerClient, Timeframe};
use crate::config::Config;
use crate::indicators::volume::acceleration;
use crate::state::{positions, sell_signals, StateDir};
use crate::types::{now_unix, SellSignal};
use rules::{evaluate_exit, ratchet};

/// Drop local positions the broker no longer reports a non-zero quantity
/// for; log (don't act on) broker positions with no local record (spec
/// §4.4 step 1 / §5 "Restart safety").
async fn reconcile(
    broker: &dyn BrokerClient,
    state: &StateDir,
) -> anyhow::Result<std::collections::HashMap<String, crate::types::Position>> {
    let broker_positions = broker.list_positions().await?;
    let broker_qty: std::collections::HashMap<&str, f64> = broker_positions
        .iter()
        .map(|p| (p.symbol.as_str(), p.qty))
        .collect();

    let mut local = positions::load(state);
    let before = local.len();
    local.retain(|symbol, _| {
        let held = broker_qty.get(symbol.as_str()).copied().unwrap_or(0.0);
        held != 0.0
    });
    if local.len() != before {
        positions::save(state, &local)?;
    }

    for bp in &broker_positions {
        if !local.contains_key(&bp.symbol) {
            warn!(symbol = %bp.symbol, qty = bp.qty, "broker position has no local record, ignoring");
        }
    }

    Ok(local)
}

/// Minutes remaining until the broker's reported session close, or `None`
/// if the market is already closed.
fn minutes_to_close(clock: &crate::broker::types::Clock) -> Option<f64> {
    if !clock.is_open {
        return None;
    }
    let delta = clock.next_close - chrono::Utc::now();
    Some(delta.num_seconds() as f64 / 60.0)
}

pub async fn run(broker: &dyn BrokerClient, state: &StateDir, cfg: &Config) -> anyhow::Result<()> {
    let open_positions = reconcile(broker, state).await?;
    let clock = broker.get_clock().await?;
    let minutes_left = minutes_to_close(&clock);

    let mut symbols: Vec<&String> = open_positions.keys().collect();
    symbols.sort(); // spec §5: Monitor's internal order is not externally observable, but deterministic for testability

    for symbol in symbols {
        let position = &open_positions[symbol];
        let quote = match broker.get_latest_quote(symbol).await {
            Ok(q) if q.is_valid() => q,
            _ => {
                debug!(symbol, "could not fetch a usable quote, skipping this cycle");
                continue;
            }
        };
        let current_price = quote.mid();

        let bars_1min = broker.get_bars(symbol, Timeframe::OneMin, 10).await.unwrap_or_default();
        let closes: Vec<f64> = bars_1min.iter().map(|b| b.c).collect();
        let accel = acceleration(&closes);

        let (new_peak, new_stop) = ratchet(position, current_price, cfg);
        if new_stop > position.current_stop {
            let _ = positions::ratchet_stop(state, symbol, |_| new_stop);
        }
        // peak_price has no dedicated accessor; persist it alongside the
        // stop by re-reading and writing through the same single-writer path.
        if new_peak > position.peak_price {
            let mut all = positions::load(state);
            if let Some(p) = all.get_mut(symbol.as_str()) {
                p.peak_price = new_peak;
                let _ = positions::save(state, &all);
            }
        }

        if let Some(reason) =
            evaluate_exit(position, current_price, new_stop, accel, minutes_left, cfg)
        {
            info!(symbol, ?reason, current_price, "exit triggered");
            sell_signals::append(
                state,
                SellSignal {
                    symbol: symbol.clone(),
                    timestamp: now_unix(),
                    reason,
                    trigger_price: current_price,
                },
            )?;
        }
    }

    Ok(())
}
