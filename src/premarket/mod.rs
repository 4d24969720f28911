// =============================================================================
// PreMarketScanner — once per trading day, select the 25 highest-ranked
// gap-and-volume candidates from the base universe (spec §4.1)
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info};

use crate::broker::{BrokerClient, Timeframe};
use crate::config::Config;
use crate::state::{watchlist, StateDir};
use crate::types::{DailyWatchlist, DailyWatchlistEntry};

/// Per-symbol raw observations gathered before scoring (spec §4.1 step 2).
#[derive(Debug, Clone, Copy)]
struct Candidate {
    prior_close: f64,
    premarket_price: f64,
    premarket_high: f64,
    premarket_volume: f64,
    avg_daily_volume: f64,
}

/// Fetch the raw metrics needed to score one ticker. A missing/malformed
/// data point is a per-symbol skip (spec §4.1 "Error policy"), not fatal.
///
/// `next_open` bounds the pre-market session: only 1-minute bars strictly
/// before it, on the same calendar date, count toward `premarket_high` /
/// `premarket_volume` — otherwise yesterday's after-hours bars or today's
/// regular-session bars (once the fetch races past the open) would leak in.
async fn fetch_candidate(
    broker: &dyn BrokerClient,
    symbol: &str,
    next_open: DateTime<Utc>,
) -> anyhow::Result<Candidate> {
    let daily_bars = broker.get_bars(symbol, Timeframe::OneDay, 21).await?;
    if daily_bars.len() < 2 {
        anyhow::bail!("fewer than 2 daily bars for {symbol}");
    }
    let prior_close = daily_bars[daily_bars.len() - 2].c;
    let history = &daily_bars[..daily_bars.len() - 1];
    let avg_daily_volume = history.iter().map(|b| b.v).sum::<f64>() / history.len() as f64;

    let quote = broker.get_latest_quote(symbol).await?;
    let premarket_price = quote.mid();

    let premarket_bars = broker.get_bars(symbol, Timeframe::OneMin, 500).await?;
    let session_bars: Vec<_> = premarket_bars
        .iter()
        .filter(|b| b.t < next_open && b.t.date_naive() == next_open.date_naive())
        .collect();
    if session_bars.is_empty() {
        anyhow::bail!("no pre-market session bars for {symbol}");
    }
    let premarket_high = session_bars.iter().map(|b| b.h).fold(f64::MIN, f64::max);
    let premarket_volume: f64 = session_bars.iter().map(|b| b.v).sum();

    Ok(Candidate {
        prior_close,
        premarket_price,
        premarket_high,
        premarket_volume,
        avg_daily_volume,
    })
}

/// Pure rejection/scoring logic (spec §4.1 steps 3-4), isolated from I/O so
/// it can be exercised directly in tests.
fn evaluate(symbol: &str, c: &Candidate, cfg: &Config) -> Option<DailyWatchlistEntry> {
    if c.prior_close <= 0.0 || c.premarket_price <= 0.0 {
        return None;
    }
    if !(cfg.price_min..=cfg.price_max).contains(&c.premarket_price) {
        debug!(symbol, price = c.premarket_price, "rejected: price out of range");
        return None;
    }

    let gap_pct = (c.premarket_price - c.prior_close) / c.prior_close;
    if gap_pct < cfg.min_gap_pct {
        debug!(symbol, gap_pct, "rejected: gap below minimum");
        return None;
    }

    if c.premarket_volume < cfg.min_premarket_volume {
        debug!(symbol, volume = c.premarket_volume, "rejected: premarket volume below minimum");
        return None;
    }

    if c.avg_daily_volume <= 0.0 {
        return None;
    }
    let relative_volume = c.premarket_volume * (6.5 / 5.5) / c.avg_daily_volume;
    if relative_volume < cfg.min_premarket_rel_volume {
        debug!(symbol, relative_volume, "rejected: relative volume below minimum");
        return None;
    }

    let score = gap_pct * relative_volume * 100.0;

    Some(DailyWatchlistEntry {
        symbol: symbol.to_string(),
        rank: 0, // assigned after sorting
        prior_close: c.prior_close,
        premarket_price: c.premarket_price,
        premarket_high: c.premarket_high,
        premarket_volume: c.premarket_volume,
        gap_pct,
        relative_volume,
        score,
    })
}

/// Run one PreMarketScanner pass over the whole base universe and, if any
/// candidate survives, write today's `daily_watchlist.json`.
pub async fn run(
    broker: &dyn BrokerClient,
    state: &StateDir,
    cfg: &Config,
    universe: &[String],
) -> anyhow::Result<()> {
    let next_open = broker.get_clock().await?.next_open;
    let mut entries = Vec::new();

    for symbol in universe {
        let candidate = match fetch_candidate(broker, symbol, next_open).await {
            Ok(c) => c,
            Err(e) => {
                debug!(symbol, error = %e, "premarket candidate fetch failed, skipping");
                continue;
            }
        };
        if let Some(entry) = evaluate(symbol, &candidate, cfg) {
            entries.push(entry);
        }
    }

    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    entries.truncate(cfg.daily_watchlist_size);
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = (i + 1) as u32;
    }

    if entries.is_empty() {
        error!("premarket scan produced zero candidates; daily_watchlist.json left untouched");
        return Ok(());
    }

    let today: NaiveDate = Utc::now().date_naive();
    let list = DailyWatchlist {
        date: today.format("%Y-%m-%d").to_string(),
        entries,
    };
    info!(count = list.entries.len(), date = %list.date, "premarket scan complete");
    watchlist::save(state, &list)
}
