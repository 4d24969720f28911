// =============================================================================
// Scanner — every 45 s, score each watchlist symbol and emit entry signals
// (spec §4.2)
// =============================================================================

pub mod scoring;

use tracing::{debug, info, warn};

use crate::broker::{BrokerClient, Timeframe};
use crate::config::Config;
use crate::indicators::{rsi, volume, vwap};
use crate::state::{signals, watchlist, StateDir};
use crate::types::{now_unix, Signal};
use scoring::{breakout_ref_and_pct, score, ScoreInputs};

const RSI_PERIOD: usize = 14;
const RELATIVE_VOLUME_WINDOW: usize = 20;

/// Score one symbol from its 5-minute and 2-minute bar series (spec §4.2
/// steps 2-5). Returns `None` on missing/malformed data or a failed score.
///
/// `prior_close` comes from the daily watchlist (the real previous trading
/// day's close), not from the intraday bar series — `bars_5min` only spans
/// the current session and has no prior-day bar to read it from.
async fn scan_symbol(
    broker: &dyn BrokerClient,
    cfg: &Config,
    symbol: &str,
    premarket_high: Option<f64>,
    gap_pct: Option<f64>,
    prior_close: Option<f64>,
) -> anyhow::Result<Option<Signal>> {
    let bars_5min = broker.get_bars(symbol, Timeframe::FiveMin, 40).await?;
    let bars_2min = broker.get_bars(symbol, Timeframe::TwoMin, 40).await?;

    if bars_5min.len() < RSI_PERIOD + 1 {
        debug!(symbol, "insufficient 5-minute bars for RSI, skipping");
        return Ok(None);
    }

    let closes: Vec<f64> = bars_5min.iter().map(|b| b.c).collect();
    let price = *closes.last().unwrap();
    // VWAP and session high are cumulative *over today's session* (spec
    // §4.2, GLOSSARY "Session high"); `vwap::current_vwap` also documents
    // that its input must start at session open. Filter to today's bars
    // before computing either, falling back to the full (unfiltered) series
    // only if the broker returned nothing for today yet (e.g. right at open).
    let today = chrono::Utc::now().date_naive();
    let session_bars: Vec<_> = bars_5min.iter().filter(|b| b.t.date_naive() == today).cloned().collect();
    let session_bars = if session_bars.is_empty() { &bars_5min } else { &session_bars };

    let prior_close = prior_close.unwrap_or_else(|| session_bars.first().map(|b| b.o).unwrap_or(price));

    let current_vwap = match vwap::current_vwap(session_bars) {
        Some(v) => v,
        None => return Ok(None),
    };
    let current_rsi = match rsi::current_rsi(&closes, RSI_PERIOD) {
        Some((v, _)) => v,
        None => return Ok(None),
    };
    let relative_volume = match volume::relative_volume(&bars_5min, RELATIVE_VOLUME_WINDOW) {
        Some(v) => v,
        None => return Ok(None),
    };

    let session_high = session_bars.iter().map(|b| b.h).fold(f64::MIN, f64::max);
    let (breakout_ref, breakout_pct) =
        breakout_ref_and_pct(price, premarket_high, session_high, prior_close);

    let inputs = ScoreInputs {
        price,
        vwap: current_vwap,
        breakout_pct,
        relative_volume,
        rsi: current_rsi,
        gap_pct,
    };

    let Some(score_value) = score(&inputs, cfg) else {
        return Ok(None);
    };
    let _ = &bars_2min; // reserved for Monitor's acceleration calc; fetched here to keep the 2-call-per-symbol budget honest

    Ok(Some(Signal {
        symbol: symbol.to_string(),
        timestamp: now_unix(),
        price,
        score: score_value,
        vwap: current_vwap,
        rsi: current_rsi,
        breakout_pct,
        breakout_ref,
        relative_volume,
        premarket_high,
        gap_pct,
    }))
}

/// One watchlist symbol's scan inputs, either read off today's
/// `DailyWatchlistEntry` or synthesized (all `None`) for the degraded base-
/// universe fallback.
struct Candidate {
    symbol: String,
    premarket_high: Option<f64>,
    gap_pct: Option<f64>,
    prior_close: Option<f64>,
}

/// Run one Scanner cycle: load today's watchlist (or degrade to the base
/// universe head), score every symbol, and overwrite `signals.json` with the
/// survivors, ordered by score descending (spec §4.2 step 6, §5 "Ordering
/// guarantees").
pub async fn run(
    broker: &dyn BrokerClient,
    state: &StateDir,
    cfg: &Config,
    base_universe: &[String],
) -> anyhow::Result<()> {
    let candidates: Vec<Candidate> = match watchlist::load_for_date(state, &today_str()) {
        Some(list) => list
            .entries
            .into_iter()
            .map(|e| Candidate {
                symbol: e.symbol,
                premarket_high: Some(e.premarket_high),
                gap_pct: Some(e.gap_pct),
                prior_close: Some(e.prior_close),
            })
            .collect(),
        None => {
            warn!("no daily watchlist for today, falling back to base universe head");
            base_universe
                .iter()
                .take(25)
                .map(|symbol| Candidate {
                    symbol: symbol.clone(),
                    premarket_high: None,
                    gap_pct: None,
                    prior_close: None,
                })
                .collect()
        }
    };

    let mut fresh_signals = Vec::new();
    for candidate in &candidates {
        match scan_symbol(
            broker,
            cfg,
            &candidate.symbol,
            candidate.premarket_high,
            candidate.gap_pct,
            candidate.prior_close,
        )
        .await
        {
            Ok(Some(signal)) => fresh_signals.push(signal),
            Ok(None) => {}
            Err(e) => debug!(symbol = %candidate.symbol, error = %e, "scan failed for symbol, skipping"),
        }
    }

    fresh_signals.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.relative_volume.partial_cmp(&a.relative_volume).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.timestamp.cmp(&b.timestamp))
    });

    info!(emitted = fresh_signals.len(), "scanner cycle complete");
    signals::save(state, &fresh_signals)
}

fn today_str() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}
