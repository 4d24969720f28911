// =============================================================================
// Scanner scoring rubric (spec §4.2.1)
// =============================================================================

use crate::config::Config;
use crate::types::BreakoutRef;

/// Inputs to the scoring rubric, already computed from bar series.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub price: f64,
    pub vwap: f64,
    pub breakout_pct: f64,
    pub relative_volume: f64,
    pub rsi: f64,
    pub gap_pct: Option<f64>,
}

/// Score one symbol per the required + bonus rubric. Returns `None` if any
/// required criterion fails (spec: "if score < 60 or any required criterion
/// fails, emit nothing" — required criteria summing to 60 means failing one
/// IS scoring below 60, so both conditions collapse to this one check).
pub fn score(inputs: &ScoreInputs, cfg: &Config) -> Option<f64> {
    let above_vwap = inputs.price > inputs.vwap;
    let breakout_ok = inputs.breakout_pct >= cfg.min_breakout_pct;
    let rel_vol_ok = inputs.relative_volume >= cfg.min_relative_volume;
    let rsi_ok = inputs.rsi >= cfg.rsi_min && inputs.rsi <= cfg.rsi_max;

    if cfg.require_above_vwap && !above_vwap {
        return None;
    }
    if !breakout_ok || !rel_vol_ok || !rsi_ok {
        return None;
    }

    let mut total = 0.0;
    if above_vwap {
        total += 15.0;
    }
    total += 20.0; // breakout >= 1% required, already checked
    total += 15.0; // relative_volume >= 2.0 required, already checked
    total += 10.0; // RSI in [40, 75] required, already checked

    if inputs.breakout_pct >= 0.03 {
        total += 10.0;
    }
    if inputs.relative_volume >= 4.0 {
        total += 10.0;
    }
    if inputs.rsi >= 50.0 && inputs.rsi <= 65.0 {
        total += 5.0;
    }
    if inputs.gap_pct.map(|g| g >= 0.05).unwrap_or(false) {
        total += 10.0;
    }

    Some(total.min(95.0))
}

/// Pick the best available breakout reference, in priority order (spec
/// §4.2 step 4): premarket_high, then session_high, then prior_close.
pub fn breakout_ref_and_pct(
    price: f64,
    premarket_high: Option<f64>,
    session_high: f64,
    prior_close: f64,
) -> (BreakoutRef, f64) {
    if let Some(pm_high) = premarket_high {
        if pm_high > 0.0 {
            return (BreakoutRef::PremarketHigh, (price - pm_high) / pm_high);
        }
    }
    if session_high > 0.0 {
        return (BreakoutRef::SessionHigh, (price - session_high) / session_high);
    }
    (BreakoutRef::PriorClose, (price - prior_close) / prior_close)
}
