// =============================================================================
// Volume-Weighted Average Price (VWAP) — cumulative over the trading session
// =============================================================================
//
// VWAP is computed from typical price (H+L+C)/3, weighted by bar volume and
// accumulated from the start of the session (GLOSSARY "VWAP"). Unlike RSI or
// ATR this has no look-back window: every bar from session open contributes.
// =============================================================================

use crate::broker::Bar;

/// Cumulative VWAP series, one value per input bar. `bars` must be in
/// chronological order starting at session open.
///
/// Returns an empty vec if `bars` is empty or a bar has zero/negative volume
/// sums to that point (VWAP undefined).
pub fn calculate_vwap_series(bars: &[Bar]) -> Vec<f64> {
    let mut series = Vec::with_capacity(bars.len());
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for bar in bars {
        let typical = (bar.h + bar.l + bar.c) / 3.0;
        cum_pv += typical * bar.v;
        cum_vol += bar.v;

        if cum_vol <= 0.0 {
            series.push(typical);
        } else {
            series.push(cum_pv / cum_vol);
        }
    }

    series
}

/// The most recent VWAP value, or `None` for an empty session.
pub fn current_vwap(bars: &[Bar]) -> Option<f64> {
    calculate_vwap_series(bars).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(h: f64, l: f64, c: f64, v: f64) -> Bar {
        Bar { t: Utc::now(), o: c, h, l, c, v }
    }

    #[test]
    fn empty_session_yields_none() {
        assert!(current_vwap(&[]).is_none());
    }

    #[test]
    fn single_bar_vwap_is_its_own_typical_price() {
        let bars = vec![bar(10.0, 8.0, 9.0, 1000.0)];
        let vwap = current_vwap(&bars).unwrap();
        assert!((vwap - 9.0).abs() < 1e-9);
    }

    #[test]
    fn vwap_accumulates_across_bars() {
        let bars = vec![bar(10.0, 10.0, 10.0, 100.0), bar(20.0, 20.0, 20.0, 100.0)];
        let vwap = current_vwap(&bars).unwrap();
        // (10*100 + 20*100) / 200 = 15
        assert!((vwap - 15.0).abs() < 1e-9);
    }

    #[test]
    fn zero_volume_bars_fall_back_to_typical_price() {
        let bars = vec![bar(10.0, 8.0, 9.0, 0.0)];
        let vwap = current_vwap(&bars).unwrap();
        assert!((vwap - 9.0).abs() < 1e-9);
    }
}
