// =============================================================================
// Monitor rule evaluation — stop ratchet, trailing tiers, exit triggers
// (spec §4.4)
// =============================================================================

use crate::config::Config;
use crate::types::{ExitReason, Position};

/// Recompute `peak_price` and the monotonic `current_stop` ratchet for one
/// position, given the latest mid price (spec §4.4 step 3). Returns the new
/// `(peak_price, current_stop)` — callers write back only if changed.
pub fn ratchet(position: &Position, current_price: f64, cfg: &Config) -> (f64, f64) {
    let peak_price = position.peak_price.max(current_price);
    let mut stop = position.current_stop;

    if peak_price / position.entry_price >= 1.0 + cfg.breakeven_profit {
        stop = stop.max(position.entry_price);
    }

    let profit_pct = peak_price / position.entry_price - 1.0;
    if let Some(trail_pct) = Config::trailing_stop_pct(profit_pct) {
        stop = stop.max(peak_price * (1.0 - trail_pct));
    }

    (peak_price, stop)
}

/// Evaluate exit triggers in priority order (spec §4.4 step 4); the first
/// match wins. `minutes_to_close` is `None` outside regular session hours
/// tracking (never triggers eod).
pub fn evaluate_exit(
    position: &Position,
    current_price: f64,
    current_stop: f64,
    acceleration: Option<f64>,
    minutes_to_close: Option<f64>,
    cfg: &Config,
) -> Option<ExitReason> {
    if current_price <= current_stop {
        return Some(if current_stop < position.entry_price {
            ExitReason::StopLoss
        } else {
            ExitReason::TrailingStop
        });
    }

    let profit_pct = current_price / position.entry_price - 1.0;
    if profit_pct >= cfg.min_profit_for_decel_check {
        if let Some(accel) = acceleration {
            if accel < cfg.decel_exit_threshold {
                return Some(ExitReason::Deceleration);
            }
        }
    }

    if let Some(minutes) = minutes_to_close {
        if minutes <= cfg.eod_liquidation_minutes as f64 {
            return Some(ExitReason::Eod);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> Position {
        Position {
            symbol: "ABCD".into(),
            entry_price: 10.0,
            quantity: 100,
            entry_time: 0,
            current_stop: 9.75,
            peak_price: 10.0,
            signal_score: 65.0,
            signal_price: 10.0,
            vwap_at_entry: 9.9,
            rsi_at_entry: 55.0,
            breakout_pct: 0.02,
        }
    }

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn stop_never_moves_down() {
        let p = position();
        let (_, stop) = ratchet(&p, 9.80, &cfg());
        assert_eq!(stop, 9.75);
    }

    #[test]
    fn breakeven_ratchet_triggers_at_five_percent_profit() {
        let p = position();
        let (peak, stop) = ratchet(&p, 10.50, &cfg());
        assert_eq!(peak, 10.50);
        assert!(stop >= 10.0, "stop should have moved to breakeven, got {stop}");
    }

    #[test]
    fn trailing_stop_tier_applies_below_peak() {
        let mut p = position();
        p.peak_price = 11.0; // +10% already
        p.current_stop = 10.0;
        let (peak, stop) = ratchet(&p, 11.0, &cfg());
        assert_eq!(peak, 11.0);
        // 10% tier -> 3% trail below peak = 10.67
        assert!((stop - 10.67).abs() < 1e-6);
    }

    #[test]
    fn stop_loss_exit_below_entry() {
        let p = position();
        let reason = evaluate_exit(&p, 9.70, 9.75, None, None, &cfg());
        assert_eq!(reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn trailing_stop_exit_above_entry() {
        let mut p = position();
        p.current_stop = 10.2;
        let reason = evaluate_exit(&p, 10.1, 10.2, None, None, &cfg());
        assert_eq!(reason, Some(ExitReason::TrailingStop));
    }

    #[test]
    fn deceleration_exit_matches_spec_scenario() {
        let p = position();
        // +8% profit, acceleration 0.25 < 0.5
        let reason = evaluate_exit(&p, 10.80, 9.75, Some(0.25), None, &cfg());
        assert_eq!(reason, Some(ExitReason::Deceleration));
    }

    #[test]
    fn no_deceleration_exit_when_acceleration_is_healthy() {
        let p = position();
        let reason = evaluate_exit(&p, 10.80, 9.75, Some(0.9), None, &cfg());
        assert_eq!(reason, None);
    }

    #[test]
    fn eod_exit_within_window() {
        let p = position();
        let reason = evaluate_exit(&p, 10.05, 9.75, Some(0.9), Some(4.0), &cfg());
        assert_eq!(reason, Some(ExitReason::Eod));
    }
}
