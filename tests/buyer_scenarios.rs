// =============================================================================
// Buyer integration scenarios, driven against MockBroker (SPEC_FULL §A.5)
// =============================================================================

#[path = "support.rs"]
mod support;

use aurora_momentum::buyer::dedupe::SignalDedupe;
use aurora_momentum::config::Config;
use aurora_momentum::state::{cooldowns, positions, signals};
use aurora_momentum::types::{now_unix, BreakoutRef, Signal};
use support::MockBroker;

fn signal(symbol: &str, timestamp: i64, price: f64, score: f64) -> Signal {
    Signal {
        symbol: symbol.to_string(),
        timestamp,
        price,
        score,
        vwap: price * 0.98,
        rsi: 55.0,
        breakout_pct: 0.02,
        breakout_ref: BreakoutRef::SessionHigh,
        relative_volume: 3.0,
        premarket_high: None,
        gap_pct: None,
    }
}

#[tokio::test]
async fn happy_path_entry_opens_a_position() {
    let broker = MockBroker::new();
    let state = support::scratch_state_dir("buyer-happy");
    let cfg = Config::default();

    signals::save(&state, &[signal("AAA", now_unix(), 10.0, 65.0)]).unwrap();
    broker.set_quote("AAA", 9.99, 10.01);

    let mut dedupe = SignalDedupe::new(100);
    aurora_momentum::buyer::run(&broker, &state, &cfg, &mut dedupe, false).await.unwrap();

    let open = positions::load(&state);
    let position = open.get("AAA").expect("position should have been opened");
    assert_eq!(position.quantity, 500); // equity 100_000 * 5% tier / mid 10.0
    assert!((position.entry_price - 10.05).abs() < 1e-9); // limit buffer 0.5%

    assert_eq!(broker.submitted_orders().len(), 1);
}

#[tokio::test]
async fn slippage_beyond_band_rejects_the_quote() {
    let broker = MockBroker::new();
    let state = support::scratch_state_dir("buyer-slippage");
    let cfg = Config::default();

    signals::save(&state, &[signal("AAA", now_unix(), 10.0, 65.0)]).unwrap();
    // mid ~10.46, 4.6% above the signal price — past max_slippage_pct (2%)
    broker.set_quote("AAA", 10.45, 10.47);

    let mut dedupe = SignalDedupe::new(100);
    aurora_momentum::buyer::run(&broker, &state, &cfg, &mut dedupe, false).await.unwrap();

    assert!(positions::load(&state).is_empty());
    assert!(broker.submitted_orders().is_empty());
}

#[tokio::test]
async fn stale_signal_is_discarded_before_any_quote_fetch() {
    let broker = MockBroker::new();
    let state = support::scratch_state_dir("buyer-stale");
    let cfg = Config::default();

    let stale_ts = now_unix() - (cfg.signal_max_age_seconds + 5);
    signals::save(&state, &[signal("AAA", stale_ts, 10.0, 65.0)]).unwrap();
    broker.set_quote("AAA", 9.99, 10.01);

    let mut dedupe = SignalDedupe::new(100);
    aurora_momentum::buyer::run(&broker, &state, &cfg, &mut dedupe, false).await.unwrap();

    assert!(positions::load(&state).is_empty());
    assert!(broker.submitted_orders().is_empty());
}

#[tokio::test]
async fn cooling_down_symbol_is_skipped() {
    let broker = MockBroker::new();
    let state = support::scratch_state_dir("buyer-cooldown");
    let cfg = Config::default();

    signals::save(&state, &[signal("AAA", now_unix(), 10.0, 65.0)]).unwrap();
    broker.set_quote("AAA", 9.99, 10.01);
    let now = now_unix();
    cooldowns::start_cooldown(&state, "AAA", now + 900, now).unwrap();

    let mut dedupe = SignalDedupe::new(100);
    aurora_momentum::buyer::run(&broker, &state, &cfg, &mut dedupe, false).await.unwrap();

    assert!(positions::load(&state).is_empty());
    assert!(broker.submitted_orders().is_empty());
}
