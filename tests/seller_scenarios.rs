// =============================================================================
// Seller integration scenarios, driven against MockBroker (SPEC_FULL §A.5)
// =============================================================================

#[path = "support.rs"]
mod support;

use std::collections::HashMap;

use aurora_momentum::config::Config;
use aurora_momentum::state::{positions, sell_signals, trades};
use aurora_momentum::types::{now_unix, ExitReason, Position, SellSignal};
use support::{FillPlan, MockBroker};

fn position(symbol: &str, entry_price: f64) -> Position {
    Position {
        symbol: symbol.to_string(),
        entry_price,
        quantity: 100,
        entry_time: 0,
        current_stop: entry_price * 0.975,
        peak_price: entry_price,
        signal_score: 65.0,
        signal_price: entry_price,
        vwap_at_entry: entry_price * 0.98,
        rsi_at_entry: 55.0,
        breakout_pct: 0.02,
    }
}

fn stop_loss_signal(symbol: &str, trigger_price: f64) -> SellSignal {
    SellSignal {
        symbol: symbol.to_string(),
        timestamp: now_unix(),
        reason: ExitReason::StopLoss,
        trigger_price,
    }
}

/// A duplicate sell signal for the same exit (e.g. Monitor re-emitting before
/// Seller catches up) must still settle into exactly one trade: the broker
/// reports the position closed after the first fill, so the second queued
/// entry finds nothing left to sell.
#[tokio::test]
async fn duplicate_sell_signal_yields_exactly_one_trade() {
    let broker = MockBroker::new();
    let state = support::scratch_state_dir("seller-idempotent");
    let cfg = Config::default();

    positions::insert_new(&state, position("AAA", 10.0)).unwrap();
    broker.set_broker_position("AAA", 100.0, 10.0);
    broker.queue_fill("AAA", FillPlan::filled(100.0, 9.60));

    sell_signals::append(&state, stop_loss_signal("AAA", 9.60)).unwrap();
    sell_signals::append(&state, stop_loss_signal("AAA", 9.60)).unwrap();

    let mut failure_counts = HashMap::new();
    aurora_momentum::seller::run(&broker, &state, &cfg, &mut failure_counts).await.unwrap();

    assert_eq!(trades::load(&state).len(), 1);
    assert!(sell_signals::load(&state).is_empty());
    assert!(positions::load(&state).is_empty());
    assert_eq!(broker.submitted_orders().len(), 1);

    // A later cycle with nothing pending is a pure no-op.
    aurora_momentum::seller::run(&broker, &state, &cfg, &mut failure_counts).await.unwrap();
    assert_eq!(trades::load(&state).len(), 1);
}

#[tokio::test]
async fn resolved_trade_records_pnl_and_starts_a_cooldown() {
    let broker = MockBroker::new();
    let state = support::scratch_state_dir("seller-pnl");
    let cfg = Config::default();

    positions::insert_new(&state, position("AAA", 10.0)).unwrap();
    broker.set_broker_position("AAA", 100.0, 10.0);
    broker.queue_fill("AAA", FillPlan::filled(100.0, 9.60));
    sell_signals::append(&state, stop_loss_signal("AAA", 9.60)).unwrap();

    let mut failure_counts = HashMap::new();
    aurora_momentum::seller::run(&broker, &state, &cfg, &mut failure_counts).await.unwrap();

    let recorded = trades::load(&state);
    assert_eq!(recorded.len(), 1);
    let trade = &recorded[0];
    assert_eq!(trade.symbol, "AAA");
    assert!((trade.exit_price - 9.60).abs() < 1e-9);
    assert!(trade.pnl_dollars < 0.0);

    assert!(aurora_momentum::state::cooldowns::is_cooling_down(&state, "AAA", now_unix() + 60));
}
