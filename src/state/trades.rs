// =============================================================================
// trades.json — append-only, written by Seller. No record is ever modified.
// =============================================================================

use super::StateDir;
use crate::types::Trade;

const FILE: &str = "trades.json";

pub fn load(dir: &StateDir) -> Vec<Trade> {
    super::atomic::read_or_default(dir.path(FILE), Vec::new(), dir.lock_timeout)
}

/// Append one trade record. Every exit fill produces exactly one append
/// (spec invariant 6); idempotence against double-processing the same
/// SellSignal is the caller's job (Seller checks `get_position` is zero
/// before treating an exit as already handled).
pub fn append(dir: &StateDir, trade: Trade) -> anyhow::Result<()> {
    let mut trades = load(dir);
    trades.push(trade);
    super::atomic::write_atomic(dir.path(FILE), &trades, dir.lock_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExitReason;

    #[test]
    fn append_grows_the_log_and_preserves_order() {
        let root = std::env::temp_dir().join(format!("aurora-tr-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        let dir = StateDir::new(root, std::time::Duration::from_secs(5));

        let t = |sym: &str| Trade {
            symbol: sym.into(),
            entry_time: 0,
            exit_time: 1,
            entry_price: 10.0,
            exit_price: 9.75,
            quantity: 100,
            pnl_pct: -0.025,
            pnl_dollars: -25.0,
            reason: ExitReason::StopLoss,
            signal_score: 65.0,
        };

        append(&dir, t("A")).unwrap();
        append(&dir, t("B")).unwrap();

        let loaded = load(&dir);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].symbol, "A");
        assert_eq!(loaded[1].symbol, "B");
    }
}
