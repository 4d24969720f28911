// =============================================================================
// sell_signals.json — appended by Monitor, cleared by Seller. FIFO queue.
// =============================================================================

use super::StateDir;
use crate::types::SellSignal;

const FILE: &str = "sell_signals.json";

pub fn load(dir: &StateDir) -> Vec<SellSignal> {
    super::atomic::read_or_default(dir.path(FILE), Vec::new(), dir.lock_timeout)
}

/// Append one new exit signal. Never mutates an existing entry (spec §4.4
/// step 5).
pub fn append(dir: &StateDir, signal: SellSignal) -> anyhow::Result<()> {
    let mut signals = load(dir);
    signals.push(signal);
    super::atomic::write_atomic(dir.path(FILE), &signals, dir.lock_timeout)
}

/// Rewrite the file with only the entries that are still pending, in their
/// original (FIFO) order — the Seller's "clear processed entries" step
/// (spec §4.5 step 4).
pub fn retain_pending(dir: &StateDir, still_pending: &[SellSignal]) -> anyhow::Result<()> {
    super::atomic::write_atomic(dir.path(FILE), &still_pending, dir.lock_timeout)
}
