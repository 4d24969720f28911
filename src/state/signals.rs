// =============================================================================
// signals.json — written (overwritten) by Scanner, read by Buyer
// =============================================================================

use super::StateDir;
use crate::types::Signal;

const FILE: &str = "signals.json";

pub fn load(dir: &StateDir) -> Vec<Signal> {
    super::atomic::read_or_default(dir.path(FILE), Vec::new(), dir.lock_timeout)
}

/// Overwrite the whole file with this cycle's surviving signals (spec §4.2
/// step 6: "Atomically write surviving signals ... (overwrite)").
pub fn save(dir: &StateDir, signals: &[Signal]) -> anyhow::Result<()> {
    super::atomic::write_atomic(dir.path(FILE), &signals, dir.lock_timeout)
}

/// Discard signals older than `max_age_seconds` relative to `now` (spec
/// invariant 4 / §4.3 step 1).
pub fn discard_stale(signals: Vec<Signal>, now: i64, max_age_seconds: i64) -> Vec<Signal> {
    signals
        .into_iter()
        .filter(|s| now - s.timestamp <= max_age_seconds)
        .collect()
}
