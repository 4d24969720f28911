// =============================================================================
// positions.json — created by Buyer, mutated (stops) by Monitor, removed by
// Seller. Keyed by symbol; at most one open position per symbol.
// =============================================================================

use std::collections::HashMap;

use super::StateDir;
use crate::types::Position;

const FILE: &str = "positions.json";

pub fn load(dir: &StateDir) -> HashMap<String, Position> {
    super::atomic::read_or_default(dir.path(FILE), HashMap::new(), dir.lock_timeout)
}

pub fn save(dir: &StateDir, positions: &HashMap<String, Position>) -> anyhow::Result<()> {
    super::atomic::write_atomic(dir.path(FILE), positions, dir.lock_timeout)
}

/// Insert a newly-filled position. Returns an error if one already exists
/// for the symbol (spec invariant 1: at most one open position per symbol).
pub fn insert_new(dir: &StateDir, position: Position) -> anyhow::Result<()> {
    let mut positions = load(dir);
    if positions.contains_key(&position.symbol) {
        anyhow::bail!(
            "refusing to open duplicate position for {}",
            position.symbol
        );
    }
    positions.insert(position.symbol.clone(), position);
    save(dir, &positions)
}

/// Remove a position (Seller, after a confirmed exit fill).
pub fn remove(dir: &StateDir, symbol: &str) -> anyhow::Result<Option<Position>> {
    let mut positions = load(dir);
    let removed = positions.remove(symbol);
    save(dir, &positions)?;
    Ok(removed)
}

/// Apply the monotonic stop ratchet for one symbol. `update` receives the
/// current stop and returns the candidate new stop; the write only happens
/// if the candidate is strictly greater (spec §4.4 "Invariant enforcement").
pub fn ratchet_stop(
    dir: &StateDir,
    symbol: &str,
    update: impl FnOnce(&Position) -> f64,
) -> anyhow::Result<Option<f64>> {
    let mut positions = load(dir);
    let Some(position) = positions.get_mut(symbol) else {
        return Ok(None);
    };

    let candidate = update(position);
    if candidate > position.current_stop {
        position.current_stop = candidate;
        save(dir, &positions)?;
        return Ok(Some(candidate));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(symbol: &str, entry: f64, stop: f64) -> Position {
        Position {
            symbol: symbol.into(),
            entry_price: entry,
            quantity: 100,
            entry_time: 0,
            current_stop: stop,
            peak_price: entry,
            signal_score: 70.0,
            signal_price: entry,
            vwap_at_entry: entry,
            rsi_at_entry: 55.0,
            breakout_pct: 0.02,
        }
    }

    fn scratch() -> StateDir {
        let root = std::env::temp_dir().join(format!("aurora-pos-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        StateDir::new(root, std::time::Duration::from_secs(5))
    }

    #[test]
    fn duplicate_position_rejected() {
        let dir = scratch();
        insert_new(&dir, pos("AAA", 10.0, 9.75)).unwrap();
        assert!(insert_new(&dir, pos("AAA", 11.0, 10.5)).is_err());
    }

    #[test]
    fn stop_only_moves_up() {
        let dir = scratch();
        insert_new(&dir, pos("AAA", 10.0, 9.75)).unwrap();

        let moved = ratchet_stop(&dir, "AAA", |_| 10.00).unwrap();
        assert_eq!(moved, Some(10.00));

        let not_moved = ratchet_stop(&dir, "AAA", |_| 9.90).unwrap();
        assert_eq!(not_moved, None);
        assert_eq!(load(&dir)["AAA"].current_stop, 10.00);
    }

    #[test]
    fn remove_returns_removed_position() {
        let dir = scratch();
        insert_new(&dir, pos("AAA", 10.0, 9.75)).unwrap();
        let removed = remove(&dir, "AAA").unwrap();
        assert!(removed.is_some());
        assert!(!load(&dir).contains_key("AAA"));
    }
}
