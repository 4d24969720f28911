// =============================================================================
// cooldowns.json — written by Seller, read-only for Buyer. Expired entries
// are removed lazily on the next write (spec §9 "Global mutable state").
// =============================================================================

use std::collections::HashMap;

use super::StateDir;
use crate::types::Cooldown;

const FILE: &str = "cooldowns.json";

pub fn load(dir: &StateDir) -> HashMap<String, Cooldown> {
    super::atomic::read_or_default(dir.path(FILE), HashMap::new(), dir.lock_timeout)
}

/// Buyer-side read-only check: is `symbol` still cooling down at `now`?
pub fn is_cooling_down(dir: &StateDir, symbol: &str, now: i64) -> bool {
    load(dir)
        .get(symbol)
        .map(|c| now < c.until)
        .unwrap_or(false)
}

/// Seller-side write: start (or refresh) a symbol's cooldown, and sweep any
/// other entries that have already expired.
pub fn start_cooldown(dir: &StateDir, symbol: &str, until: i64, now: i64) -> anyhow::Result<()> {
    let mut cooldowns = load(dir);
    cooldowns.retain(|_, c| c.until > now);
    cooldowns.insert(symbol.to_string(), Cooldown { until });
    super::atomic::write_atomic(dir.path(FILE), &cooldowns, dir.lock_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> StateDir {
        let root = std::env::temp_dir().join(format!("aurora-cd-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        StateDir::new(root, std::time::Duration::from_secs(5))
    }

    #[test]
    fn symbol_in_cooldown_blocks_buy() {
        let dir = scratch();
        start_cooldown(&dir, "AAA", 1_000, 0).unwrap();
        assert!(is_cooling_down(&dir, "AAA", 500));
        assert!(!is_cooling_down(&dir, "AAA", 1_500));
    }

    #[test]
    fn expired_entries_are_swept_on_write() {
        let dir = scratch();
        start_cooldown(&dir, "AAA", 100, 0).unwrap();
        start_cooldown(&dir, "BBB", 2_000, 200).unwrap();
        let remaining = load(&dir);
        assert!(!remaining.contains_key("AAA"));
        assert!(remaining.contains_key("BBB"));
    }
}
