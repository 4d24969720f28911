// =============================================================================
// Base universe loader — read-only input produced weekly by an external
// builder (out of scope here; spec §1 "Out of scope")
// =============================================================================

use std::path::Path;

use tracing::warn;

/// Read `universes/base_universe/base_universe.txt` (one ticker per line).
/// Blank lines and `#`-prefixed comments are ignored. Missing file yields an
/// empty universe with a logged warning rather than an error — PreMarketScanner
/// treats that as "nothing to scan today", not a crash.
pub fn load_base_universe(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "base universe file unreadable");
            return Vec::new();
        }
    };

    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_uppercase())
        .collect()
}
