// =============================================================================
// daily_watchlist.json — written by PreMarketScanner, read by Scanner
// =============================================================================

use super::StateDir;
use crate::types::DailyWatchlist;

const FILE: &str = "daily_watchlist.json";

/// Load today's watchlist, or `None` if none has been written for `today`
/// (`YYYY-MM-DD`) yet — the Scanner falls back to the base universe head in
/// that case (spec §4.2 step 1).
pub fn load_for_date(dir: &StateDir, today: &str) -> Option<DailyWatchlist> {
    let wl: Option<DailyWatchlist> =
        super::atomic::read_or_default(dir.path(FILE), None, dir.lock_timeout);
    wl.filter(|w| w.date == today)
}

/// Write today's watchlist atomically. Per spec invariant 7, callers must
/// ensure this is only invoked once per trading date — enforced by the
/// PreMarketScanner service checking `load_for_date` first.
pub fn save(dir: &StateDir, watchlist: &DailyWatchlist) -> anyhow::Result<()> {
    super::atomic::write_atomic(dir.path(FILE), watchlist, dir.lock_timeout)
}
