// =============================================================================
// Relative volume, velocity, and acceleration (GLOSSARY)
// =============================================================================

use crate::broker::Bar;

/// Current bar volume divided by the mean of the preceding `window` bar
/// volumes (default window: 20, per GLOSSARY "Relative volume").
///
/// `bars` must be chronological, most recent last. Returns `None` if there
/// are fewer than `window + 1` bars or the trailing mean is zero.
pub fn relative_volume(bars: &[Bar], window: usize) -> Option<f64> {
    if window == 0 || bars.len() < window + 1 {
        return None;
    }
    let current = bars.last()?.v;
    let preceding = &bars[bars.len() - 1 - window..bars.len() - 1];
    let mean: f64 = preceding.iter().map(|b| b.v).sum::<f64>() / window as f64;
    if mean <= 0.0 {
        return None;
    }
    Some(current / mean)
}

/// Average per-period percentage price change over the last `periods` bars
/// (GLOSSARY "Velocity"). Returns `None` if there's not enough history or
/// the starting close is non-positive.
pub fn velocity(closes: &[f64], periods: usize) -> Option<f64> {
    if periods == 0 || closes.len() < periods + 1 {
        return None;
    }
    let window = &closes[closes.len() - periods - 1..];
    let mut total_pct_change = 0.0;
    for pair in window.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if prev <= 0.0 {
            return None;
        }
        total_pct_change += (cur - prev) / prev;
    }
    Some(total_pct_change / periods as f64)
}

/// Ratio of 2-minute velocity to 5-minute velocity; `< 1` means momentum is
/// fading (GLOSSARY "Acceleration"). Expects `closes` sampled at 1-minute
/// resolution so 2 and 5 periods correspond to 2-minute / 5-minute windows.
///
/// Returns `None` when either velocity is unavailable, or when the 5-minute
/// velocity is ~0 (division would be meaningless).
pub fn acceleration(closes_1min: &[f64]) -> Option<f64> {
    let v2 = velocity(closes_1min, 2)?;
    let v5 = velocity(closes_1min, 5)?;
    if v5.abs() < 1e-12 {
        return None;
    }
    Some(v2 / v5)
}
