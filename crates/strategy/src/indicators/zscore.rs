/// Rolling z-score of the last close over the trailing `lookback` closes.
///
/// Returns `None` with fewer than `lookback` values. Uses the sample
/// standard deviation (ddof = 1), matching a pandas rolling `.std()`.
/// A zero standard deviation yields `0.0`, never NaN or infinity — callers
/// must treat that as "no signal", not a valid extreme reading.
pub fn z_score(closes: &[f64], lookback: usize) -> Option<f64> {
    if lookback < 2 || closes.len() < lookback {
        return None;
    }
    let window = &closes[closes.len() - lookback..];
    let mean = window.iter().sum::<f64>() / lookback as f64;
    let variance = window
        .iter()
        .map(|&c| (c - mean) * (c - mean))
        .sum::<f64>()
        / (lookback - 1) as f64;
    let std = variance.sqrt();
    let last = window[lookback - 1];

    if std > 0.0 {
        Some((last - mean) / std)
    } else {
        Some(0.0)
    }
}
