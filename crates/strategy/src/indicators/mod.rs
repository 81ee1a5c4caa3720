pub mod ema;
pub mod supertrend;
pub mod zscore;

pub use ema::ema;
pub use supertrend::supertrend;
pub use zscore::z_score;

/// Derived signals recomputed wholesale from the bar window each cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    /// Fast EMA of the closes over the full window — the profit target.
    pub ema_fast: f64,
    /// Rolling z-score of the last close. Exactly 0.0 when the rolling
    /// standard deviation is zero; callers treat 0.0 as "no signal".
    pub z_score: f64,
    pub sample_count: usize,
}

/// Pure function from a close-price window to an [`IndicatorSnapshot`].
#[derive(Debug, Clone, Copy)]
pub struct IndicatorEngine {
    /// Z-score rolling lookback (default 20).
    pub lookback: usize,
    /// Fast EMA span (default 9).
    pub ema_span: usize,
}

impl IndicatorEngine {
    pub fn new(lookback: usize, ema_span: usize) -> Self {
        assert!(lookback >= 2, "z-score lookback must be >= 2");
        assert!(ema_span >= 1, "EMA span must be >= 1");
        Self { lookback, ema_span }
    }

    /// Returns `None` while fewer than `lookback` closes are available.
    pub fn compute(&self, closes: &[f64]) -> Option<IndicatorSnapshot> {
        let z = z_score(closes, self.lookback)?;
        Some(IndicatorSnapshot {
            ema_fast: ema(closes, self.ema_span),
            z_score: z,
            sample_count: closes.len(),
        })
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(20, 9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_yields_none() {
        let engine = IndicatorEngine::new(20, 9);
        let closes = vec![100.0; 19];
        assert!(engine.compute(&closes).is_none());
    }

    #[test]
    fn snapshot_carries_sample_count() {
        let engine = IndicatorEngine::new(5, 3);
        let closes: Vec<f64> = (0..8).map(|i| 100.0 + i as f64).collect();
        let snap = engine.compute(&closes).unwrap();
        assert_eq!(snap.sample_count, 8);
        assert!(snap.ema_fast.is_finite());
        assert!(snap.z_score.is_finite());
    }

    #[test]
    fn flat_window_has_zero_z_score() {
        let engine = IndicatorEngine::new(20, 9);
        let closes = vec![100.0; 25];
        let snap = engine.compute(&closes).unwrap();
        assert_eq!(snap.z_score, 0.0);
        assert!((snap.ema_fast - 100.0).abs() < 1e-12);
    }
}
