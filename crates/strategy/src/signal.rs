use chrono::{DateTime, Utc};

use common::{Direction, Signal};

use crate::indicators::z_score;

/// Detects z-score threshold *crossings* between the two most recent bars.
///
/// A crossing, not mere threshold membership, prevents re-firing on every
/// cycle while the score stays beyond the band: a series that dives below
/// the negative band and stays there fires exactly once, on the bar that
/// comes back through it.
#[derive(Debug, Clone, Copy)]
pub struct SignalGenerator {
    pub lookback: usize,
    pub threshold: f64,
}

impl SignalGenerator {
    pub fn new(lookback: usize, threshold: f64) -> Self {
        assert!(threshold > 0.0, "z-score threshold must be > 0");
        Self { lookback, threshold }
    }

    /// Scan the close series for an entry crossing. Needs `lookback + 1`
    /// closes so both the current and previous z-score exist.
    pub fn scan(&self, closes: &[f64], now: DateTime<Utc>) -> Option<Signal> {
        if closes.len() < self.lookback + 1 {
            return None;
        }
        let curr = z_score(closes, self.lookback)?;
        let prev = z_score(&closes[..closes.len() - 1], self.lookback)?;

        crossing(prev, curr, self.threshold).map(|direction| Signal {
            direction,
            triggered_at: now,
        })
    }
}

/// Pure crossing test over two consecutive z-scores.
///
/// LONG: crossed upward through the negative band. SHORT: crossed downward
/// through the positive band. With threshold > 0 the two are mutually
/// exclusive in a single evaluation.
pub fn crossing(prev: f64, curr: f64, threshold: f64) -> Option<Direction> {
    if prev < -threshold && curr > -threshold {
        Some(Direction::Long)
    } else if prev > threshold && curr < threshold {
        Some(Direction::Short)
    } else {
        None
    }
}
