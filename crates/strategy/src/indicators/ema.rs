/// Recursive exponential moving average over the full window, smoothing
/// factor `2 / (span + 1)`, seeded with the first close.
///
/// This matches the pandas `ewm(span=span, adjust=False)` recursion the
/// profit-target reference is defined by; the seeding choice only affects
/// early values but is reproduced for bit-compatible output.
pub fn ema(closes: &[f64], span: usize) -> f64 {
    let Some(&first) = closes.first() else {
        return 0.0;
    };
    let k = 2.0 / (span as f64 + 1.0);
    closes[1..]
        .iter()
        .fold(first, |acc, &close| close * k + acc * (1.0 - k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_is_zero() {
        assert_eq!(ema(&[], 9), 0.0);
    }

    #[test]
    fn single_value_is_itself() {
        assert_eq!(ema(&[42.0], 9), 42.0);
    }

    #[test]
    fn constant_series_stays_constant() {
        let closes = vec![100.0; 50];
        assert!((ema(&closes, 9) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn matches_pandas_ewm_adjust_false() {
        // ewm(span=3, adjust=False) over [1, 2, 3]: k = 0.5
        // e0 = 1, e1 = 2*0.5 + 1*0.5 = 1.5, e2 = 3*0.5 + 1.5*0.5 = 2.25
        let value = ema(&[1.0, 2.0, 3.0], 3);
        assert!((value - 2.25).abs() < 1e-12);
    }

    #[test]
    fn converges_toward_recent_prices() {
        // Long flat run then a jump: EMA moves toward the new level but lags.
        let mut closes = vec![100.0; 30];
        closes.extend([110.0; 5]);
        let value = ema(&closes, 9);
        assert!(value > 100.0 && value < 110.0);
    }
}
