use common::Bar;

/// Supertrend line over a bar series: ATR bands around the bar midpoint,
/// with the usual band-carry rules.
///
/// True range uses the previous close; the ATR is a simple rolling mean of
/// it over `atr_period`. The basic bands sit `multiplier * ATR` either side
/// of `(high + low) / 2`. The upper band only ratchets down while the close
/// stays at or under it, the lower band only ratchets up while the close
/// stays at or over it, and the reported line is the upper band until the
/// close breaks above it.
///
/// Returns `None` until `atr_period` bars are available.
pub fn supertrend(bars: &[Bar], atr_period: usize, multiplier: f64) -> Option<f64> {
    if atr_period < 2 || bars.len() < atr_period {
        return None;
    }

    let true_ranges: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let range = bar.high - bar.low;
            if i == 0 {
                range
            } else {
                let prev_close = bars[i - 1].close;
                range
                    .max((bar.high - prev_close).abs())
                    .max((bar.low - prev_close).abs())
            }
        })
        .collect();

    let start = atr_period - 1;
    let mut upper = 0.0;
    let mut lower = 0.0;
    let mut line = 0.0;
    for i in start..bars.len() {
        let atr: f64 =
            true_ranges[i + 1 - atr_period..=i].iter().sum::<f64>() / atr_period as f64;
        let mid = (bars[i].high + bars[i].low) / 2.0;
        let basic_upper = mid + multiplier * atr;
        let basic_lower = mid - multiplier * atr;

        if i == start {
            upper = basic_upper;
            lower = basic_lower;
        } else {
            let prev_close = bars[i - 1].close;
            upper = if prev_close <= upper {
                basic_upper.min(upper)
            } else {
                basic_upper
            };
            lower = if prev_close >= lower {
                basic_lower.max(lower)
            } else {
                basic_lower
            };
        }

        line = if bars[i].close <= upper { upper } else { lower };
    }
    Some(line)
}
