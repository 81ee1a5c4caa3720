use std::collections::HashMap;

use common::{ContractId, OptionRight, Quote};

/// Price level at which the minimum tick switches from $0.05 to $0.10.
const TICK_BREAKPOINT: f64 = 3.00;

/// Round a limit price to the instrument's minimum tick increment:
/// below $3.00 to the nearest $0.05, at or above to the nearest $0.10.
pub fn round_to_tick(price: f64) -> f64 {
    if price >= TICK_BREAKPOINT {
        (price / 0.10).round() * 0.10
    } else {
        (price / 0.05).round() * 0.05
    }
}

/// Pick the contract of the given right whose live delta is closest in
/// absolute difference to `target_delta`. Contracts with a delta of exactly
/// zero have no computed greeks yet and are excluded.
pub fn select_by_delta<'a>(
    quotes: &'a HashMap<ContractId, Quote>,
    right: OptionRight,
    target_delta: f64,
) -> Option<(&'a ContractId, &'a Quote)> {
    quotes
        .iter()
        .filter(|(id, quote)| id.right == right && quote.delta != 0.0)
        .min_by(|(_, a), (_, b)| {
            let da = (a.delta - target_delta).abs();
            let db = (b.delta - target_delta).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rounds_to_nickel_below_three_dollars() {
        assert!(approx(round_to_tick(2.97), 2.95));
        assert!(approx(round_to_tick(2.98), 3.00));
        assert!(approx(round_to_tick(0.07), 0.05));
        assert!(approx(round_to_tick(0.08), 0.10));
    }

    #[test]
    fn rounds_to_dime_at_or_above_three_dollars() {
        assert!(approx(round_to_tick(5.03), 5.00));
        assert!(approx(round_to_tick(5.07), 5.10));
        assert!(approx(round_to_tick(3.00), 3.00));
    }

    fn chain() -> HashMap<ContractId, Quote> {
        let mut quotes = HashMap::new();
        for (strike, delta) in [(5880, 0.62), (5900, 0.48), (5920, 0.33)] {
            quotes.insert(
                ContractId::new("SPX", strike, OptionRight::Call, "20250613"),
                Quote {
                    delta,
                    ask: 2.0,
                    bid: 1.8,
                    ..Quote::default()
                },
            );
        }
        for (strike, delta) in [(5880, -0.37), (5900, -0.51)] {
            quotes.insert(
                ContractId::new("SPX", strike, OptionRight::Put, "20250613"),
                Quote {
                    delta,
                    ask: 2.0,
                    bid: 1.8,
                    ..Quote::default()
                },
            );
        }
        quotes
    }

    #[test]
    fn picks_call_closest_to_target_delta() {
        let quotes = chain();
        let (id, _) = select_by_delta(&quotes, OptionRight::Call, 0.45).unwrap();
        assert_eq!(id.strike, 5900);
    }

    #[test]
    fn picks_put_closest_to_negative_target() {
        let quotes = chain();
        let (id, _) = select_by_delta(&quotes, OptionRight::Put, -0.45).unwrap();
        // |-0.51 - (-0.45)| = 0.06 beats |-0.37 - (-0.45)| = 0.08
        assert_eq!(id.strike, 5900);
    }

    #[test]
    fn excludes_unquoted_zero_delta_contracts() {
        let mut quotes = HashMap::new();
        quotes.insert(
            ContractId::new("SPX", 5900, OptionRight::Call, "20250613"),
            Quote::default(), // delta 0.0 — greeks not yet computed
        );
        assert!(select_by_delta(&quotes, OptionRight::Call, 0.45).is_none());
    }

    #[test]
    fn empty_chain_selects_nothing() {
        let quotes = HashMap::new();
        assert!(select_by_delta(&quotes, OptionRight::Put, -0.45).is_none());
    }
}
