use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use common::{
    Bar, ContractId, ExecutionGateway, GatewayEvent, OptionRight, OrderEvent, OrderSide,
    OrderStatus, Settings, TradeStatus,
};
use strategy::indicators::{ema, z_score, IndicatorEngine};
use strategy::pricing::round_to_tick;
use strategy::signal::crossing;
use strategy::{GammaSnapStrategy, MarketState, Strategy};

/// Counts submissions by side; every order is accepted.
struct CountingGateway {
    next_id: AtomicU64,
    buys: AtomicUsize,
    sells: AtomicUsize,
}

impl CountingGateway {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            buys: AtomicUsize::new(0),
            sells: AtomicUsize::new(0),
        }
    }

    fn buy_count(&self) -> usize {
        self.buys.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionGateway for CountingGateway {
    fn is_connected(&self) -> bool {
        true
    }

    fn is_data_confirmed(&self) -> bool {
        true
    }

    async fn submit_order(
        &self,
        _contract: &ContractId,
        side: OrderSide,
        _quantity: u32,
        _limit_price: f64,
    ) -> common::Result<u64> {
        match side {
            OrderSide::Buy => self.buys.fetch_add(1, Ordering::SeqCst),
            OrderSide::Sell => self.sells.fetch_add(1, Ordering::SeqCst),
        };
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn cancel_order(&self, _order_id: u64) -> common::Result<()> {
        Ok(())
    }
}

fn lifecycle_settings() -> Settings {
    let mut settings = Settings::default();
    settings.z_score_period = 5;
    settings.z_score_threshold = 1.0;
    settings.window_start_hour = 0;
    settings.window_end_hour = 24;
    settings.vix_threshold = 100.0;
    settings.time_stop_minutes = 2;
    settings
}

fn quoted_market() -> MarketState {
    let mut market = MarketState::new(50);
    market.apply(&GatewayEvent::IndexPrice(100.0));
    for (strike, right, delta) in [(5900, OptionRight::Call, 0.45), (5900, OptionRight::Put, -0.45)]
    {
        let contract = ContractId::new("SPX", strike, right, "20250613");
        market.apply(&GatewayEvent::QuoteTick {
            contract: contract.clone(),
            bid: Some(1.80),
            ask: Some(2.00),
            last: Some(1.90),
            volume: Some(100.0),
        });
        market.apply(&GatewayEvent::Greeks {
            contract,
            delta,
            gamma: 0.01,
            theta: -0.4,
            vega: 0.2,
            iv: 0.17,
        });
    }
    market
}

proptest! {
    /// Indicator math must stay finite for any finite positive price window.
    #[test]
    fn indicators_are_finite_on_arbitrary_windows(
        closes in prop::collection::vec(0.01f64..100_000.0f64, 20..120),
    ) {
        let engine = IndicatorEngine::new(20, 9);
        let snap = engine.compute(&closes).unwrap();
        prop_assert!(snap.ema_fast.is_finite());
        prop_assert!(snap.z_score.is_finite());
        prop_assert_eq!(snap.sample_count, closes.len());
    }

    /// The z-score degrades to exactly 0.0, never NaN, when every price in
    /// the lookback is identical.
    #[test]
    fn constant_window_z_is_zero(price in 0.01f64..100_000.0f64, len in 20usize..60) {
        let closes = vec![price; len];
        prop_assert_eq!(z_score(&closes, 20), Some(0.0));
    }

    /// A crossing evaluation can never fire in both directions at once.
    #[test]
    fn crossing_directions_are_mutually_exclusive(
        prev in -10.0f64..10.0f64,
        curr in -10.0f64..10.0f64,
        threshold in 0.1f64..5.0f64,
    ) {
        // Either None or exactly one direction; with threshold > 0 the two
        // rules cannot both hold for the same (prev, curr).
        let long = prev < -threshold && curr > -threshold;
        let short = prev > threshold && curr < threshold;
        prop_assert!(!(long && short));
        prop_assert_eq!(crossing(prev, curr, threshold).is_some(), long || short);
    }

    /// Tick rounding always lands on a valid increment and never moves the
    /// price by more than half a tick.
    #[test]
    fn tick_rounding_stays_on_grid(price in 0.01f64..500.0f64) {
        let rounded = round_to_tick(price);
        let tick = if price >= 3.00 { 0.10 } else { 0.05 };
        let steps = rounded / tick;
        prop_assert!((steps - steps.round()).abs() < 1e-6);
        prop_assert!((rounded - price).abs() <= tick / 2.0 + 1e-9);
    }

    /// The EMA of a window is bounded by the window's extremes.
    #[test]
    fn ema_is_bounded_by_window_extremes(
        closes in prop::collection::vec(0.01f64..100_000.0f64, 1..80),
        span in 1usize..30,
    ) {
        let value = ema(&closes, span);
        let min = closes.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(value >= min - 1e-9 && value <= max + 1e-9);
    }

    /// For arbitrary interleavings of price moves, fills, cancels, and
    /// rejections, the trade lifecycle never works more than one trade: no
    /// entry is ever submitted while a trade is active, every archived
    /// round trip is closed, and every entry is accounted for.
    #[test]
    fn lifecycle_holds_one_trade_under_arbitrary_interleavings(
        steps in prop::collection::vec((-6.0f64..6.0f64, 0u8..4), 1..60),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let mut market = quoted_market();
        let gateway = CountingGateway::new();
        let mut strategy = GammaSnapStrategy::new(lifecycle_settings());
        strategy.set_enabled(true);

        let mut price = 100.0f64;
        let mut now = Utc.with_ymd_and_hms(2025, 6, 13, 12, 0, 0).unwrap();
        let mut entry_cancels = 0usize;

        for (jump, resolution) in steps {
            now += Duration::minutes(1);
            price = (price + jump).max(1.0);
            market.apply(&GatewayEvent::Bar(Bar {
                timestamp: now,
                open: price,
                high: price,
                low: price,
                close: price,
            }));

            let had_active = strategy.active_trade().is_some();
            let buys_before = gateway.buy_count();
            rt.block_on(strategy.evaluate(&market, &gateway, now));
            let buys_after = gateway.buy_count();

            // An active trade blocks the scanner outright
            prop_assert!(!(had_active && buys_after > buys_before));

            // Resolve the working order, if any, per the generated action
            let working = strategy.active_trade().map(|t| {
                (t.status, t.entry_order_id, t.exit_order_id)
            });
            if let Some((status, entry_id, exit_id)) = working {
                let order_id = match status {
                    TradeStatus::EntrySubmitted => Some(entry_id),
                    TradeStatus::ExitSubmitted => exit_id,
                    _ => None,
                };
                let event_status = match resolution {
                    0 => Some(OrderStatus::Filled),
                    1 => Some(OrderStatus::Cancelled),
                    2 => Some(OrderStatus::Rejected),
                    _ => None, // leave the order working
                };
                if let (Some(order_id), Some(event_status)) = (order_id, event_status) {
                    if status == TradeStatus::EntrySubmitted
                        && event_status != OrderStatus::Filled
                    {
                        entry_cancels += 1;
                    }
                    strategy.on_order_event(
                        &OrderEvent {
                            order_id,
                            status: event_status,
                            avg_fill_price: 2.00,
                        },
                        now,
                    );
                }
            }

            // Archived trades are complete round trips
            prop_assert!(strategy
                .history()
                .iter()
                .all(|t| t.status == TradeStatus::Closed && t.exit_price.is_some()));
        }

        // Every entry ended up exactly one place: archived, cancelled back
        // to idle, or still the single active trade.
        let active = usize::from(strategy.active_trade().is_some());
        prop_assert_eq!(
            gateway.buy_count(),
            strategy.history().len() + entry_cancels + active
        );
    }
}
