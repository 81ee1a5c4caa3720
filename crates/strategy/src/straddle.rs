use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use tracing::{info, warn};

use common::{
    Bar, ContractId, ExecutionGateway, OptionRight, OrderEvent, OrderSide, OrderStatus, Settings,
    StrategyStatus,
};

use crate::indicators::supertrend;
use crate::market::MarketState;
use crate::pricing::round_to_tick;
use crate::Strategy;

/// One leg of a straddle.
#[derive(Debug, Clone)]
pub struct StraddleLeg {
    pub contract: ContractId,
    pub order_id: u64,
    pub limit_price: f64,
    pub fill_price: Option<f64>,
    pub exit_order_id: Option<u64>,
    pub exit_price: Option<f64>,
}

impl StraddleLeg {
    fn new(contract: ContractId, order_id: u64, limit_price: f64) -> Self {
        Self {
            contract,
            order_id,
            limit_price,
            fill_price: None,
            exit_order_id: None,
            exit_price: None,
        }
    }

    /// Filled, not yet sold, and with no exit order working.
    fn holds_position(&self) -> bool {
        self.fill_price.is_some() && self.exit_order_id.is_none() && self.exit_price.is_none()
    }
}

/// A recorded two-leg straddle entry.
#[derive(Debug, Clone)]
pub struct StraddlePosition {
    pub call: StraddleLeg,
    pub put: StraddleLeg,
    pub entry_time: DateTime<Utc>,
}

/// Time-triggered long straddle: once per hour, buy the cheapest call and
/// the cheapest put whose ask is positive and at or below the configured
/// ceiling.
///
/// Each filled leg is then managed independently: a supertrend line (ATR
/// bands around the bar midpoint) is computed from the contract's own bars,
/// and the leg is sold at the bid when its close drops below the line.
pub struct StraddleStrategy {
    settings: Settings,
    enabled: bool,
    last_trade_hour: Option<u32>,
    positions: Vec<StraddlePosition>,
    status: StrategyStatus,
}

impl StraddleStrategy {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            enabled: false,
            last_trade_hour: None,
            positions: Vec::new(),
            status: StrategyStatus::Inactive,
        }
    }

    pub fn positions(&self) -> &[StraddlePosition] {
        &self.positions
    }

    /// Cheapest contract of the given right with `0 < ask <= max_ask`.
    fn cheapest_leg(
        market: &MarketState,
        right: OptionRight,
        max_ask: f64,
    ) -> Option<(ContractId, f64)> {
        market
            .quotes()
            .iter()
            .filter(|(id, q)| id.right == right && q.ask > 0.0 && q.ask <= max_ask)
            .min_by(|(_, a), (_, b)| {
                a.ask
                    .partial_cmp(&b.ask)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(id, q)| (id.clone(), q.ask))
    }

    async fn enter_straddle(
        &mut self,
        market: &MarketState,
        gateway: &dyn ExecutionGateway,
        now: DateTime<Utc>,
    ) {
        if !gateway.is_connected() || !gateway.is_data_confirmed() {
            warn!("Cannot enter straddle: gateway not ready");
            return;
        }

        let max_ask = self.settings.straddle_max_ask;
        let call = Self::cheapest_leg(market, OptionRight::Call, max_ask);
        let put = Self::cheapest_leg(market, OptionRight::Put, max_ask);

        let (Some((call_id, call_ask)), Some((put_id, put_ask))) = (call, put) else {
            warn!(max_ask, "Straddle entry skipped: no suitable legs found");
            return;
        };

        info!(
            call = %call_id,
            put = %put_id,
            total_cost = call_ask + put_ask,
            "Straddle selected"
        );

        let qty = self.settings.trade_qty;
        let call_limit = round_to_tick(call_ask);
        let put_limit = round_to_tick(put_ask);

        let call_order = match gateway
            .submit_order(&call_id, OrderSide::Buy, qty, call_limit)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Straddle call order failed");
                return;
            }
        };
        let put_order = match gateway
            .submit_order(&put_id, OrderSide::Buy, qty, put_limit)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Straddle put order failed; call leg is working alone");
                return;
            }
        };

        self.positions.push(StraddlePosition {
            call: StraddleLeg::new(call_id, call_order, call_limit),
            put: StraddleLeg::new(put_id, put_order, put_limit),
            entry_time: now,
        });
        info!(call_order, put_order, "Straddle orders placed");
    }

    /// Check every held leg against its supertrend and sell the ones whose
    /// close has dropped below the line.
    async fn manage_exits(&mut self, market: &MarketState, gateway: &dyn ExecutionGateway) {
        let atr_period = self.settings.atr_period;
        let multiplier = self.settings.chandelier_multiplier;
        let qty = self.settings.trade_qty;

        let mut exits: Vec<(usize, OptionRight, ContractId, f64)> = Vec::new();
        for (idx, position) in self.positions.iter().enumerate() {
            let legs = [
                (OptionRight::Call, &position.call),
                (OptionRight::Put, &position.put),
            ];
            for (right, leg) in legs {
                if !leg.holds_position() {
                    continue;
                }
                let Some(window) = market.contract_bars(&leg.contract) else {
                    continue;
                };
                let bars: Vec<Bar> = window.iter().copied().collect();
                let Some(line) = supertrend(&bars, atr_period, multiplier) else {
                    continue;
                };
                let close = bars[bars.len() - 1].close;
                if close >= line {
                    continue;
                }
                let Some(quote) = market.quote(&leg.contract) else {
                    warn!(contract = %leg.contract, "Supertrend exit blocked: no quote");
                    continue;
                };
                if quote.bid <= 0.0 {
                    warn!(contract = %leg.contract, "Supertrend exit blocked: no valid bid");
                    continue;
                }
                info!(
                    contract = %leg.contract,
                    close,
                    line,
                    "Supertrend exit signal"
                );
                exits.push((idx, right, leg.contract.clone(), quote.bid));
            }
        }

        for (idx, right, contract, bid) in exits {
            let mut limit = round_to_tick(bid);
            if limit <= 0.0 {
                limit = 0.01;
            }
            match gateway
                .submit_order(&contract, OrderSide::Sell, qty, limit)
                .await
            {
                Ok(order_id) => {
                    let position = &mut self.positions[idx];
                    let leg = match right {
                        OptionRight::Call => &mut position.call,
                        OptionRight::Put => &mut position.put,
                    };
                    leg.exit_order_id = Some(order_id);
                    info!(contract = %contract, order_id, limit, "Leg exit order placed");
                }
                Err(e) => warn!(contract = %contract, error = %e, "Leg exit order failed"),
            }
        }
    }
}

#[async_trait]
impl Strategy for StraddleStrategy {
    fn name(&self) -> &str {
        "hourly-straddle"
    }

    fn status(&self) -> StrategyStatus {
        self.status.clone()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.status = StrategyStatus::Inactive;
        }
    }

    fn apply_settings(&mut self, settings: &Settings) {
        self.settings = settings.clone();
    }

    fn on_order_event(&mut self, event: &OrderEvent, _now: DateTime<Utc>) {
        for position in &mut self.positions {
            for leg in [&mut position.call, &mut position.put] {
                if leg.order_id == event.order_id {
                    if event.status == OrderStatus::Filled {
                        leg.fill_price = Some(event.avg_fill_price);
                    }
                } else if leg.exit_order_id == Some(event.order_id) {
                    match event.status {
                        OrderStatus::Filled => {
                            leg.exit_price = Some(event.avg_fill_price);
                            info!(
                                contract = %leg.contract,
                                price = event.avg_fill_price,
                                "Leg exit filled"
                            );
                        }
                        // Cleared so the next cycle can re-price the exit.
                        OrderStatus::Cancelled | OrderStatus::Rejected => {
                            leg.exit_order_id = None;
                        }
                        OrderStatus::Submitted => {}
                    }
                }
            }
        }
    }

    async fn evaluate(
        &mut self,
        market: &MarketState,
        gateway: &dyn ExecutionGateway,
        now: DateTime<Utc>,
    ) {
        if !self.enabled {
            self.status = StrategyStatus::Inactive;
            return;
        }
        self.status = StrategyStatus::Scanning;

        // Held legs are managed every cycle, not just on the hour.
        self.manage_exits(market, gateway).await;

        // Entries trigger once per hour, on the minute-zero evaluation.
        if now.minute() != 0 || self.last_trade_hour == Some(now.hour()) {
            return;
        }
        self.last_trade_hour = Some(now.hour());
        info!(hour = now.hour(), "Hourly straddle trigger");
        self.enter_straddle(market, gateway, now).await;
    }
}
