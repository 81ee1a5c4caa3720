use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::{error, info, warn};

use common::{
    Direction, ExecutionGateway, ExitReason, OptionRight, OrderEvent, OrderSide, OrderStatus,
    Settings, StrategyStatus, TradeRecord, TradeStatus,
};

use crate::indicators::{IndicatorEngine, IndicatorSnapshot};
use crate::market::MarketState;
use crate::pricing::{round_to_tick, select_by_delta};
use crate::signal::SignalGenerator;
use crate::Strategy;

/// Z-score mean-reversion strategy with a delta-targeted option entry and a
/// profit-target / time-stop exit.
///
/// The trade lifecycle runs Idle → EntrySubmitted → Open → ExitSubmitted →
/// Closed, with at most one trade active at a time. While a trade is active
/// the cycle manages its exit; only an idle cycle scans for new entries, and
/// entry scanning is additionally gated by the trading window, the
/// volatility index, and the minimum-data requirement. Exit management is
/// never gated: a high VIX or a closed window must not leave an open
/// position unmanaged.
pub struct GammaSnapStrategy {
    settings: Settings,
    indicators: IndicatorEngine,
    signals: SignalGenerator,
    enabled: bool,
    active: Option<TradeRecord>,
    history: Vec<TradeRecord>,
    status: StrategyStatus,
    last_snapshot: Option<IndicatorSnapshot>,
}

impl GammaSnapStrategy {
    pub fn new(settings: Settings) -> Self {
        let indicators = IndicatorEngine::new(settings.z_score_period, settings.ema_span);
        let signals = SignalGenerator::new(settings.z_score_period, settings.z_score_threshold);
        Self {
            settings,
            indicators,
            signals,
            enabled: false,
            active: None,
            history: Vec::new(),
            status: StrategyStatus::Inactive,
            last_snapshot: None,
        }
    }

    fn within_trading_window(&self, now: DateTime<Utc>) -> bool {
        let hour = now.hour();
        hour >= self.settings.window_start_hour && hour < self.settings.window_end_hour
    }

    /// Scan for a crossing signal and submit the entry order.
    async fn scan_for_entry(
        &mut self,
        market: &MarketState,
        gateway: &dyn ExecutionGateway,
        now: DateTime<Utc>,
    ) {
        self.status = StrategyStatus::Scanning;

        let closes = market.bars().closes();
        let Some(signal) = self.signals.scan(&closes, now) else {
            return;
        };
        info!(direction = %signal.direction, "Z-score crossing detected");
        self.enter_trade(signal.direction, market, gateway, now).await;
    }

    async fn enter_trade(
        &mut self,
        direction: Direction,
        market: &MarketState,
        gateway: &dyn ExecutionGateway,
        now: DateTime<Utc>,
    ) {
        // Not ready is a silent retry: the crossing is gone next cycle, but
        // a fresh one will fire again.
        if !gateway.is_connected() || !gateway.is_data_confirmed() {
            warn!("Cannot enter: gateway not ready");
            return;
        }

        let (right, target_delta) = match direction {
            Direction::Long => (OptionRight::Call, self.settings.target_delta),
            Direction::Short => (OptionRight::Put, -self.settings.target_delta),
        };

        let Some((contract, quote)) = select_by_delta(market.quotes(), right, target_delta)
        else {
            warn!(right = %right, "Could not find suitable option for entry");
            return;
        };

        // The entry is always a BUY at the ask, for both directions: LONG
        // buys a call, SHORT buys a put.
        let ask = quote.ask;
        if ask <= 0.0 {
            error!(contract = %contract, ask, "Invalid limit price for entry");
            return;
        }
        let limit = round_to_tick(ask);
        let contract = contract.clone();

        match gateway
            .submit_order(&contract, OrderSide::Buy, self.settings.trade_qty, limit)
            .await
        {
            Ok(order_id) => {
                let target = self.last_snapshot.map(|s| s.ema_fast).unwrap_or(0.0);
                info!(
                    contract = %contract,
                    order_id,
                    limit,
                    target,
                    "Entry order submitted"
                );
                self.active = Some(TradeRecord::new(
                    contract,
                    direction,
                    self.settings.trade_qty,
                    order_id,
                    target,
                    now,
                ));
                self.status = StrategyStatus::InTrade(direction);
            }
            Err(e) => warn!(error = %e, "Entry order submission failed"),
        }
    }

    /// Drive the active trade: cancel stale orders, check exit conditions.
    async fn manage_active(
        &mut self,
        market: &MarketState,
        gateway: &dyn ExecutionGateway,
        now: DateTime<Utc>,
    ) {
        let Some(trade) = &self.active else { return };
        let status = trade.status;
        let direction = trade.direction;
        let entry_time = trade.entry_time;
        let entry_order_id = trade.entry_order_id;
        let exit_order_id = trade.exit_order_id;
        let exit_submitted_at = trade.exit_submitted_at;
        self.status = StrategyStatus::InTrade(direction);

        let timeout = Duration::seconds(self.settings.order_timeout_secs);
        match status {
            TradeStatus::EntrySubmitted => {
                if now - entry_time >= timeout {
                    info!(order_id = entry_order_id, "Entry unfilled past timeout, cancelling");
                    if let Err(e) = gateway.cancel_order(entry_order_id).await {
                        warn!(order_id = entry_order_id, error = %e, "Entry cancel failed");
                    }
                }
            }
            TradeStatus::Open => self.check_exit(market, gateway, now).await,
            TradeStatus::ExitSubmitted => {
                // An exit without a working order id has nothing to cancel;
                // never fall back to id 0, which could be someone else's order.
                let Some(order_id) = exit_order_id else { return };
                let submitted = exit_submitted_at.unwrap_or(entry_time);
                if now - submitted >= timeout {
                    info!(order_id, "Exit unfilled past timeout, cancelling to re-price");
                    if let Err(e) = gateway.cancel_order(order_id).await {
                        warn!(order_id, error = %e, "Exit cancel failed");
                    }
                }
            }
            TradeStatus::Closed => {}
        }
    }

    /// Exit conditions for an open trade, checked every cycle: profit target
    /// first (against the live-recomputed fast EMA), then the time stop.
    async fn check_exit(
        &mut self,
        market: &MarketState,
        gateway: &dyn ExecutionGateway,
        now: DateTime<Utc>,
    ) {
        let current_price = market.index_price();
        if current_price <= 0.0 {
            return; // wait for a valid underlying print
        }

        // The profit target is live: refreshed from the latest window on
        // every check, never frozen at entry.
        if let Some(snapshot) = self.indicators.compute(&market.bars().closes()) {
            self.last_snapshot = Some(snapshot);
            if let Some(trade) = &mut self.active {
                trade.profit_target_price = snapshot.ema_fast;
            }
        }

        let Some(trade) = &self.active else { return };
        let target = trade.profit_target_price;
        let entry_time = trade.entry_time;
        let target_hit = match trade.direction {
            Direction::Long => current_price >= target,
            Direction::Short => current_price <= target,
        };

        if target_hit {
            self.submit_exit(ExitReason::ProfitTarget, market, gateway, now)
                .await;
            return;
        }

        if now - entry_time >= Duration::minutes(self.settings.time_stop_minutes) {
            self.submit_exit(ExitReason::TimeStop, market, gateway, now)
                .await;
        }
    }

    /// Submit the exit SELL at the bid, falling back to the last trade
    /// price, then to a $0.01 floor so the limit is always positive.
    async fn submit_exit(
        &mut self,
        reason: ExitReason,
        market: &MarketState,
        gateway: &dyn ExecutionGateway,
        now: DateTime<Utc>,
    ) {
        let Some(trade) = &self.active else { return };
        let contract = trade.contract.clone();
        let quantity = trade.quantity;

        let Some(quote) = market.quote(&contract) else {
            // Known gap carried from the reference behavior: without a quote
            // the trade is cleared unmanaged rather than sold blind.
            error!(contract = %contract, "Cannot exit, no market data; clearing active trade");
            self.active = None;
            return;
        };

        let raw = if quote.bid > 0.0 {
            quote.bid
        } else if quote.last > 0.0 {
            warn!(contract = %contract, "No valid bid for exit, using last");
            quote.last
        } else {
            error!(contract = %contract, "Invalid exit price, using 0.01");
            0.01
        };
        let mut limit = round_to_tick(raw);
        if limit <= 0.0 {
            limit = 0.01;
        }

        info!(contract = %contract, reason = %reason, limit, "Exiting trade");
        match gateway
            .submit_order(&contract, OrderSide::Sell, quantity, limit)
            .await
        {
            Ok(order_id) => {
                if let Some(trade) = &mut self.active {
                    trade.status = TradeStatus::ExitSubmitted;
                    trade.exit_order_id = Some(order_id);
                    trade.exit_submitted_at = Some(now);
                    trade.exit_reason = Some(reason);
                }
            }
            Err(e) => warn!(error = %e, "Exit order submission failed, retrying next cycle"),
        }
    }
}

#[async_trait]
impl Strategy for GammaSnapStrategy {
    fn name(&self) -> &str {
        "gamma-snap"
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
        self.indicators = IndicatorEngine::new(settings.z_score_period, settings.ema_span);
        self.signals = SignalGenerator::new(settings.z_score_period, settings.z_score_threshold);
        self.settings = settings.clone();
    }

    fn on_order_event(&mut self, event: &OrderEvent, now: DateTime<Utc>) {
        let Some(trade) = &mut self.active else { return };

        if trade.status == TradeStatus::EntrySubmitted && event.order_id == trade.entry_order_id {
            match event.status {
                OrderStatus::Filled => {
                    trade.entry_price = Some(event.avg_fill_price);
                    trade.status = TradeStatus::Open;
                    if let Some(snapshot) = self.last_snapshot {
                        trade.profit_target_price = snapshot.ema_fast;
                    }
                    info!(
                        order_id = event.order_id,
                        price = event.avg_fill_price,
                        "Entry order filled"
                    );
                }
                OrderStatus::Cancelled | OrderStatus::Rejected => {
                    info!(order_id = event.order_id, "Entry order cancelled, back to idle");
                    self.active = None;
                }
                OrderStatus::Submitted => {}
            }
        } else if trade.status == TradeStatus::ExitSubmitted
            && Some(event.order_id) == trade.exit_order_id
        {
            match event.status {
                OrderStatus::Filled => {
                    trade.exit_price = Some(event.avg_fill_price);
                    trade.exit_time = Some(now);
                    trade.status = TradeStatus::Closed;
                    info!(
                        order_id = event.order_id,
                        price = event.avg_fill_price,
                        "Exit order filled, trade complete"
                    );
                    if let Some(done) = self.active.take() {
                        self.history.push(done);
                    }
                }
                OrderStatus::Cancelled | OrderStatus::Rejected => {
                    info!(
                        order_id = event.order_id,
                        "Exit order cancelled, re-pricing next cycle"
                    );
                    trade.status = TradeStatus::Open;
                    trade.exit_order_id = None;
                    trade.exit_submitted_at = None;
                    trade.exit_reason = None;
                }
                OrderStatus::Submitted => {}
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

        if let Some(snapshot) = self.indicators.compute(&market.bars().closes()) {
            self.last_snapshot = Some(snapshot);
        }

        // An active trade is managed unconditionally; the entry gates below
        // must never strand an open position.
        if self.active.is_some() {
            self.manage_active(market, gateway, now).await;
            return;
        }

        if !self.within_trading_window(now) {
            self.status = StrategyStatus::OutsideTradingWindow;
            return;
        }
        let vix = market.vol_index();
        if vix > self.settings.vix_threshold {
            self.status = StrategyStatus::PausedHighVol(vix);
            return;
        }
        if market.bars().len() < self.settings.z_score_period + 1 {
            self.status = StrategyStatus::WaitingForData;
            return;
        }

        self.scan_for_entry(market, gateway, now).await;
    }

    fn active_trade(&self) -> Option<&TradeRecord> {
        self.active.as_ref()
    }

    fn history(&self) -> &[TradeRecord] {
        &self.history
    }

    fn indicators(&self) -> Option<IndicatorSnapshot> {
        self.last_snapshot
    }
}
