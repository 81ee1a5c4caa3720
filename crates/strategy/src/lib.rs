pub mod gamma_snap;
pub mod indicators;
pub mod market;
pub mod pricing;
pub mod signal;
pub mod straddle;
pub mod window;

pub use gamma_snap::GammaSnapStrategy;
pub use indicators::{IndicatorEngine, IndicatorSnapshot};
pub use market::MarketState;
pub use signal::SignalGenerator;
pub use straddle::StraddleStrategy;
pub use window::BarWindow;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::{ExecutionGateway, OrderEvent, Settings, StrategyStatus, TradeRecord};

/// All strategy implementations satisfy this trait.
///
/// The engine drains the gateway event channel first (routing order events
/// to `on_order_event`), then calls `evaluate` once per cycle with an
/// explicit clock so tests are deterministic.
#[async_trait]
pub trait Strategy: Send {
    /// Human-readable name shown in logs.
    fn name(&self) -> &str;

    /// Status string surfaced to the caller, e.g. "SCANNING...".
    fn status(&self) -> StrategyStatus;

    /// Enable or disable trading. A disabled strategy still receives order
    /// events so in-flight fills are never lost.
    fn set_enabled(&mut self, enabled: bool);

    /// Apply updated settings at runtime.
    fn apply_settings(&mut self, settings: &Settings);

    /// Handle an order lifecycle notification from the gateway.
    fn on_order_event(&mut self, event: &OrderEvent, now: DateTime<Utc>);

    /// One evaluation cycle. Must never panic past its own boundary; all
    /// failures are logged and retried next cycle.
    async fn evaluate(
        &mut self,
        market: &MarketState,
        gateway: &dyn ExecutionGateway,
        now: DateTime<Utc>,
    );

    /// The single active trade, if any.
    fn active_trade(&self) -> Option<&TradeRecord> {
        None
    }

    /// Completed round trips, oldest first.
    fn history(&self) -> &[TradeRecord] {
        &[]
    }

    /// Latest indicator snapshot, if the strategy computes one.
    fn indicators(&self) -> Option<IndicatorSnapshot> {
        None
    }
}
