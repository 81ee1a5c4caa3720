use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Settings;

/// One-minute price bar for the underlying index. Immutable once appended
/// to the bar window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionRight::Call => write!(f, "C"),
            OptionRight::Put => write!(f, "P"),
        }
    }
}

/// Canonical identity of an option contract.
///
/// The display form is the one key format used everywhere:
/// `SYMBOL_STRIKE_RIGHT_EXPIRY`, e.g. `SPX_5900_C_20250613`.
/// Strikes are whole index points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId {
    pub symbol: String,
    pub strike: u32,
    pub right: OptionRight,
    /// Expiry date as YYYYMMDD.
    pub expiry: String,
}

impl ContractId {
    pub fn new(
        symbol: impl Into<String>,
        strike: u32,
        right: OptionRight,
        expiry: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            strike,
            right,
            expiry: expiry.into(),
        }
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}_{}", self.symbol, self.strike, self.right, self.expiry)
    }
}

/// Live quote for one contract. Overwritten in place as ticks arrive;
/// fields default to 0.0 until the first tick of that kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub volume: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub iv: f64,
}

/// Direction of a strategy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Side of an order sent to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status reported by the gateway for a working order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Submitted,
    Filled,
    Cancelled,
    Rejected,
}

/// Order lifecycle notification delivered on the gateway event channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: u64,
    pub status: OrderStatus,
    pub avg_fill_price: f64,
}

/// Everything the execution gateway pushes at the strategy core.
///
/// All of these land on one single-consumer channel; the engine drains the
/// channel at the top of each evaluation cycle so ordering is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// A closed one-minute bar for the underlying.
    Bar(Bar),
    /// A closed one-minute bar for a single option contract, feeding the
    /// per-leg supertrend exit.
    ContractBar { contract: ContractId, bar: Bar },
    /// Last trade price of the underlying index.
    IndexPrice(f64),
    /// Latest volatility index reading (the entry gate input).
    VolIndex(f64),
    /// Top-of-book / last-trade update for one contract. `None` fields are
    /// unchanged.
    QuoteTick {
        contract: ContractId,
        bid: Option<f64>,
        ask: Option<f64>,
        last: Option<f64>,
        volume: Option<f64>,
    },
    /// Model greeks update for one contract.
    Greeks {
        contract: ContractId,
        delta: f64,
        gamma: f64,
        theta: f64,
        vega: f64,
        iv: f64,
    },
    /// Connection liveness: connected to the broker, and whether the market
    /// data farm has been confirmed.
    Connection { connected: bool, data_confirmed: bool },
    /// Order lifecycle event.
    Order(OrderEvent),
}

/// Directional entry signal produced by a z-score crossing. Ephemeral:
/// consumed by the trade lifecycle the same cycle it is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub triggered_at: DateTime<Utc>,
}

/// State of the single active trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    EntrySubmitted,
    Open,
    ExitSubmitted,
    Closed,
}

/// Why an exit order was submitted. Profit target is checked before the
/// time stop, so it wins when both are true in the same cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    ProfitTarget,
    TimeStop,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::ProfitTarget => write!(f, "Profit Target"),
            ExitReason::TimeStop => write!(f, "Time Stop"),
        }
    }
}

/// One round-trip trade. Created when a signal is acted on, mutated by fill
/// events and the exit checker, archived to history when the exit fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: uuid::Uuid,
    pub contract: ContractId,
    pub direction: Direction,
    pub quantity: u32,
    pub status: TradeStatus,
    pub entry_order_id: u64,
    pub entry_price: Option<f64>,
    pub entry_time: DateTime<Utc>,
    /// Live profit target: refreshed from the fast EMA on every exit check,
    /// not frozen at entry.
    pub profit_target_price: f64,
    pub exit_order_id: Option<u64>,
    pub exit_submitted_at: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,
    pub exit_price: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
}

impl TradeRecord {
    pub fn new(
        contract: ContractId,
        direction: Direction,
        quantity: u32,
        entry_order_id: u64,
        profit_target_price: f64,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            contract,
            direction,
            quantity,
            status: TradeStatus::EntrySubmitted,
            entry_order_id,
            entry_price: None,
            entry_time,
            profit_target_price,
            exit_order_id: None,
            exit_submitted_at: None,
            exit_reason: None,
            exit_price: None,
            exit_time: None,
        }
    }

    /// True while the trade occupies the one active slot.
    pub fn is_active(&self) -> bool {
        self.status != TradeStatus::Closed
    }
}

/// Human-readable strategy status surfaced to the caller each cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyStatus {
    Inactive,
    OutsideTradingWindow,
    PausedHighVol(f64),
    WaitingForData,
    Scanning,
    InTrade(Direction),
}

impl std::fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyStatus::Inactive => write!(f, "INACTIVE"),
            StrategyStatus::OutsideTradingWindow => write!(f, "Outside Trading Window"),
            StrategyStatus::PausedHighVol(vix) => write!(f, "PAUSED (VIX High: {vix:.2})"),
            StrategyStatus::WaitingForData => write!(f, "Waiting for Data..."),
            StrategyStatus::Scanning => write!(f, "SCANNING..."),
            StrategyStatus::InTrade(dir) => write!(f, "IN TRADE ({dir})"),
        }
    }
}

/// Commands sent to the engine via its command channel.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Allow the strategy to trade.
    Enable,
    /// Suspend the strategy (status becomes INACTIVE).
    Disable,
    /// Apply updated settings at runtime.
    ApplySettings(Settings),
    /// Stop the engine loop.
    Shutdown,
}
