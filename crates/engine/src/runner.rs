use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use common::{EngineCommand, ExecutionGateway, GatewayEvent, TradeRecord};
use strategy::{IndicatorSnapshot, MarketState, Strategy};

/// Read-only view of the engine published after every cycle.
#[derive(Debug, Clone, Default)]
pub struct EngineSnapshot {
    /// Human-readable strategy status, e.g. "SCANNING...".
    pub status: String,
    pub indicators: Option<IndicatorSnapshot>,
    pub active_trade: Option<TradeRecord>,
    pub history: Vec<TradeRecord>,
    pub index_price: f64,
    pub vol_index: f64,
    /// Broker connection as last reported over the event channel.
    pub connected: bool,
    pub data_confirmed: bool,
}

/// Cloneable handle for controlling and observing the engine.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    snapshot: Arc<RwLock<EngineSnapshot>>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.read().await.clone()
    }
}

/// The evaluation loop.
///
/// All shared mutable state (bar window, quote table, the active trade) is
/// owned here and touched only from this task: the gateway's feed threads
/// post events onto the single-consumer channel, and the loop drains the
/// channel at the top of each cycle before evaluating. Notification handlers
/// and the evaluation can therefore never race, and event ordering is
/// deterministic for tests.
pub struct Engine {
    event_rx: mpsc::UnboundedReceiver<GatewayEvent>,
    command_rx: mpsc::Receiver<EngineCommand>,
    gateway: Arc<dyn ExecutionGateway>,
    market: MarketState,
    strategy: Box<dyn Strategy>,
    snapshot: Arc<RwLock<EngineSnapshot>>,
    cycle: Duration,
    connected: bool,
    data_confirmed: bool,
}

impl Engine {
    pub fn new(
        event_rx: mpsc::UnboundedReceiver<GatewayEvent>,
        gateway: Arc<dyn ExecutionGateway>,
        strategy: Box<dyn Strategy>,
        cycle: Duration,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let snapshot = Arc::new(RwLock::new(EngineSnapshot::default()));

        let handle = EngineHandle {
            command_tx,
            snapshot: snapshot.clone(),
        };
        let engine = Engine {
            event_rx,
            command_rx,
            gateway,
            market: MarketState::new(strategy::BarWindow::DEFAULT_CAPACITY),
            strategy,
            snapshot,
            cycle,
            connected: false,
            data_confirmed: false,
        };
        (engine, handle)
    }

    /// Run the engine. Call from `tokio::spawn`; returns when a Shutdown
    /// command arrives or the command channel closes.
    pub async fn run(mut self) {
        info!(strategy = %self.strategy.name(), cycle = ?self.cycle, "Engine running");
        let mut interval = tokio::time::interval(self.cycle);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(EngineCommand::Enable) => {
                            info!("Strategy enabled");
                            self.strategy.set_enabled(true);
                        }
                        Some(EngineCommand::Disable) => {
                            info!("Strategy disabled");
                            self.strategy.set_enabled(false);
                        }
                        Some(EngineCommand::ApplySettings(settings)) => {
                            if let Err(e) = settings.validate() {
                                warn!(error = %e, "Rejected settings update");
                            } else {
                                info!("Applying updated settings");
                                self.strategy.apply_settings(&settings);
                            }
                        }
                        Some(EngineCommand::Shutdown) => {
                            info!("Engine shutting down");
                            return;
                        }
                        None => {
                            warn!("Engine command channel closed, shutting down");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One evaluation cycle: drain every pending gateway event, then let the
    /// strategy evaluate, then publish the snapshot.
    async fn run_cycle(&mut self) {
        let now = Utc::now();

        while let Ok(event) = self.event_rx.try_recv() {
            match &event {
                GatewayEvent::Order(order_event) => {
                    self.strategy.on_order_event(order_event, now);
                }
                GatewayEvent::Connection {
                    connected,
                    data_confirmed,
                } => {
                    if *connected != self.connected {
                        info!(connected, "Broker connection changed");
                    }
                    self.connected = *connected;
                    self.data_confirmed = *data_confirmed;
                }
                _ => self.market.apply(&event),
            }
        }

        self.strategy
            .evaluate(&self.market, self.gateway.as_ref(), now)
            .await;

        let mut snapshot = self.snapshot.write().await;
        snapshot.status = self.strategy.status().to_string();
        snapshot.indicators = self.strategy.indicators();
        snapshot.active_trade = self.strategy.active_trade().cloned();
        snapshot.history = self.strategy.history().to_vec();
        snapshot.index_price = self.market.index_price();
        snapshot.vol_index = self.market.vol_index();
        snapshot.connected = self.connected;
        snapshot.data_confirmed = self.data_confirmed;
    }
}
