use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use common::{
    ContractId, Error, ExecutionGateway, GatewayEvent, OrderEvent, OrderSide, OrderStatus, Result,
};

/// Simulated execution gateway for paper trading and tests.
///
/// Orders are acknowledged and then filled at their limit price; both the
/// Submitted and the Filled events are posted onto the engine's event
/// channel, so the strategy sees the same asynchronous order lifecycle it
/// would against a real broker. No real orders are ever sent anywhere.
pub struct PaperGateway {
    event_tx: mpsc::UnboundedSender<GatewayEvent>,
    next_order_id: AtomicU64,
    connected: AtomicBool,
    data_confirmed: AtomicBool,
    /// When false, submitted orders stay working until cancelled. Lets
    /// tests exercise the unfilled-order timeout path.
    fill_immediately: AtomicBool,
}

impl PaperGateway {
    pub fn new(event_tx: mpsc::UnboundedSender<GatewayEvent>) -> Self {
        info!("PaperGateway initialized");
        Self {
            event_tx,
            next_order_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            data_confirmed: AtomicBool::new(true),
            fill_immediately: AtomicBool::new(true),
        }
    }

    pub fn set_connected(&self, connected: bool, data_confirmed: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        self.data_confirmed.store(data_confirmed, Ordering::SeqCst);
        let _ = self.event_tx.send(GatewayEvent::Connection {
            connected,
            data_confirmed,
        });
    }

    pub fn set_fill_immediately(&self, fill: bool) {
        self.fill_immediately.store(fill, Ordering::SeqCst);
    }

    fn post(&self, order_id: u64, status: OrderStatus, avg_fill_price: f64) {
        let _ = self.event_tx.send(GatewayEvent::Order(OrderEvent {
            order_id,
            status,
            avg_fill_price,
        }));
    }
}

#[async_trait]
impl ExecutionGateway for PaperGateway {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_data_confirmed(&self) -> bool {
        self.data_confirmed.load(Ordering::SeqCst)
    }

    async fn submit_order(
        &self,
        contract: &ContractId,
        side: OrderSide,
        quantity: u32,
        limit_price: f64,
    ) -> Result<u64> {
        if !self.is_connected() {
            return Err(Error::GatewayNotReady);
        }
        if limit_price <= 0.0 {
            return Err(Error::InvalidPrice(limit_price));
        }

        let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        debug!(
            order_id,
            contract = %contract,
            side = %side,
            quantity,
            limit_price,
            "Paper order submitted"
        );
        self.post(order_id, OrderStatus::Submitted, 0.0);

        if self.fill_immediately.load(Ordering::SeqCst) {
            self.post(order_id, OrderStatus::Filled, limit_price);
        }
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: u64) -> Result<()> {
        debug!(order_id, "Paper order cancelled");
        self.post(order_id, OrderStatus::Cancelled, 0.0);
        Ok(())
    }
}
