use async_trait::async_trait;

use crate::{ContractId, OrderSide, Result};

/// Abstraction over the broker connection.
///
/// Order submission is fire-and-forget: the returned id identifies the
/// working order, and fills, cancels and rejections arrive later as
/// `GatewayEvent::Order` on the engine's event channel. Nothing in the
/// strategy core blocks on the wire.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Socket-level connectivity.
    fn is_connected(&self) -> bool;

    /// True once the market data farm has confirmed live data. New entries
    /// are gated on both this and `is_connected`.
    fn is_data_confirmed(&self) -> bool;

    /// Submit a limit order. Returns the gateway-assigned order id.
    async fn submit_order(
        &self,
        contract: &ContractId,
        side: OrderSide,
        quantity: u32,
        limit_price: f64,
    ) -> Result<u64>;

    /// Cancel a working order. The resulting Cancelled event drives the
    /// trade lifecycle back to its pre-submission state.
    async fn cancel_order(&self, order_id: u64) -> Result<()>;
}
