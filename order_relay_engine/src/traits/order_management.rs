use crate::{
    db_types::{Order, OrderId, Shipment},
    traits::OrderRelayError,
};

/// An order with its shipments, as returned by the read API.
#[derive(Debug, Clone)]
pub struct OrderWithShipments {
    pub order: Order,
    pub shipments: Vec<Shipment>,
}

/// Cursor pagination over orders. The cursor is a business order id; results
/// are the orders strictly after it in `order_id` order.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    pub limit: i64,
    pub cursor: Option<OrderId>,
}

impl OrderPage {
    pub const DEFAULT_LIMIT: i64 = 100;

    pub fn new(limit: Option<i64>, cursor: Option<OrderId>) -> Self {
        Self { limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, 1000), cursor }
    }
}

/// Read-side queries over the canonical order store.
pub trait OrderManagement: Clone + Send + Sync + 'static {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<OrderWithShipments>, OrderRelayError>;

    async fn list_orders(&self, page: OrderPage) -> Result<Vec<Order>, OrderRelayError>;
}
