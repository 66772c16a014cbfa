use crate::{
    db_types::{Order, OrderId},
    traits::{OrderManagement, OrderPage, OrderRelayError, OrderWithShipments},
};

/// Read-side API over the canonical order store.
#[derive(Debug, Clone)]
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<OrderWithShipments>, OrderRelayError> {
        self.db.fetch_order(order_id).await
    }

    pub async fn list_orders(&self, page: OrderPage) -> Result<Vec<Order>, OrderRelayError> {
        self.db.list_orders(page).await
    }
}
