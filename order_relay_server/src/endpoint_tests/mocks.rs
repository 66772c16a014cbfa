use mockall::mock;
use order_relay_engine::{
    db_types::{NewEvent, Order, OrderId, QueueMessage},
    traits::{
        ClaimOptions,
        IngestOutcome,
        InsertEventResult,
        OrderManagement,
        OrderPage,
        OrderRelayError,
        OrderWithShipments,
        RelayDatabase,
    },
};

mock! {
    pub RelayDb {}
    impl Clone for RelayDb {
        fn clone(&self) -> Self;
    }
    impl RelayDatabase for RelayDb {
        fn url(&self) -> &str;
        async fn insert_event(&self, event: NewEvent) -> Result<InsertEventResult, OrderRelayError>;
        async fn claim_ingest_messages(&self, opts: ClaimOptions) -> Result<Vec<QueueMessage>, OrderRelayError>;
        async fn apply_ingest_message(&self, msg: &QueueMessage) -> Result<IngestOutcome, OrderRelayError>;
        async fn claim_outbound_messages(&self, opts: ClaimOptions) -> Result<Vec<QueueMessage>, OrderRelayError>;
        async fn complete_outbound_message(&self, msg_id: i64) -> Result<(), OrderRelayError>;
        async fn defer_outbound_message(&self, msg: &QueueMessage, delay_seconds: i64) -> Result<(), OrderRelayError>;
    }
}

mock! {
    pub OrderDb {}
    impl Clone for OrderDb {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for OrderDb {
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<OrderWithShipments>, OrderRelayError>;
        async fn list_orders(&self, page: OrderPage) -> Result<Vec<Order>, OrderRelayError>;
    }
}

/// A bare order row for mock returns.
pub fn test_order(order_id: &str) -> Order {
    use chrono::Utc;
    use order_relay_engine::db_types::Cents;
    Order {
        id: 1,
        order_id: OrderId::from(order_id),
        customer_id: "c1".to_string(),
        status: "paid".to_string(),
        total_amount: Cents::from(2500),
        address1: Some("A".to_string()),
        address2: None,
        city: Some("X".to_string()),
        province: Some("NY".to_string()),
        zip: Some("10001".to_string()),
        country: Some("US".to_string()),
        shipping_fee_cents: Cents::from(0),
        last_event_ts: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}
