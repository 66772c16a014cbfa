use chrono::{DateTime, Utc};
use order_relay_engine::db_types::{Order, OrderId, Shipment};
use serde::{Deserialize, Serialize};

/// Ingress acknowledgement: `{status: "Accepted", id}` on a fresh event,
/// `{status: "Duplicate ignored"}` when the dedupe key was already known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl EventResponse {
    pub fn accepted(id: Option<i64>) -> Self {
        Self { status: "Accepted".to_string(), id }
    }

    pub fn duplicate() -> Self {
        Self { status: "Duplicate ignored".to_string(), id: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListOrdersQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentResult {
    pub tracking_number: Option<String>,
    pub courier_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShipmentResult {
    pub fn from_shipment(shipment: &Shipment) -> Self {
        Self {
            tracking_number: shipment.tracking_number.clone(),
            courier_status: shipment.courier_status.clone(),
            created_at: shipment.created_at,
            updated_at: shipment.updated_at,
        }
    }
}

/// The externally exposed order shape. Copies exactly the fields meant for
/// the outside; surrogate ids and soft-delete stamps stay internal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_id: OrderId,
    pub customer_id: String,
    pub status: String,
    pub total_amount: i64,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub shipping_fee_cents: i64,
    pub last_event_ts: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipments: Option<Vec<ShipmentResult>>,
}

impl OrderResult {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            status: order.status.clone(),
            total_amount: order.total_amount.value(),
            address1: order.address1.clone(),
            address2: order.address2.clone(),
            city: order.city.clone(),
            province: order.province.clone(),
            zip: order.zip.clone(),
            country: order.country.clone(),
            shipping_fee_cents: order.shipping_fee_cents.value(),
            last_event_ts: order.last_event_ts,
            created_at: order.created_at,
            updated_at: order.updated_at,
            shipments: None,
        }
    }

    pub fn with_shipments(order: &Order, shipments: &[Shipment]) -> Self {
        let mut result = Self::from_order(order);
        result.shipments = Some(shipments.iter().map(ShipmentResult::from_shipment).collect());
        result
    }
}

/// One page of orders. `next_cursor` is the last order id on the page; feed
/// it back as `?cursor=` to continue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResult {
    pub orders: Vec<OrderResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<OrderId>,
}
