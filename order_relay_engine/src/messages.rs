//! Bodies of the messages carried on the two durable queues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{NewEvent, Order, OrderId};

/// Body of an `ingest_events` message. Written by the ingress insert in the
/// same transaction as the inbox row; anything that fails to parse as this
/// shape is a data-integrity bug and is dropped permanently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestMessage {
    pub order_id: OrderId,
    pub dedupe_key: String,
    pub event_type: String,
    pub event_ts: DateTime<Utc>,
    pub payload: Value,
}

impl IngestMessage {
    pub fn from_event(event: &NewEvent, dedupe_key: &str) -> Self {
        Self {
            order_id: event.order_id.clone(),
            dedupe_key: dedupe_key.to_string(),
            event_type: event.event_type.clone(),
            event_ts: event.event_ts,
            payload: event.payload.clone(),
        }
    }
}

/// Body of a `shopify_outbound` message: the changed-field map plus the
/// post-update order snapshot handed to the upstream dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub order_id: OrderId,
    pub changed_fields: Value,
    pub order: Value,
}

impl OutboundMessage {
    pub fn new(order: &Order, changed_fields: Value) -> Self {
        Self { order_id: order.order_id.clone(), changed_fields, order: order_snapshot(order) }
    }
}

/// Diff of the externally exposed mutable fields between two versions of an
/// order, keyed by exposed field name. Drives both the outbound payload and
/// the dashboard notification.
pub fn changed_fields(before: &Order, after: &Order) -> Value {
    let mut changed = serde_json::Map::new();
    let mut record = |name: &str, old: Value, new: Value| {
        if old != new {
            changed.insert(name.to_string(), new);
        }
    };
    record("customerId", json(&before.customer_id), json(&after.customer_id));
    record("status", json(&before.status), json(&after.status));
    record("totalAmount", json(&before.total_amount), json(&after.total_amount));
    record("address1", json(&before.address1), json(&after.address1));
    record("address2", json(&before.address2), json(&after.address2));
    record("city", json(&before.city), json(&after.city));
    record("province", json(&before.province), json(&after.province));
    record("zip", json(&before.zip), json(&after.zip));
    record("country", json(&before.country), json(&after.country));
    record("shippingFeeCents", json(&before.shipping_fee_cents), json(&after.shipping_fee_cents));
    Value::Object(changed)
}

fn json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// The externally exposed snapshot of an order. An explicit field-by-field
/// copy; nothing internal (surrogate ids, soft-delete stamps) leaks out.
pub fn order_snapshot(order: &Order) -> Value {
    serde_json::json!({
        "orderId": order.order_id,
        "customerId": order.customer_id,
        "status": order.status,
        "totalAmount": order.total_amount,
        "address1": order.address1,
        "address2": order.address2,
        "city": order.city,
        "province": order.province,
        "zip": order.zip,
        "country": order.country,
        "shippingFeeCents": order.shipping_fee_cents,
        "lastEventTs": order.last_event_ts.map(|ts| ts.to_rfc3339()),
    })
}
