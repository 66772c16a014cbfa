use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::OrderId;

/// A per-order change notification, published after the originating
/// transaction commits and fanned out to all connected dashboard streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentUpdateEvent {
    pub order_id: OrderId,
    pub server_ts: DateTime<Utc>,
    /// Map of the fields this event changed, keyed by exposed field name.
    pub changed_fields: Value,
    pub summary: String,
}

impl ShipmentUpdateEvent {
    pub fn new(order_id: OrderId, changed_fields: Value, summary: impl Into<String>) -> Self {
        Self { order_id, server_ts: Utc::now(), changed_fields, summary: summary.into() }
    }
}
