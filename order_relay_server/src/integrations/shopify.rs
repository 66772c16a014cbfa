//! Conversion of merchant webhook deliveries into pipeline events.

use chrono::{DateTime, Utc};
use log::trace;
use order_relay_engine::db_types::{EventSource, NewEvent, OrderId};
use serde_json::Value;

use crate::errors::EventConversionError;

/// Topic assumed when the webhook carries no `x-shopify-topic` header.
pub const DEFAULT_TOPIC: &str = "SHOPIFY_UPDATED";

/// Builds a pipeline event from a webhook delivery. `webhook_id` is the
/// upstream's retry identifier (`x-shopify-webhook-id`), `topic` its
/// `x-shopify-topic`. The body is retained verbatim as the event payload.
pub fn new_event_from_webhook(
    topic: &str,
    webhook_id: Option<String>,
    body: Value,
) -> Result<NewEvent, EventConversionError> {
    trace!("🛍️️ Converting webhook body for topic {topic}");
    let order_id = match &body["id"] {
        Value::String(id) if !id.is_empty() => OrderId::from(id.as_str()),
        Value::Number(id) => OrderId::from(id.to_string()),
        _ => return Err(EventConversionError("The webhook body has no order id".to_string())),
    };
    let event_ts = timestamp_field(&body["updated_at"])
        .or_else(|| timestamp_field(&body["created_at"]))
        .unwrap_or_else(Utc::now);
    let mut event = NewEvent::new(EventSource::Shopify, order_id, topic, event_ts, body);
    if let Some(id) = webhook_id {
        event = event.with_upstream_id(id);
    }
    Ok(event)
}

fn timestamp_field(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(|s| s.parse::<DateTime<Utc>>().ok())
}
