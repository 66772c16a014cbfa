use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        Cents        ---------------------------------------------------------

/// A non-negative money amount in minor currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value.max(0))
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------

/// The stable business order identifier, as assigned by the merchant platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     EventSource     ---------------------------------------------------------

/// Which producer delivered an event to the ingress boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Shopify,
    Courier,
}

impl Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSource::Shopify => write!(f, "shopify"),
            EventSource::Courier => write!(f, "courier"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid event source: {0}")]
pub struct EventSourceConversionError(String);

impl FromStr for EventSource {
    type Err = EventSourceConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shopify" => Ok(Self::Shopify),
            "courier" => Ok(Self::Courier),
            s => Err(EventSourceConversionError(s.to_string())),
        }
    }
}

//--------------------------------------      EventType      ---------------------------------------------------------

/// The lifecycle event kinds the pipeline knows how to apply. Anything else is
/// carried through verbatim and only advances the order's event clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    ShopifyCreated,
    ShopifyUpdated,
    CourierStatusUpdate,
    Other(String),
}

pub const EVENT_SHOPIFY_CREATED: &str = "SHOPIFY_CREATED";
pub const EVENT_SHOPIFY_UPDATED: &str = "SHOPIFY_UPDATED";
pub const EVENT_COURIER_STATUS_UPDATE: &str = "COURIER_STATUS_UPDATE";

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            EVENT_SHOPIFY_CREATED => Self::ShopifyCreated,
            EVENT_SHOPIFY_UPDATED => Self::ShopifyUpdated,
            EVENT_COURIER_STATUS_UPDATE => Self::CourierStatusUpdate,
            s => Self::Other(s.to_string()),
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::ShopifyCreated => write!(f, "{EVENT_SHOPIFY_CREATED}"),
            EventType::ShopifyUpdated => write!(f, "{EVENT_SHOPIFY_UPDATED}"),
            EventType::CourierStatusUpdate => write!(f, "{EVENT_COURIER_STATUS_UPDATE}"),
            EventType::Other(s) => write!(f, "{s}"),
        }
    }
}

impl EventType {
    pub fn is_merchant(&self) -> bool {
        matches!(self, EventType::ShopifyCreated | EventType::ShopifyUpdated)
    }
}

//--------------------------------------     InboxStatus     ---------------------------------------------------------

/// Terminal and non-terminal states of an inbox row. `Received` is the only
/// state the consumer will act on; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboxStatus {
    Received,
    Processed,
    IgnoredStale,
    DuplicateIgnored,
    Failed,
}

impl Display for InboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InboxStatus::Received => write!(f, "RECEIVED"),
            InboxStatus::Processed => write!(f, "PROCESSED"),
            InboxStatus::IgnoredStale => write!(f, "IGNORED_STALE"),
            InboxStatus::DuplicateIgnored => write!(f, "DUPLICATE_IGNORED"),
            InboxStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl InboxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InboxStatus::Received)
    }
}

/// Order status assigned when the first event seen for an order was not the
/// merchant create.
pub const STATUS_PENDING_PARTIAL: &str = "PENDING_PARTIAL";

//--------------------------------------        Order        ---------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub status: String,
    pub total_amount: Cents,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub shipping_fee_cents: Cents,
    pub last_event_ts: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

//--------------------------------------       Shipment      ---------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct Shipment {
    pub id: i64,
    pub order_id: OrderId,
    pub courier_status: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      InboxEvent     ---------------------------------------------------------

/// A row in the event inbox: the durable record of every event ever accepted
/// at the boundary. The `payload` is retained verbatim as an opaque JSON blob.
#[derive(Debug, Clone, FromRow)]
pub struct InboxEvent {
    pub id: i64,
    pub dedupe_key: String,
    pub source: EventSource,
    pub order_id: OrderId,
    pub event_type: String,
    pub event_ts: DateTime<Utc>,
    pub payload: String,
    pub status: InboxStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewEvent      ---------------------------------------------------------

/// An event as it arrives at the ingress boundary, before deduplication.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub source: EventSource,
    /// A stable retry identifier supplied by the upstream, when it has one.
    pub upstream_id: Option<String>,
    pub order_id: OrderId,
    pub event_type: String,
    pub event_ts: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl NewEvent {
    pub fn new(
        source: EventSource,
        order_id: OrderId,
        event_type: impl Into<String>,
        event_ts: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self { source, upstream_id: None, order_id, event_type: event_type.into(), event_ts, payload }
    }

    pub fn with_upstream_id(mut self, id: impl Into<String>) -> Self {
        self.upstream_id = Some(id.into());
        self
    }
}

//--------------------------------------     QueueMessage    ---------------------------------------------------------

/// A claimed message from one of the named durable queues.
#[derive(Debug, Clone, FromRow)]
pub struct QueueMessage {
    pub id: i64,
    pub queue: String,
    pub message: String,
    pub enqueued_at: DateTime<Utc>,
    pub visible_at: DateTime<Utc>,
    pub read_count: i64,
}
