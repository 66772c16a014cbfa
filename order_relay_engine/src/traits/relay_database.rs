use thiserror::Error;

use crate::{
    db_types::{NewEvent, OrderId, QueueMessage},
    events::ShipmentUpdateEvent,
};

/// Queue drained by the ingest consumer.
pub const INGEST_QUEUE: &str = "ingest_events";
/// Queue drained by the outbound dispatcher.
pub const OUTBOUND_QUEUE: &str = "shopify_outbound";

#[derive(Debug, Error)]
pub enum OrderRelayError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Could not encode message body: {0}")]
    MessageEncoding(#[from] serde_json::Error),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
}

/// Result of an ingress insert. `inserted == false` means the dedupe key was
/// already present; this is the deduplication signal, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertEventResult {
    pub inserted: bool,
    pub id: Option<i64>,
    pub dedupe_key: String,
}

/// Parameters for a long-poll claim against a named queue.
#[derive(Debug, Clone, Copy)]
pub struct ClaimOptions {
    pub visibility_seconds: i64,
    pub max_count: i64,
    pub max_poll_seconds: u64,
    pub poll_interval_ms: u64,
}

impl ClaimOptions {
    /// The consumer-loop defaults: 30 s visibility, two messages per claim,
    /// 5 s long poll at a 200 ms cadence.
    pub fn consumer_defaults() -> Self {
        Self { visibility_seconds: 30, max_count: 2, max_poll_seconds: 5, poll_interval_ms: 200 }
    }
}

/// How one claimed ingest message was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestDisposition {
    /// State transitions applied, inbox row marked `PROCESSED`.
    Processed,
    /// Strictly older than the order's event clock; inbox row marked
    /// `IGNORED_STALE`, order untouched.
    IgnoredStale,
    /// Same timestamp as an already-applied event; inbox row marked
    /// `DUPLICATE_IGNORED`, order untouched.
    DuplicateIgnored,
    /// The effects of this message already committed elsewhere (a competing
    /// claimant finished first, or the inbox row was already terminal); the
    /// redelivered copy was discarded.
    AlreadyTerminal,
    /// The message body could not be interpreted and was dropped permanently.
    DroppedMalformed,
    /// The message exceeded the redelivery cap; the inbox row was marked
    /// `FAILED` and the message dropped.
    Poisoned,
}

/// Outcome of applying one ingest message: the disposition plus the change
/// notification to publish after commit, when the transition produced one.
#[derive(Debug)]
pub struct IngestOutcome {
    pub disposition: IngestDisposition,
    pub broadcast: Option<ShipmentUpdateEvent>,
}

impl IngestOutcome {
    pub fn silent(disposition: IngestDisposition) -> Self {
        Self { disposition, broadcast: None }
    }
}

/// The write-path backend: ingress inserts, queue claims and the transactional
/// consumer core. Implementations must make each method a single atomic unit.
pub trait RelayDatabase: Clone + Send + Sync + 'static {
    /// The database URL this backend is connected to.
    fn url(&self) -> &str;

    /// Inserts an inbox row and enqueues the matching `ingest_events` message
    /// in one transaction. A unique-key violation on the dedupe key reports
    /// `inserted: false` and leaves the store untouched.
    async fn insert_event(&self, event: NewEvent) -> Result<InsertEventResult, OrderRelayError>;

    /// Long-poll claim against `ingest_events`.
    async fn claim_ingest_messages(&self, opts: ClaimOptions) -> Result<Vec<QueueMessage>, OrderRelayError>;

    /// Applies one claimed ingest message: per-order lock, state transition
    /// rules, inbox terminal state and the queue delete, all in one
    /// transaction. Never returns an error for business-level conditions
    /// (stale, duplicate, malformed); those are dispositions.
    async fn apply_ingest_message(&self, msg: &QueueMessage) -> Result<IngestOutcome, OrderRelayError>;

    /// Long-poll claim against `shopify_outbound`.
    async fn claim_outbound_messages(&self, opts: ClaimOptions) -> Result<Vec<QueueMessage>, OrderRelayError>;

    /// Deletes a delivered (or dropped) outbound message.
    async fn complete_outbound_message(&self, msg_id: i64) -> Result<(), OrderRelayError>;

    /// Re-enqueues the same outbound body with a visibility delay and deletes
    /// the claimed message, atomically. Used for upstream `429 Retry-After`.
    async fn defer_outbound_message(&self, msg: &QueueMessage, delay_seconds: i64) -> Result<(), OrderRelayError>;
}
