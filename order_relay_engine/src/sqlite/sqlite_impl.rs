//! `SqliteDatabase` is the concrete SQLite backend for the relay pipeline.
//!
//! Every trait method is one atomic unit: the ingress insert commits the
//! inbox row and its queue message together, and the consumer core applies
//! the state-transition rules, the inbox terminal state and the queue delete
//! inside a single transaction held under the per-order lock.

use std::{fmt::Debug, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use serde_json::json;
use sqlx::SqlitePool;

use super::db::{inbox, new_pool, orders, queue, shipments};
use crate::{
    db_types::{EventType, NewEvent, Order, OrderId, QueueMessage, STATUS_PENDING_PARTIAL},
    dedupe,
    events::ShipmentUpdateEvent,
    locks::OrderLockRegistry,
    messages::{changed_fields, IngestMessage, OutboundMessage},
    order_objects::{CourierUpdate, MerchantOrderUpdate},
    traits::{
        ClaimOptions,
        IngestDisposition,
        IngestOutcome,
        InsertEventResult,
        OrderManagement,
        OrderPage,
        OrderRelayError,
        OrderWithShipments,
        RelayDatabase,
        INGEST_QUEUE,
        OUTBOUND_QUEUE,
    },
};

/// Redeliveries beyond this mark the inbox row `FAILED` and drop the message.
pub const MAX_INGEST_READ_COUNT: i64 = 8;

/// Status given to orders created by their own merchant create event, before
/// the payload's `financial_status` (if any) overwrites it.
const STATUS_PENDING: &str = "PENDING";

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    locks: Arc<OrderLockRegistry>,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, OrderRelayError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool, locks: OrderLockRegistry::new() })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), OrderRelayError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Number of messages currently on the named queue. Operator/test aid.
    pub async fn queue_depth(&self, queue_name: &str) -> Result<i64, OrderRelayError> {
        let mut conn = self.pool.acquire().await?;
        queue::depth(queue_name, &mut conn).await
    }

    pub async fn fetch_inbox_entry(
        &self,
        dedupe_key: &str,
    ) -> Result<Option<crate::db_types::InboxEvent>, OrderRelayError> {
        let mut conn = self.pool.acquire().await?;
        inbox::fetch_by_dedupe_key(dedupe_key, &mut conn).await
    }

    /// Drops a message without touching order state. Used for bodies that can
    /// never be applied.
    async fn drop_message(&self, msg_id: i64) -> Result<(), OrderRelayError> {
        let mut conn = self.pool.acquire().await?;
        queue::delete(msg_id, &mut conn).await
    }

    async fn claim(&self, queue_name: &str, opts: ClaimOptions) -> Result<Vec<QueueMessage>, OrderRelayError> {
        queue::read_with_poll(
            queue_name,
            opts.visibility_seconds,
            opts.max_count,
            Duration::from_secs(opts.max_poll_seconds),
            Duration::from_millis(opts.poll_interval_ms),
            &self.pool,
        )
        .await
    }
}

impl RelayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_event(&self, event: NewEvent) -> Result<InsertEventResult, OrderRelayError> {
        let dedupe_key = dedupe::dedupe_key(&event);
        let mut tx = self.pool.begin().await?;
        match inbox::insert(&event, &dedupe_key, &mut tx).await? {
            Some(row) => {
                let body = serde_json::to_string(&IngestMessage::from_event(&event, &dedupe_key))?;
                queue::enqueue(INGEST_QUEUE, &body, 0, &mut tx).await?;
                tx.commit().await?;
                Ok(InsertEventResult { inserted: true, id: Some(row.id), dedupe_key })
            },
            None => {
                tx.rollback().await?;
                Ok(InsertEventResult { inserted: false, id: None, dedupe_key })
            },
        }
    }

    async fn claim_ingest_messages(&self, opts: ClaimOptions) -> Result<Vec<QueueMessage>, OrderRelayError> {
        self.claim(INGEST_QUEUE, opts).await
    }

    async fn apply_ingest_message(&self, msg: &QueueMessage) -> Result<IngestOutcome, OrderRelayError> {
        let parsed: IngestMessage = match serde_json::from_str(&msg.message) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("🔄️ Message {} is not a valid ingest body ({e}). Dropping it permanently.", msg.id);
                self.drop_message(msg.id).await?;
                return Ok(IngestOutcome::silent(IngestDisposition::DroppedMalformed));
            },
        };
        if parsed.order_id.as_str().is_empty() || parsed.dedupe_key.is_empty() {
            warn!("🔄️ Message {} is missing its order id or dedupe key. Dropping it permanently.", msg.id);
            self.drop_message(msg.id).await?;
            return Ok(IngestOutcome::silent(IngestDisposition::DroppedMalformed));
        }
        if msg.read_count > MAX_INGEST_READ_COUNT {
            warn!(
                "🔄️ Message {} for order {} has been redelivered {} times. Marking {} as FAILED and dropping it.",
                msg.id, parsed.order_id, msg.read_count, parsed.dedupe_key
            );
            let mut tx = self.pool.begin().await?;
            inbox::mark_failed_by_key(&parsed.dedupe_key, &mut tx).await?;
            queue::delete(msg.id, &mut tx).await?;
            tx.commit().await?;
            return Ok(IngestOutcome::silent(IngestDisposition::Poisoned));
        }

        // Serialize with every other writer to this order. The guard spans
        // the whole transaction, commit included.
        let _order_lock = self.locks.acquire(&parsed.order_id).await;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !queue::reassert_claim(msg.id, &mut tx).await? {
            debug!("🔄️ Message {} was already completed by another claimant.", msg.id);
            tx.rollback().await?;
            return Ok(IngestOutcome::silent(IngestDisposition::AlreadyTerminal));
        }

        let inbox_row = inbox::fetch_by_dedupe_key(&parsed.dedupe_key, &mut tx).await?;
        match &inbox_row {
            None => warn!(
                "🔄️ No inbox row found for {}. The ingress boundary should have recorded one; processing anyway.",
                parsed.dedupe_key
            ),
            Some(row) if row.status.is_terminal() => {
                // Redelivery of a message whose effects already committed.
                debug!("🔄️ Inbox row for {} is already {}. Discarding redelivery.", parsed.dedupe_key, row.status);
                queue::delete(msg.id, &mut tx).await?;
                tx.commit().await?;
                return Ok(IngestOutcome::silent(IngestDisposition::AlreadyTerminal));
            },
            Some(_) => {},
        }

        let event_type = EventType::from(parsed.event_type.as_str());
        let mut created_here = false;
        let order = match orders::fetch_order_by_order_id(&parsed.order_id, &mut tx).await? {
            Some(order) => order,
            None => {
                let customer_id = parsed.payload["customer"]["id"]
                    .as_str()
                    .map(String::from)
                    .or_else(|| parsed.payload["customer"]["id"].as_i64().map(|id| id.to_string()))
                    .unwrap_or_else(|| "unknown".to_string());
                created_here = true;
                if event_type == EventType::ShopifyCreated {
                    orders::insert_minimal(&parsed.order_id, &customer_id, STATUS_PENDING, None, now, &mut tx).await?
                } else {
                    // An update or courier event beat the create webhook here.
                    // Park a partial order so the event is not lost; the
                    // epoch-0 clock lets any real event outrank it.
                    info!("🔄️ First event for {} is {}. Creating a partial order.", parsed.order_id, parsed.event_type);
                    orders::insert_minimal(
                        &parsed.order_id,
                        &customer_id,
                        STATUS_PENDING_PARTIAL,
                        Some(DateTime::<Utc>::UNIX_EPOCH),
                        now,
                        &mut tx,
                    )
                    .await?
                }
            },
        };

        if let Some(last_event_ts) = order.last_event_ts {
            if parsed.event_ts < last_event_ts {
                debug!(
                    "🔄️ Event {} for {} is older than the order clock ({} < {last_event_ts}). Ignoring as stale.",
                    parsed.dedupe_key, parsed.order_id, parsed.event_ts
                );
                if let Some(row) = &inbox_row {
                    inbox::mark(row.id, crate::db_types::InboxStatus::IgnoredStale, now, &mut tx).await?;
                }
                queue::delete(msg.id, &mut tx).await?;
                tx.commit().await?;
                return Ok(IngestOutcome::silent(IngestDisposition::IgnoredStale));
            }
            if parsed.event_ts == last_event_ts && !created_here {
                debug!(
                    "🔄️ Event {} for {} carries the same timestamp as the applied clock. Ignoring as a duplicate.",
                    parsed.dedupe_key, parsed.order_id
                );
                if let Some(row) = &inbox_row {
                    inbox::mark(row.id, crate::db_types::InboxStatus::DuplicateIgnored, now, &mut tx).await?;
                }
                queue::delete(msg.id, &mut tx).await?;
                tx.commit().await?;
                return Ok(IngestOutcome::silent(IngestDisposition::DuplicateIgnored));
            }
        }

        let mut broadcast: Option<ShipmentUpdateEvent> = None;
        let courier = CourierUpdate::from_payload(&parsed.payload);
        let is_merchant = event_type.is_merchant();
        let is_courier = event_type == EventType::CourierStatusUpdate;

        if is_merchant {
            let update = MerchantOrderUpdate::from_payload(&parsed.payload);
            let updated = orders::apply_merchant_update(&parsed.order_id, &update, parsed.event_ts, now, &mut tx).await?;
            let changed = changed_fields(&order, &updated);
            let outbound = OutboundMessage::new(&updated, changed.clone());
            queue::enqueue(OUTBOUND_QUEUE, &serde_json::to_string(&outbound)?, 0, &mut tx).await?;
            let summary =
                if event_type == EventType::ShopifyCreated { "Order Created" } else { "Order Updated" };
            broadcast = Some(ShipmentUpdateEvent::new(parsed.order_id.clone(), changed, summary));
        }
        if is_courier || (is_merchant && courier.tracking_number.is_some()) {
            if courier.tracking_number.is_some() {
                shipments::upsert(
                    &parsed.order_id,
                    courier.courier_status.as_deref(),
                    courier.tracking_number.as_deref(),
                    now,
                    &mut tx,
                )
                .await?;
            }
            if !is_merchant {
                orders::advance_event_clock(&parsed.order_id, parsed.event_ts, now, &mut tx).await?;
            }
            let status = courier.courier_status.as_deref().unwrap_or("UNKNOWN");
            // The courier notification supersedes the merchant one when a
            // single message carries both kinds of effect.
            broadcast = Some(ShipmentUpdateEvent::new(
                parsed.order_id.clone(),
                json!({ "courierStatus": status }),
                format!("Shipment Update: {status}"),
            ));
        }
        if !is_merchant && !is_courier {
            debug!("🔄️ Event kind '{}' has no transition rules. Advancing the event clock only.", parsed.event_type);
            orders::advance_event_clock(&parsed.order_id, parsed.event_ts, now, &mut tx).await?;
        }

        if let Some(row) = &inbox_row {
            inbox::mark(row.id, crate::db_types::InboxStatus::Processed, now, &mut tx).await?;
        }
        queue::delete(msg.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🔄️ Event {} applied to order {}", parsed.dedupe_key, parsed.order_id);
        Ok(IngestOutcome { disposition: IngestDisposition::Processed, broadcast })
    }

    async fn claim_outbound_messages(&self, opts: ClaimOptions) -> Result<Vec<QueueMessage>, OrderRelayError> {
        self.claim(OUTBOUND_QUEUE, opts).await
    }

    async fn complete_outbound_message(&self, msg_id: i64) -> Result<(), OrderRelayError> {
        let mut conn = self.pool.acquire().await?;
        queue::delete(msg_id, &mut conn).await
    }

    async fn defer_outbound_message(&self, msg: &QueueMessage, delay_seconds: i64) -> Result<(), OrderRelayError> {
        let mut tx = self.pool.begin().await?;
        queue::enqueue(&msg.queue, &msg.message, delay_seconds, &mut tx).await?;
        queue::delete(msg.id, &mut tx).await?;
        tx.commit().await?;
        debug!("📤️ Outbound message {} re-enqueued with a {delay_seconds}s delay", msg.id);
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<OrderWithShipments>, OrderRelayError> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = orders::fetch_order_by_order_id(order_id, &mut conn).await? else {
            return Ok(None);
        };
        let shipments = shipments::fetch_all_for_order(order_id, &mut conn).await?;
        Ok(Some(OrderWithShipments { order, shipments }))
    }

    async fn list_orders(&self, page: OrderPage) -> Result<Vec<Order>, OrderRelayError> {
        let mut conn = self.pool.acquire().await?;
        orders::list_orders(&page, &mut conn).await
    }
}
