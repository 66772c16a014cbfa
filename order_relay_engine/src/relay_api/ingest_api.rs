use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewEvent, QueueMessage},
    events::ShipmentBroadcaster,
    traits::{ClaimOptions, IngestOutcome, InsertEventResult, OrderRelayError, RelayDatabase},
};

/// `IngestApi` is the primary API for the event pipeline's write path: it
/// accepts events at the ingress boundary and drives the consumer that turns
/// queued events into order state.
pub struct IngestApi<B> {
    db: B,
    broadcaster: ShipmentBroadcaster,
}

impl<B> Debug for IngestApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IngestApi")
    }
}

impl<B> IngestApi<B> {
    pub fn new(db: B, broadcaster: ShipmentBroadcaster) -> Self {
        Self { db, broadcaster }
    }

    pub fn broadcaster(&self) -> &ShipmentBroadcaster {
        &self.broadcaster
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> IngestApi<B>
where B: RelayDatabase
{
    /// Accepts one boundary event: records it in the inbox and enqueues the
    /// matching consumer work, atomically. `inserted: false` means the event
    /// was a duplicate and nothing was stored.
    pub async fn accept_event(&self, event: NewEvent) -> Result<InsertEventResult, OrderRelayError> {
        let order_id = event.order_id.clone();
        let result = self.db.insert_event(event).await?;
        if result.inserted {
            debug!("🔄️ Event for {order_id} accepted under {}", result.dedupe_key);
        } else {
            info!("🔄️ Duplicate event for {order_id} ignored ({})", result.dedupe_key);
        }
        Ok(result)
    }

    /// Long-poll claims the next batch of ingest messages. Blocks up to the
    /// claim options' poll window and may return an empty batch.
    pub async fn claim_batch(&self, opts: ClaimOptions) -> Result<Vec<QueueMessage>, OrderRelayError> {
        self.db.claim_ingest_messages(opts).await
    }

    /// Applies one claimed message and, when the committed transition
    /// produced a change notification, publishes it. Infrastructure errors
    /// propagate; the message then reappears after its visibility window.
    pub async fn process_message(&self, msg: &QueueMessage) -> Result<IngestOutcome, OrderRelayError> {
        let outcome = self.db.apply_ingest_message(msg).await?;
        if let Some(event) = &outcome.broadcast {
            self.broadcaster.publish(event.clone());
        }
        Ok(outcome)
    }

    /// One consumer-loop iteration: claim a batch, process each message in
    /// claim order. Returns the number of messages claimed.
    pub async fn process_next_batch(&self, opts: ClaimOptions) -> Result<usize, OrderRelayError> {
        let batch = self.claim_batch(opts).await?;
        let claimed = batch.len();
        for msg in &batch {
            if let Err(e) = self.process_message(msg).await {
                // Roll-back already happened inside the backend; the message
                // will be redelivered once its visibility window lapses.
                warn!("🔄️ Processing of message {} failed: {e}. It will be redelivered.", msg.id);
            }
        }
        Ok(claimed)
    }
}
