use std::time::Duration;

use log::*;
use order_relay_engine::{
    db_types::QueueMessage,
    messages::OutboundMessage,
    traits::{ClaimOptions, RelayDatabase},
    SqliteDatabase,
};
use serde_json::json;
use shopify_client::{rate_limit::TokenBucket, OrderPushOutcome, ShopifyApi};
use tokio::{sync::watch, task::JoinHandle};

/// Starts the outbound dispatcher loop. Drains `shopify_outbound` under the
/// client-side token bucket; a `429 Retry-After` re-enqueues the same body
/// with the returned delay, any other rejection is logged and dropped (the
/// next real change regenerates the update), and transport failures leave the
/// message claimed so the visibility window redelivers it.
pub fn start_outbound_worker(
    db: SqliteDatabase,
    api: ShopifyApi,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bucket = TokenBucket::new(api.config().rate_limit_capacity, api.config().rate_limit_per_second);
        info!("📤️ Outbound dispatcher started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let batch = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                batch = db.claim_outbound_messages(ClaimOptions::consumer_defaults()) => batch,
            };
            match batch {
                Ok(batch) => {
                    for msg in &batch {
                        dispatch_message(&db, &api, &bucket, msg).await;
                    }
                },
                Err(e) => {
                    error!("📤️ Outbound polling failed: {e}. Restarting after a short backoff.");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                },
            }
        }
        info!("📤️ Outbound dispatcher stopped");
    })
}

async fn dispatch_message(db: &SqliteDatabase, api: &ShopifyApi, bucket: &TokenBucket, msg: &QueueMessage) {
    let parsed: OutboundMessage = match serde_json::from_str(&msg.message) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("📤️ Outbound message {} is not a valid body ({e}). Dropping it.", msg.id);
            if let Err(e) = db.complete_outbound_message(msg.id).await {
                error!("📤️ Could not drop outbound message {}: {e}", msg.id);
            }
            return;
        },
    };
    bucket.acquire().await;
    let payload = json!({ "changedFields": parsed.changed_fields, "order": parsed.order });
    match api.push_order_update(parsed.order_id.as_str(), &payload).await {
        Ok(OrderPushOutcome::Delivered) => {
            if let Err(e) = db.complete_outbound_message(msg.id).await {
                error!("📤️ Delivered order {} but could not delete message {}: {e}", parsed.order_id, msg.id);
            }
        },
        Ok(OrderPushOutcome::RateLimited { retry_after_seconds }) => {
            debug!("📤️ Upstream asked to retry order {} after {retry_after_seconds}s", parsed.order_id);
            if let Err(e) = db.defer_outbound_message(msg, retry_after_seconds).await {
                error!("📤️ Could not defer outbound message {}: {e}", msg.id);
            }
        },
        Ok(OrderPushOutcome::Rejected { status, message }) => {
            warn!(
                "📤️ Upstream rejected order {} with {status}: {message}. Dropping; the next change will re-emit.",
                parsed.order_id
            );
            if let Err(e) = db.complete_outbound_message(msg.id).await {
                error!("📤️ Could not drop rejected message {}: {e}", msg.id);
            }
        },
        Err(e) => {
            // Leave the message claimed; the visibility window will
            // redeliver it once the upstream is reachable again.
            warn!("📤️ Could not reach the upstream for order {}: {e}", parsed.order_id);
        },
    }
}
