use std::time::Duration;

use log::*;
use order_relay_engine::{traits::ClaimOptions, IngestApi, SqliteDatabase};
use tokio::{sync::watch, task::JoinHandle};

/// Starts the ingest consumer loop. Claims batches from `ingest_events`,
/// applies each message and publishes the resulting change notifications.
/// Honours the shutdown signal between claims: in-flight messages are always
/// finished, no new ones are claimed. Do not await the returned handle before
/// signalling shutdown.
pub fn start_ingest_worker(
    api: IngestApi<SqliteDatabase>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("🔄️ Ingest consumer started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let batch = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                batch = api.claim_batch(ClaimOptions::consumer_defaults()) => batch,
            };
            match batch {
                Ok(batch) => {
                    for msg in &batch {
                        if let Err(e) = api.process_message(msg).await {
                            warn!("🔄️ Message {} failed: {e}. It will be redelivered.", msg.id);
                        }
                    }
                },
                Err(e) => {
                    // A failed poll must not take the consumer down with it.
                    error!("🔄️ Ingest polling failed: {e}. Restarting after a short backoff.");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                },
            }
        }
        info!("🔄️ Ingest consumer stopped");
    })
}
