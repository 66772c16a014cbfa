//! Concurrent burst against a single order key: every submitter races on the
//! same order while several consumer loops drain the queue in parallel. The
//! per-order lock and the event-timestamp check must leave the order at the
//! maximum submitted timestamp with exactly one shipment.

use chrono::{TimeZone, Utc};
use futures_util::future::join_all;
use log::*;
use order_relay_engine::{
    db_types::{EventSource, NewEvent, OrderId},
    events::ShipmentBroadcaster,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{ClaimOptions, OrderManagement, INGEST_QUEUE, OUTBOUND_QUEUE},
    IngestApi,
    SqliteDatabase,
};
use serde_json::json;
use tokio::runtime::Builder;

const NUM_EVENTS: usize = 60;
const NUM_CONSUMERS: usize = 3;
const ORDER: &str = "o-burst";

fn burst_event(n: usize) -> NewEvent {
    // Timestamps deliberately arrive shuffled: stride through the minute
    // range with a co-prime step so neighbours in submission order are far
    // apart in event time.
    let minute = ((n * 37) % NUM_EVENTS) as u32;
    let event_ts = Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0).unwrap();
    if n % 2 == 0 {
        let payload = json!({
            "id": ORDER,
            "updated_at": event_ts.to_rfc3339(),
            "customer": {"id": "c-burst"},
            "shipping_address": {"address1": format!("Street {minute}"), "city": "X"},
            "financial_status": "paid",
        });
        NewEvent::new(EventSource::Shopify, OrderId::from(ORDER), "SHOPIFY_UPDATED", event_ts, payload)
    } else {
        let payload = json!({
            "orderId": ORDER,
            "eventType": "COURIER_STATUS_UPDATE",
            "eventTs": event_ts.to_rfc3339(),
            "trackingNumber": "T-burst",
            "status": format!("STATUS_{minute}"),
        });
        NewEvent::new(EventSource::Courier, OrderId::from(ORDER), "COURIER_STATUS_UPDATE", event_ts, payload)
    }
}

#[test]
fn burst_on_one_order_converges_to_the_maximum_timestamp() {
    let sys = Builder::new_multi_thread().worker_threads(NUM_CONSUMERS + 1).enable_all().build().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database");
        let broadcaster = ShipmentBroadcaster::default();

        info!("🚀️ Injecting {NUM_EVENTS} events for {ORDER}");
        let submissions = (0..NUM_EVENTS).map(|n| {
            let api = IngestApi::new(db.clone(), broadcaster.clone());
            tokio::spawn(async move {
                let result = api.accept_event(burst_event(n)).await.expect("accept failed");
                assert!(result.inserted, "burst events are all distinct");
            })
        });
        let results = join_all(submissions).await;
        assert!(results.iter().all(|r| r.is_ok()), "Not all submitters completed happily");

        info!("🚀️ Draining with {NUM_CONSUMERS} consumer loops");
        let consumers = (0..NUM_CONSUMERS).map(|_| {
            let api = IngestApi::new(db.clone(), broadcaster.clone());
            tokio::spawn(async move {
                let opts =
                    ClaimOptions { visibility_seconds: 30, max_count: 2, max_poll_seconds: 1, poll_interval_ms: 50 };
                let mut idle_rounds = 0;
                while idle_rounds < 2 {
                    let claimed = api.process_next_batch(opts).await.expect("batch failed");
                    if claimed == 0 {
                        idle_rounds += 1;
                    } else {
                        idle_rounds = 0;
                    }
                }
            })
        });
        let results = join_all(consumers).await;
        assert!(results.iter().all(|r| r.is_ok()), "Not all consumers completed happily");

        let max_ts = Utc.with_ymd_and_hms(2026, 3, 1, 10, (NUM_EVENTS - 1) as u32, 0).unwrap();
        let result = db.fetch_order(&OrderId::from(ORDER)).await.unwrap().expect("order must exist");
        assert_eq!(result.order.last_event_ts, Some(max_ts));
        assert_eq!(result.shipments.len(), 1, "upserts must never produce a second shipment");
        assert_eq!(db.queue_depth(INGEST_QUEUE).await.unwrap(), 0);
        assert!(db.queue_depth(OUTBOUND_QUEUE).await.unwrap() > 0);
        info!("🚀️ Burst complete");
    });
}
