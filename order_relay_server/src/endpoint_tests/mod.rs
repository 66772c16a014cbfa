mod mocks;

use actix_web::{http::StatusCode, test, web, App};
use chrono::Utc;
use order_relay_engine::{
    db_types::{OrderId, Shipment},
    events::ShipmentBroadcaster,
    traits::{InsertEventResult, OrderWithShipments},
    IngestApi,
    OrderQueryApi,
};
use serde_json::{json, Value};

use self::mocks::{test_order, MockOrderDb, MockRelayDb};
use crate::{
    data_objects::EventResponse,
    routes::{courier_status_update, get_order, list_orders, shopify_webhook},
};

fn accepted_result(id: i64, dedupe_key: &str) -> InsertEventResult {
    InsertEventResult { inserted: true, id: Some(id), dedupe_key: dedupe_key.to_string() }
}

fn duplicate_result(dedupe_key: &str) -> InsertEventResult {
    InsertEventResult { inserted: false, id: None, dedupe_key: dedupe_key.to_string() }
}

#[actix_web::test]
async fn webhook_without_an_order_id_is_rejected() {
    let api = IngestApi::new(MockRelayDb::new(), ShipmentBroadcaster::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .route("/webhooks/shopify/orders", web::post().to(shopify_webhook::<MockRelayDb>)),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/webhooks/shopify/orders")
        .set_json(json!({"customer": {"id": "c1"}}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_acknowledges_fresh_events_with_the_inbox_id() {
    let mut db = MockRelayDb::new();
    db.expect_insert_event().returning(|event| {
        assert_eq!(event.upstream_id.as_deref(), Some("w1"));
        assert_eq!(event.event_type, "SHOPIFY_CREATED");
        Ok(accepted_result(42, "shopify:w1"))
    });
    let api = IngestApi::new(db, ShipmentBroadcaster::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .route("/webhooks/shopify/orders", web::post().to(shopify_webhook::<MockRelayDb>)),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/webhooks/shopify/orders")
        .insert_header(("x-shopify-webhook-id", "w1"))
        .insert_header(("x-shopify-topic", "SHOPIFY_CREATED"))
        .set_json(json!({"id": "o1", "created_at": "2026-01-01T00:00:00Z"}))
        .to_request();
    let resp: EventResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp.status, "Accepted");
    assert_eq!(resp.id, Some(42));
}

#[actix_web::test]
async fn webhook_reports_duplicates_without_an_id() {
    let mut db = MockRelayDb::new();
    db.expect_insert_event().returning(|_| Ok(duplicate_result("shopify:w1")));
    let api = IngestApi::new(db, ShipmentBroadcaster::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .route("/webhooks/shopify/orders", web::post().to(shopify_webhook::<MockRelayDb>)),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/webhooks/shopify/orders")
        .insert_header(("x-shopify-webhook-id", "w1"))
        .set_json(json!({"id": "o1"}))
        .to_request();
    let resp: EventResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp.status, "Duplicate ignored");
    assert_eq!(resp.id, None);
}

#[actix_web::test]
async fn courier_updates_missing_required_fields_are_rejected() {
    let api = IngestApi::new(MockRelayDb::new(), ShipmentBroadcaster::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .route("/events/courier/status_update", web::post().to(courier_status_update::<MockRelayDb>)),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/events/courier/status_update")
        .set_json(json!({"orderId": "o1", "eventType": "COURIER_STATUS_UPDATE"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn courier_updates_are_accepted() {
    let mut db = MockRelayDb::new();
    db.expect_insert_event().returning(|event| {
        assert!(event.upstream_id.is_none());
        Ok(accepted_result(7, "content-hash"))
    });
    let api = IngestApi::new(db, ShipmentBroadcaster::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .route("/events/courier/status_update", web::post().to(courier_status_update::<MockRelayDb>)),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/events/courier/status_update")
        .set_json(json!({
            "orderId": "o1",
            "eventType": "COURIER_STATUS_UPDATE",
            "eventTs": "2026-01-01T00:02:00Z",
            "trackingNumber": "T1",
            "status": "SHIPPED",
        }))
        .to_request();
    let resp: EventResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp.status, "Accepted");
    assert_eq!(resp.id, Some(7));
}

#[actix_web::test]
async fn unknown_orders_return_not_found() {
    let mut db = MockOrderDb::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    let api = OrderQueryApi::new(db);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).route("/orders/{id}", web::get().to(get_order::<MockOrderDb>)),
    )
    .await;
    let req = test::TestRequest::get().uri("/orders/o-missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn orders_are_returned_with_nested_shipments_in_camel_case() {
    let mut db = MockOrderDb::new();
    db.expect_fetch_order().returning(|order_id| {
        let order = test_order(order_id.as_str());
        let shipment = Shipment {
            id: 1,
            order_id: order_id.clone(),
            courier_status: Some("SHIPPED".to_string()),
            tracking_number: Some("T1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        Ok(Some(OrderWithShipments { order, shipments: vec![shipment] }))
    });
    let api = OrderQueryApi::new(db);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).route("/orders/{id}", web::get().to(get_order::<MockOrderDb>)),
    )
    .await;
    let req = test::TestRequest::get().uri("/orders/o1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["orderId"], "o1");
    assert_eq!(body["totalAmount"], 2500);
    assert_eq!(body["shipments"][0]["trackingNumber"], "T1");
    assert_eq!(body["shipments"][0]["courierStatus"], "SHIPPED");
    assert!(body.get("id").is_none());
}

#[actix_web::test]
async fn a_full_page_offers_the_last_order_id_as_cursor() {
    let mut db = MockOrderDb::new();
    db.expect_list_orders().returning(|page| {
        assert_eq!(page.limit, 2);
        assert_eq!(page.cursor, Some(OrderId::from("o0")));
        Ok(vec![test_order("o1"), test_order("o2")])
    });
    let api = OrderQueryApi::new(db);
    let app =
        test::init_service(App::new().app_data(web::Data::new(api)).route("/orders", web::get().to(list_orders::<MockOrderDb>)))
            .await;
    let req = test::TestRequest::get().uri("/orders?limit=2&cursor=o0").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    assert_eq!(body["nextCursor"], "o2");
}

#[actix_web::test]
async fn a_short_page_is_the_last_page() {
    let mut db = MockOrderDb::new();
    db.expect_list_orders().returning(|_| Ok(vec![test_order("o1")]));
    let api = OrderQueryApi::new(db);
    let app =
        test::init_service(App::new().app_data(web::Data::new(api)).route("/orders", web::get().to(list_orders::<MockOrderDb>)))
            .await;
    let req = test::TestRequest::get().uri("/orders?limit=2").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    assert!(body.get("nextCursor").is_none());
}
