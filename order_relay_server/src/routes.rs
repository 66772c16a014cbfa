//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line
//! or two go into a separate module; conversions live in [`crate::integrations`].
//!
//! Handlers are generic over the backend traits so the endpoint tests can run
//! them against mocks; `server.rs` instantiates them for `SqliteDatabase`.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use log::*;
use order_relay_engine::{
    db_types::OrderId,
    events::ShipmentBroadcaster,
    traits::{OrderManagement, OrderPage, RelayDatabase},
    IngestApi,
    OrderQueryApi,
};
use serde_json::Value;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::{
    data_objects::{EventResponse, ListOrdersQuery, OrderListResult, OrderResult},
    errors::ServerError,
    integrations::{courier, shopify},
};

// ----------------------------------------------   Health  ----------------------------------------------------

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Ingress  ----------------------------------------------------

/// `POST /webhooks/shopify/orders`. The `x-shopify-webhook-id` header (when
/// present) is the upstream retry id; `x-shopify-topic` is the event type.
pub async fn shopify_webhook<B: RelayDatabase>(
    req: HttpRequest,
    body: web::Json<Value>,
    api: web::Data<IngestApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("🛍️️ Received webhook request: {}", req.uri());
    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok()).map(String::from);
    let webhook_id = header("x-shopify-webhook-id");
    let topic = header("x-shopify-topic").unwrap_or_else(|| shopify::DEFAULT_TOPIC.to_string());
    let event = shopify::new_event_from_webhook(&topic, webhook_id, body.into_inner())?;
    let order_id = event.order_id.clone();
    let result = api.accept_event(event).await.map_err(|e| {
        warn!("🛍️️ Could not accept webhook for order {order_id}. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    let response = if result.inserted {
        info!("🛍️️ Webhook for order {order_id} accepted ({topic})");
        EventResponse::accepted(result.id)
    } else {
        info!("🛍️️ Webhook for order {order_id} was a duplicate");
        EventResponse::duplicate()
    };
    Ok(HttpResponse::Ok().json(response))
}

/// `POST /events/courier/status_update`.
pub async fn courier_status_update<B: RelayDatabase>(
    body: web::Json<Value>,
    api: web::Data<IngestApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event = courier::new_event_from_status_update(body.into_inner())?;
    let order_id = event.order_id.clone();
    let result = api.accept_event(event).await.map_err(|e| {
        warn!("🚚️ Could not accept courier update for order {order_id}. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    let response = if result.inserted {
        info!("🚚️ Courier update for order {order_id} accepted");
        EventResponse::accepted(result.id)
    } else {
        info!("🚚️ Courier update for order {order_id} was a duplicate");
        EventResponse::duplicate()
    };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Orders  ----------------------------------------------------

/// `GET /orders?limit=&cursor=`. The cursor is a business order id.
pub async fn list_orders<B: OrderManagement>(
    query: web::Query<ListOrdersQuery>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    let page = OrderPage::new(query.limit, query.cursor.map(OrderId::from));
    let limit = page.limit;
    let orders = api.list_orders(page).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    // Only offer a cursor when this page was full; a short page is the end.
    let next_cursor = if orders.len() as i64 == limit { orders.last().map(|o| o.order_id.clone()) } else { None };
    let orders = orders.iter().map(OrderResult::from_order).collect();
    Ok(HttpResponse::Ok().json(OrderListResult { orders, next_cursor }))
}

/// `GET /orders/{id}`: one order with its shipments nested.
pub async fn get_order<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    match api.fetch_order(&order_id).await.map_err(|e| ServerError::BackendError(e.to_string()))? {
        Some(result) => {
            Ok(HttpResponse::Ok().json(OrderResult::with_shipments(&result.order, &result.shipments)))
        },
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({ "error": format!("Order {order_id} not found") }))),
    }
}

//----------------------------------------------   Streaming  ----------------------------------------------------

/// `GET /stream/shipments`: Server-Sent-Events feed of committed order
/// changes. Subscribers that fall behind lose the oldest events rather than
/// slowing the pipeline; the stream itself keeps going.
pub async fn shipment_stream(broadcaster: web::Data<ShipmentBroadcaster>) -> HttpResponse {
    debug!("📡️ New shipment stream subscriber ({} active)", broadcaster.subscriber_count());
    let stream = BroadcastStream::new(broadcaster.subscribe()).filter_map(|event| async move {
        match event {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(format!(
                    "event: shipment_update\ndata: {json}\n\n"
                )))),
                Err(e) => {
                    error!("📡️ Could not serialize shipment update: {e}");
                    None
                },
            },
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!("📡️ Stream subscriber lagged; {missed} event(s) dropped");
                None
            },
        }
    });
    HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-cache"))
        .content_type("text/event-stream")
        .streaming(stream)
}
