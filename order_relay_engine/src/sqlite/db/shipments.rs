use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, Shipment},
    traits::OrderRelayError,
};

pub async fn fetch_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Shipment>, OrderRelayError> {
    let shipment = sqlx::query_as("SELECT * FROM shipments WHERE order_id = $1 ORDER BY id LIMIT 1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(shipment)
}

pub async fn fetch_all_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Shipment>, OrderRelayError> {
    let shipments = sqlx::query_as("SELECT * FROM shipments WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(shipments)
}

/// Upserts the single active shipment for an order: lookup-then-mutate inside
/// the caller's transaction. The schema carries no unique constraint on
/// `order_id`, so callers must hold the per-order lock.
pub async fn upsert(
    order_id: &OrderId,
    courier_status: Option<&str>,
    tracking_number: Option<&str>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Shipment, OrderRelayError> {
    let shipment = match fetch_by_order_id(order_id, conn).await? {
        Some(existing) => {
            sqlx::query_as(
                "UPDATE shipments SET courier_status = $1, tracking_number = $2, updated_at = $3 WHERE id = $4 \
                 RETURNING *",
            )
            .bind(courier_status)
            .bind(tracking_number)
            .bind(now)
            .bind(existing.id)
            .fetch_one(conn)
            .await?
        },
        None => {
            let shipment: Shipment = sqlx::query_as(
                r#"
                    INSERT INTO shipments (order_id, courier_status, tracking_number, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $4)
                    RETURNING *;
                "#,
            )
            .bind(order_id.as_str())
            .bind(courier_status)
            .bind(tracking_number)
            .bind(now)
            .fetch_one(conn)
            .await?;
            debug!("📦️ Shipment {} created for order {order_id}", shipment.id);
            shipment
        },
    };
    Ok(shipment)
}
