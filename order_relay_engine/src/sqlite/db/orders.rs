use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Order, OrderId},
    order_objects::MerchantOrderUpdate,
    traits::{OrderPage, OrderRelayError},
};

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderRelayError> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Inserts a minimal order row. Used both for the first merchant create and
/// for the partial-create guard, which passes `status = PENDING_PARTIAL` and
/// an epoch-0 event clock so any real event outranks it.
pub async fn insert_minimal(
    order_id: &OrderId,
    customer_id: &str,
    status: &str,
    last_event_ts: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderRelayError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (order_id, customer_id, status, last_event_ts, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(customer_id)
    .bind(status)
    .bind(last_event_ts)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order {order_id} created with status '{status}'");
    Ok(order)
}

/// Applies a merchant-side update: the six address fields always overwrite
/// (including to null), the optional fields only when the payload carried
/// them, and the event clock always advances to `event_ts`.
pub async fn apply_merchant_update(
    order_id: &OrderId,
    update: &MerchantOrderUpdate,
    event_ts: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderRelayError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("address1 = ");
    set_clause.push_bind_unseparated(update.address.address1.as_deref());
    set_clause.push("address2 = ");
    set_clause.push_bind_unseparated(update.address.address2.as_deref());
    set_clause.push("city = ");
    set_clause.push_bind_unseparated(update.address.city.as_deref());
    set_clause.push("province = ");
    set_clause.push_bind_unseparated(update.address.province.as_deref());
    set_clause.push("zip = ");
    set_clause.push_bind_unseparated(update.address.zip.as_deref());
    set_clause.push("country = ");
    set_clause.push_bind_unseparated(update.address.country.as_deref());
    if let Some(customer_id) = &update.customer_id {
        set_clause.push("customer_id = ");
        set_clause.push_bind_unseparated(customer_id.clone());
    }
    if let Some(status) = &update.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status.clone());
    }
    if let Some(total) = update.total_amount {
        set_clause.push("total_amount = ");
        set_clause.push_bind_unseparated(total.value());
    }
    if let Some(fee) = update.shipping_fee_cents {
        set_clause.push("shipping_fee_cents = ");
        set_clause.push_bind_unseparated(fee.value());
    }
    set_clause.push("last_event_ts = ");
    set_clause.push_bind_unseparated(event_ts);
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(now);
    builder.push(" WHERE order_id = ");
    builder.push_bind(order_id.as_str());
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let row: SqliteRow = builder
        .build()
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| OrderRelayError::OrderNotFound(order_id.clone()))?;
    Ok(Order::from_row(&row)?)
}

/// Advances the order's event clock without touching any other field. Used
/// for courier events and event kinds the pipeline carries through verbatim.
pub async fn advance_event_clock(
    order_id: &OrderId,
    event_ts: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderRelayError> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET last_event_ts = $1, updated_at = $2 WHERE order_id = $3 RETURNING *",
    )
    .bind(event_ts)
    .bind(now)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| OrderRelayError::OrderNotFound(order_id.clone()))?;
    Ok(order)
}

/// Cursor-paginated listing: orders strictly after `cursor` in `order_id`
/// order.
pub async fn list_orders(page: &OrderPage, conn: &mut SqliteConnection) -> Result<Vec<Order>, OrderRelayError> {
    let orders = match &page.cursor {
        Some(cursor) => {
            sqlx::query_as("SELECT * FROM orders WHERE order_id > $1 ORDER BY order_id LIMIT $2")
                .bind(cursor.as_str())
                .bind(page.limit)
                .fetch_all(conn)
                .await?
        },
        None => {
            sqlx::query_as("SELECT * FROM orders ORDER BY order_id LIMIT $1").bind(page.limit).fetch_all(conn).await?
        },
    };
    trace!("📝️ list_orders returned {} row(s)", orders.len());
    Ok(orders)
}
