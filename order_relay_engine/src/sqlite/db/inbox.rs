//! Event inbox: the single source of truth for "we have seen this event".
//! Insertion failure on the unique dedupe key is the deduplication signal.

use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InboxEvent, InboxStatus, NewEvent},
    traits::OrderRelayError,
};

/// Inserts an inbox row for `event` under `dedupe_key`. Returns `None` when a
/// row with that key already exists (the duplicate signal), the new row
/// otherwise.
pub async fn insert(
    event: &NewEvent,
    dedupe_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<InboxEvent>, OrderRelayError> {
    let result = sqlx::query_as::<_, InboxEvent>(
        r#"
            INSERT INTO event_inbox (dedupe_key, source, order_id, event_type, event_ts, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(dedupe_key)
    .bind(event.source)
    .bind(event.order_id.as_str())
    .bind(event.event_type.as_str())
    .bind(event.event_ts)
    .bind(event.payload.to_string())
    .fetch_one(conn)
    .await;
    match result {
        Ok(row) => {
            debug!("📥️ Inbox row {} recorded for {} ({dedupe_key})", row.id, row.order_id);
            Ok(Some(row))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("📥️ Duplicate event ignored ({dedupe_key})");
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_by_dedupe_key(
    dedupe_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<InboxEvent>, OrderRelayError> {
    let row = sqlx::query_as("SELECT * FROM event_inbox WHERE dedupe_key = $1")
        .bind(dedupe_key)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Moves an inbox row to a terminal state, stamping `processed_at`.
pub async fn mark(
    id: i64,
    status: InboxStatus,
    processed_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), OrderRelayError> {
    sqlx::query("UPDATE event_inbox SET status = $1, processed_at = $2, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(processed_at)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Marks the row under `dedupe_key` as `FAILED`. Used by the poison-message
/// guard, where the queue message may outlive a resolvable row id.
pub async fn mark_failed_by_key(dedupe_key: &str, conn: &mut SqliteConnection) -> Result<(), OrderRelayError> {
    sqlx::query("UPDATE event_inbox SET status = $1, processed_at = $2, updated_at = $2 WHERE dedupe_key = $3")
        .bind(InboxStatus::Failed)
        .bind(Utc::now())
        .bind(dedupe_key)
        .execute(conn)
        .await?;
    Ok(())
}
