//! Durable FIFO-with-visibility-timeout queues, backed by the same store as
//! the business tables so enqueues and deletes can share the caller's
//! transaction.

use std::time::Duration;

use log::trace;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{db_types::QueueMessage, traits::OrderRelayError};

/// Appends a message to `queue`. With `delay_seconds > 0` the message only
/// becomes claimable after the delay. Callable inside a caller transaction;
/// the message is then visible to readers on commit.
pub async fn enqueue(
    queue: &str,
    message: &str,
    delay_seconds: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, OrderRelayError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO queue_messages (queue, message, visible_at)
            VALUES ($1, $2, datetime('now', '+' || $3 || ' seconds'))
            RETURNING id;
        "#,
    )
    .bind(queue)
    .bind(message)
    .bind(delay_seconds.max(0))
    .fetch_one(conn)
    .await?;
    trace!("📮️ Enqueued message {id} on '{queue}' (delay {delay_seconds}s)");
    Ok(id)
}

/// Claims up to `max_count` visible messages from `queue`, advancing their
/// visibility deadline by `visibility_seconds` and bumping `read_count`.
/// Oldest first; a message whose deadline elapses before it is deleted
/// becomes claimable again.
pub async fn claim(
    queue: &str,
    visibility_seconds: i64,
    max_count: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<QueueMessage>, OrderRelayError> {
    let claimed = sqlx::query_as::<_, QueueMessage>(
        r#"
            UPDATE queue_messages
            SET visible_at = datetime('now', '+' || $2 || ' seconds'),
                read_count = read_count + 1
            WHERE id IN (
                SELECT id FROM queue_messages
                WHERE queue = $1 AND visible_at <= datetime('now')
                ORDER BY id
                LIMIT $3
            )
            RETURNING *;
        "#,
    )
    .bind(queue)
    .bind(visibility_seconds)
    .bind(max_count)
    .fetch_all(conn)
    .await?;
    if !claimed.is_empty() {
        trace!("📮️ Claimed {} message(s) from '{queue}'", claimed.len());
    }
    Ok(claimed)
}

/// Long-poll variant of [`claim`]: blocks up to `max_poll` for a message to
/// arrive, yielding cooperatively every `poll_interval`, and returns an empty
/// vec on timeout.
pub async fn read_with_poll(
    queue: &str,
    visibility_seconds: i64,
    max_count: i64,
    max_poll: Duration,
    poll_interval: Duration,
    pool: &SqlitePool,
) -> Result<Vec<QueueMessage>, OrderRelayError> {
    let deadline = tokio::time::Instant::now() + max_poll;
    loop {
        let mut conn = pool.acquire().await?;
        let claimed = claim(queue, visibility_seconds, max_count, &mut conn).await?;
        drop(conn);
        if !claimed.is_empty() || tokio::time::Instant::now() >= deadline {
            return Ok(claimed);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Confirms inside the caller's transaction that a claimed message still
/// exists, returning `false` when a competing claimant already deleted it.
/// Must be the transaction's first statement: the no-op write takes the
/// database's write lock up front, where a transaction that reads before its
/// first write can instead fail with a stale snapshot once a concurrent
/// commit lands.
pub async fn reassert_claim(msg_id: i64, conn: &mut SqliteConnection) -> Result<bool, OrderRelayError> {
    let result = sqlx::query("UPDATE queue_messages SET visible_at = visible_at WHERE id = $1")
        .bind(msg_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Permanently removes a message. Callable inside a caller transaction.
/// Idempotent: a message already deleted by a competing claimant whose
/// visibility raced ours is not an error.
pub async fn delete(msg_id: i64, conn: &mut SqliteConnection) -> Result<(), OrderRelayError> {
    let result = sqlx::query("DELETE FROM queue_messages WHERE id = $1").bind(msg_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        trace!("📮️ Message {msg_id} was already deleted");
    } else {
        trace!("📮️ Deleted message {msg_id}");
    }
    Ok(())
}

/// Number of messages (visible or claimed) currently on `queue`.
pub async fn depth(queue: &str, conn: &mut SqliteConnection) -> Result<i64, OrderRelayError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM queue_messages WHERE queue = $1")
        .bind(queue)
        .fetch_one(conn)
        .await?;
    Ok(count)
}
