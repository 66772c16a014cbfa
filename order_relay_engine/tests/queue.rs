//! Durable queue primitives: claim semantics, visibility timeouts, delayed
//! enqueue and long polling.

use std::time::Duration;

use order_relay_engine::{
    sqlite::db::queue,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    SqliteDatabase,
};

const Q: &str = "test_queue";

async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[tokio::test]
async fn claims_are_fifo_and_bump_read_count() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    for n in 1..=3 {
        queue::enqueue(Q, &format!("msg-{n}"), 0, &mut conn).await.unwrap();
    }
    let first = queue::claim(Q, 30, 2, &mut conn).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].message, "msg-1");
    assert_eq!(first[1].message, "msg-2");
    assert!(first.iter().all(|m| m.read_count == 1));
    let second = queue::claim(Q, 30, 2, &mut conn).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].message, "msg-3");
}

#[tokio::test]
async fn claimed_messages_are_invisible_until_the_window_lapses() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    queue::enqueue(Q, "claimed-once", 0, &mut conn).await.unwrap();
    let claimed = queue::claim(Q, 2, 10, &mut conn).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert!(queue::claim(Q, 2, 10, &mut conn).await.unwrap().is_empty());
    // Visibility expiry makes the message claimable again, with the
    // redelivery visible in its read count.
    tokio::time::sleep(Duration::from_millis(3100)).await;
    let redelivered = queue::claim(Q, 2, 10, &mut conn).await.unwrap();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(redelivered[0].id, claimed[0].id);
    assert_eq!(redelivered[0].read_count, 2);
}

#[tokio::test]
async fn delayed_messages_only_become_visible_when_due() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    queue::enqueue(Q, "later", 2, &mut conn).await.unwrap();
    assert!(queue::claim(Q, 30, 10, &mut conn).await.unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(3100)).await;
    let claimed = queue::claim(Q, 30, 10, &mut conn).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].message, "later");
}

#[tokio::test]
async fn deleted_messages_stay_gone_and_delete_is_idempotent() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let id = queue::enqueue(Q, "ephemeral", 0, &mut conn).await.unwrap();
    let claimed = queue::claim(Q, 0, 10, &mut conn).await.unwrap();
    assert_eq!(claimed.len(), 1);
    queue::delete(id, &mut conn).await.unwrap();
    queue::delete(id, &mut conn).await.unwrap();
    assert!(queue::claim(Q, 0, 10, &mut conn).await.unwrap().is_empty());
    assert_eq!(queue::depth(Q, &mut conn).await.unwrap(), 0);
}

#[tokio::test]
async fn transactional_enqueue_is_invisible_until_commit() {
    let db = setup().await;
    let mut tx = db.pool().begin().await.unwrap();
    queue::enqueue(Q, "tx-message", 0, &mut tx).await.unwrap();
    {
        let mut conn = db.pool().acquire().await.unwrap();
        assert!(queue::claim(Q, 30, 10, &mut conn).await.unwrap().is_empty());
    }
    tx.commit().await.unwrap();
    let mut conn = db.pool().acquire().await.unwrap();
    assert_eq!(queue::claim(Q, 30, 10, &mut conn).await.unwrap().len(), 1);
}

#[tokio::test]
async fn long_poll_picks_up_a_late_arrival() {
    let db = setup().await;
    let pool = db.pool().clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        let mut conn = pool.acquire().await.unwrap();
        queue::enqueue(Q, "late-arrival", 0, &mut conn).await.unwrap();
    });
    let claimed = queue::read_with_poll(Q, 30, 10, Duration::from_secs(5), Duration::from_millis(50), db.pool())
        .await
        .unwrap();
    writer.await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].message, "late-arrival");
}

#[tokio::test]
async fn long_poll_times_out_empty() {
    let db = setup().await;
    let started = std::time::Instant::now();
    let claimed = queue::read_with_poll(Q, 30, 10, Duration::from_millis(600), Duration::from_millis(50), db.pool())
        .await
        .unwrap();
    assert!(claimed.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(600));
}
