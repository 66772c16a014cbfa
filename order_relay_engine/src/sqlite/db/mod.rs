//! # SQLite database methods
//!
//! "Low-level" SQLite interactions for the relay store. All of these are
//! simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument, so callers can hand in a pooled
//! connection or `&mut *tx` from an open transaction without any other
//! changes.

use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod inbox;
pub mod orders;
pub mod queue;
pub mod shipments;

const SQLITE_DB_URL: &str = "sqlite://data/order_relay.db";

pub fn db_url() -> String {
    let result = env::var("DATABASE_URL").unwrap_or_else(|_| {
        info!("DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(10));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
