//! Order Relay Engine
//!
//! The core of the order event pipeline. It ingests order lifecycle events
//! from a merchant platform and a courier network and maintains an
//! eventually-consistent canonical order record (plus a shipment record per
//! order) under duplicate delivery, out-of-order arrival and concurrent load
//! on the same order key.
//!
//! The library is organised around a handful of primitives:
//! 1. The event inbox: an append-only store keyed by a unique dedupe key.
//!    Insertion failure on the key is the whole deduplication mechanism.
//! 2. Two durable FIFO-with-visibility-timeout queues backed by the same
//!    store as the business tables, so enqueues and deletes share the
//!    consumer's transaction.
//! 3. A per-order lock registry that linearizes writers to one order while
//!    letting different orders proceed in parallel.
//! 4. The ingest consumer core, which applies last-writer-wins transition
//!    rules by event timestamp inside a single transaction per message.
//! 5. A change broadcaster that fans committed changes out to subscribed
//!    dashboard streams without ever blocking the publisher.
//!
//! You should never need to access the database directly; use the public
//! APIs in [`relay_api`]. The data types are public in [`db_types`].

pub mod db_types;
pub mod dedupe;
pub mod events;
pub mod locks;
pub mod messages;
pub mod order_objects;
pub mod relay_api;
pub mod sqlite;
pub mod test_utils;
pub mod traits;

pub use relay_api::{IngestApi, OrderQueryApi};
pub use sqlite::SqliteDatabase;
