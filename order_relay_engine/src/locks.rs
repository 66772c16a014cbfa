//! Per-order serialization.
//!
//! The ingest consumer must linearize concurrent updates to one order while
//! letting different orders proceed in parallel. With the embedded SQLite
//! backend there is no server-side advisory lock to lean on, so the registry
//! below provides the equivalent primitive in-process: an async mutex per
//! order-key hash, acquired before the consumer opens its transaction and
//! held until after commit or rollback.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use log::trace;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db_types::OrderId;

/// Registry of in-flight per-order locks. Entries are created on demand and
/// removed again when the last holder releases, so the map only ever contains
/// orders with active or contended claims.
#[derive(Default)]
pub struct OrderLockRegistry {
    entries: Mutex<HashMap<u64, Arc<AsyncMutex<()>>>>,
}

impl OrderLockRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deterministic hash of the order id. The first eight bytes of the
    /// SHA-256 digest, so the keying survives restarts and is independent of
    /// the process's hasher seed.
    pub fn lock_key(order_id: &OrderId) -> u64 {
        let digest = Sha256::digest(order_id.as_str().as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes)
    }

    /// Blocks until the lock for `order_id` is available. The returned guard
    /// releases on drop; hold it across the enclosing transaction's commit.
    pub async fn acquire(self: &Arc<Self>, order_id: &OrderId) -> OrderLockGuard {
        let key = Self::lock_key(order_id);
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };
        trace!("🔒️ Waiting for order lock {key:x} ({order_id})");
        let permit = entry.lock_owned().await;
        trace!("🔒️ Acquired order lock {key:x} ({order_id})");
        OrderLockGuard { key, registry: Arc::clone(self), permit: Some(permit) }
    }
}

/// Held for the duration of one per-order unit of work. Dropping the guard
/// releases the lock and garbage-collects the registry entry when no other
/// task is waiting on it.
pub struct OrderLockGuard {
    key: u64,
    registry: Arc<OrderLockRegistry>,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderLockGuard {
    fn drop(&mut self) {
        self.permit.take();
        let mut entries = self.registry.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(&self.key) {
            // Only the map itself still holds the entry: nobody is waiting.
            if Arc::strong_count(entry) == 1 {
                entries.remove(&self.key);
                trace!("🔒️ Released and collected order lock {:x}", self.key);
            }
        }
    }
}
