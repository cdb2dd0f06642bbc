//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the rendezvous service requires the host to provide.
//!
//! Production: `HttpForwarder`, `InMemoryRsvpStore` / `RocksDbRsvpStore`
//! Testing: `ManualTimeSource` (below) and the in-memory store

use crate::domain::error::{ProxyError, StoreError};
use crate::domain::notifications::Payload;
use crate::domain::record::{Listener, RsvpId, RsvpRecord};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};

/// Request record store shared by every node of the cluster.
///
/// Uniqueness of `id` is enforced by the store. Housekeeping through
/// `remove_expired` is best effort; expiry is decided by the protocol layer.
#[async_trait]
pub trait RsvpStore: Send + Sync {
    /// Insert a new record. Fails with `Duplicate` on an id collision.
    async fn insert(&self, record: &RsvpRecord) -> Result<(), StoreError>;

    /// Find a record by id.
    async fn find_by_id(&self, id: &RsvpId) -> Result<Option<RsvpRecord>, StoreError>;

    /// Atomically set the listener and refresh `updated_at`.
    ///
    /// Returns the updated record, or `None` if no record exists. There is no
    /// window between the existence check and the write.
    async fn update_listener(
        &self,
        id: &RsvpId,
        listener: &Listener,
        now: u64,
    ) -> Result<Option<RsvpRecord>, StoreError>;

    /// Delete a record. Deleting a missing id is not an error.
    async fn delete(&self, id: &RsvpId) -> Result<(), StoreError>;

    /// Remove records whose `created_at + ttl` is at or before `now`.
    ///
    /// Returns the number of records removed.
    async fn remove_expired(&self, now: u64) -> Result<usize, StoreError>;
}

/// Reply received from a remote listening node
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteReply {
    pub status: u16,
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Relays a response to the node owning the listener.
#[async_trait]
pub trait ResponseForwarder: Send + Sync {
    /// POST `payload` to `target` at `path`.
    ///
    /// Non-success replies become `ProxyError::remote`; a missing reply
    /// becomes `ProxyError::transport`.
    async fn forward(
        &self,
        target: &Listener,
        path: &str,
        payload: Payload,
    ) -> Result<RemoteReply, ProxyError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// System time implementation
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            // Clock before Unix epoch - return 0 rather than panic
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
