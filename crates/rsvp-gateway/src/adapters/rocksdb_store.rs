//! # RocksDB Record Store
//!
//! Persistent implementation of [`RsvpStore`] for single-host deployments
//! and restarts.
//!
//! ## Key Layout
//!
//! - `rsvp/<id>` - JSON encoded [`RsvpRecord`]
//! - `expires/<created_at + ttl, 20 digits>/<id>` - housekeeping index,
//!   scanned in order and cut off at the first entry still valid
//!
//! Writes that read first (insert, listener update, delete) are serialized by
//! a mutex so the test-and-set and the index stay consistent. All database
//! calls run on the blocking pool.

use crate::domain::error::StoreError;
use crate::domain::record::{Listener, RsvpId, RsvpRecord};
use crate::ports::outbound::RsvpStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const RECORD_PREFIX: &str = "rsvp/";
const EXPIRY_PREFIX: &str = "expires/";

fn record_key(id: &RsvpId) -> Vec<u8> {
    format!("{RECORD_PREFIX}{id}").into_bytes()
}

fn expiry_key(record: &RsvpRecord) -> Vec<u8> {
    format!("{EXPIRY_PREFIX}{:020}/{}", record.expires_at(), record.id).into_bytes()
}

/// Parse `expires/<ms>/<id>` back into its parts.
fn parse_expiry_key(key: &[u8]) -> Option<(u64, RsvpId)> {
    let key = std::str::from_utf8(key).ok()?;
    let rest = key.strip_prefix(EXPIRY_PREFIX)?;
    let (expires_at, id) = rest.split_once('/')?;
    Some((expires_at.parse().ok()?, RsvpId::from(id)))
}

fn backend(e: rocksdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn encode(record: &RsvpRecord) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<RsvpRecord, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

struct Inner {
    db: DB,
    write_lock: Mutex<()>,
}

impl Inner {
    fn get(&self, id: &RsvpId) -> Result<Option<RsvpRecord>, StoreError> {
        self.db
            .get(record_key(id))
            .map_err(backend)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn insert(&self, record: &RsvpRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        if self.db.get(record_key(&record.id)).map_err(backend)?.is_some() {
            return Err(StoreError::Duplicate(record.id.clone()));
        }

        let mut batch = WriteBatch::default();
        batch.put(record_key(&record.id), encode(record)?);
        batch.put(expiry_key(record), b"");
        self.db.write(batch).map_err(backend)
    }

    fn update_listener(
        &self,
        id: &RsvpId,
        listener: &Listener,
        now: u64,
    ) -> Result<Option<RsvpRecord>, StoreError> {
        let _guard = self.write_lock.lock();
        let Some(mut record) = self.get(id)? else {
            return Ok(None);
        };

        record.listener = Some(listener.clone());
        record.updated_at = now;
        self.db
            .put(record_key(id), encode(&record)?)
            .map_err(backend)?;
        Ok(Some(record))
    }

    fn delete(&self, id: &RsvpId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let Some(record) = self.get(id)? else {
            return Ok(());
        };

        let mut batch = WriteBatch::default();
        batch.delete(record_key(id));
        batch.delete(expiry_key(&record));
        self.db.write(batch).map_err(backend)
    }

    fn remove_expired(&self, now: u64) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock();
        let mut batch = WriteBatch::default();
        let mut removed = 0;

        let iter = self.db.iterator(IteratorMode::From(
            EXPIRY_PREFIX.as_bytes(),
            Direction::Forward,
        ));
        for item in iter {
            let (key, _) = item.map_err(backend)?;
            if !key.starts_with(EXPIRY_PREFIX.as_bytes()) {
                break;
            }
            let Some((expires_at, id)) = parse_expiry_key(&key) else {
                continue;
            };
            if expires_at > now {
                break;
            }
            batch.delete(&key);
            batch.delete(record_key(&id));
            removed += 1;
        }

        if removed > 0 {
            self.db.write(batch).map_err(backend)?;
        }
        Ok(removed)
    }
}

/// RocksDB-backed [`RsvpStore`]
#[derive(Clone)]
pub struct RocksDbRsvpStore {
    inner: Arc<Inner>,
}

impl RocksDbRsvpStore {
    /// Open or create a database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&opts, path.as_ref()).map_err(|e| {
            StoreError::Backend(format!("failed to open RocksDB: {}", e))
        })?;
        debug!(path = %path.as_ref().display(), "Opened RSVP record store");

        Ok(Self {
            inner: Arc::new(Inner {
                db,
                write_lock: Mutex::new(()),
            }),
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| StoreError::Backend(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl RsvpStore for RocksDbRsvpStore {
    async fn insert(&self, record: &RsvpRecord) -> Result<(), StoreError> {
        let record = record.clone();
        self.blocking(move |inner| inner.insert(&record)).await
    }

    async fn find_by_id(&self, id: &RsvpId) -> Result<Option<RsvpRecord>, StoreError> {
        let id = id.clone();
        self.blocking(move |inner| inner.get(&id)).await
    }

    async fn update_listener(
        &self,
        id: &RsvpId,
        listener: &Listener,
        now: u64,
    ) -> Result<Option<RsvpRecord>, StoreError> {
        let id = id.clone();
        let listener = listener.clone();
        self.blocking(move |inner| inner.update_listener(&id, &listener, now))
            .await
    }

    async fn delete(&self, id: &RsvpId) -> Result<(), StoreError> {
        let id = id.clone();
        self.blocking(move |inner| inner.delete(&id)).await
    }

    async fn remove_expired(&self, now: u64) -> Result<usize, StoreError> {
        self.blocking(move |inner| inner.remove_expired(now)).await
    }
}
