//! In-memory record store.
//!
//! Single-process stand-in for the shared document store. Nodes in one
//! process (tests, local clusters) can share it through an `Arc`.

use crate::domain::error::StoreError;
use crate::domain::record::{Listener, RsvpId, RsvpRecord};
use crate::ports::outbound::RsvpStore;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// DashMap-backed [`RsvpStore`].
///
/// Conditional updates run under the shard lock of the entry, which gives
/// the required test-and-set semantics.
#[derive(Default)]
pub struct InMemoryRsvpStore {
    records: DashMap<RsvpId, RsvpRecord>,
}

impl InMemoryRsvpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired or not
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RsvpStore for InMemoryRsvpStore {
    async fn insert(&self, record: &RsvpRecord) -> Result<(), StoreError> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &RsvpId) -> Result<Option<RsvpRecord>, StoreError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn update_listener(
        &self,
        id: &RsvpId,
        listener: &Listener,
        now: u64,
    ) -> Result<Option<RsvpRecord>, StoreError> {
        Ok(self.records.get_mut(id).map(|mut record| {
            record.listener = Some(listener.clone());
            record.updated_at = now;
            record.value().clone()
        }))
    }

    async fn delete(&self, id: &RsvpId) -> Result<(), StoreError> {
        self.records.remove(id);
        Ok(())
    }

    async fn remove_expired(&self, now: u64) -> Result<usize, StoreError> {
        let before = self.records.len();
        self.records.retain(|_, record| record.expires_at() > now);
        Ok(before.saturating_sub(self.records.len()))
    }
}
