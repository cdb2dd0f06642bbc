//! Listener registration.

use super::RendezvousService;
use crate::domain::error::{RsvpError, RsvpResult};
use crate::domain::record::{Listener, RsvpId};
use crate::domain::ttl;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

/// Result of attaching a listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: RsvpId,
    /// Milliseconds left before the RSVP expires
    pub remaining_ttl: u64,
}

impl Registration {
    /// Duration for the caller's local expiry timer
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.remaining_ttl)
    }
}

impl RendezvousService {
    /// Attach `listener` as the owner of the wait for `id`.
    ///
    /// Re-registration overwrites the previous listener. When the record is
    /// already expired the store write stands but the registration is void
    /// and `Expired` is returned.
    pub async fn register_listener(
        &self,
        id: &RsvpId,
        listener: Listener,
    ) -> RsvpResult<Registration> {
        let now = self.now();
        let record = self
            .store
            .update_listener(id, &listener, now)
            .await
            .map_err(|e| {
                error!(rsvp_id = %id, error = %e, "Failed to register listener");
                RsvpError::from(e)
            })?
            .ok_or_else(|| RsvpError::NotFound(id.clone()))?;

        let remaining_ttl = ttl::remaining_for(&record, now)?;

        debug!(
            rsvp_id = %id,
            hostname = %listener.hostname,
            port = listener.port,
            remaining_ttl_ms = remaining_ttl,
            "Registered listener"
        );

        Ok(Registration {
            id: record.id,
            remaining_ttl,
        })
    }
}
