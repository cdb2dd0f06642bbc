//! # Rendezvous Service
//!
//! The protocol core. Creates tokens, attaches listeners, routes responses to
//! the local waiter or the owning node, and releases tokens on their terminal
//! event.
//!
//! ```text
//!  create ──► RsvpStore ◄── register_listener (self identity)
//!                 ▲                 │
//!                 │                 ▼
//!  route_response ┤         NotificationHub ◄── await_outcome
//!                 │                 ▲                (delivery | expiry | disconnect)
//!        local ───┴─── publish ─────┘
//!        remote ────── ResponseForwarder ──► owning node
//! ```

mod housekeeping;
mod lifecycle;
mod registry;
mod router;


pub use housekeeping::sweep_task;
pub use lifecycle::{ListenerWait, WaitOutcome};
pub use registry::Registration;
pub use router::Delivery;

use crate::domain::config::TtlConfig;
use crate::domain::error::{RsvpError, RsvpResult};
use crate::domain::identity::NodeIdentity;
use crate::domain::notifications::NotificationHub;
use crate::domain::record::{RsvpId, RsvpRecord};
use crate::domain::token::TokenGenerator;
use crate::ports::outbound::{ResponseForwarder, RsvpStore, TimeSource};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Input for creating an RSVP
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRequest {
    /// Validity in milliseconds; the configured default when absent
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Opaque classification
    #[serde(default, rename = "type")]
    pub rsvp_type: Option<String>,
}

/// The rendezvous protocol for one node
pub struct RendezvousService {
    store: Arc<dyn RsvpStore>,
    forwarder: Arc<dyn ResponseForwarder>,
    clock: Arc<dyn TimeSource>,
    notifications: Arc<NotificationHub>,
    tokens: TokenGenerator,
    identity: NodeIdentity,
    ttl: TtlConfig,
    base_path: String,
}

impl RendezvousService {
    pub fn new(
        store: Arc<dyn RsvpStore>,
        forwarder: Arc<dyn ResponseForwarder>,
        clock: Arc<dyn TimeSource>,
        identity: NodeIdentity,
        ttl: TtlConfig,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            forwarder,
            clock,
            notifications: Arc::new(NotificationHub::new()),
            tokens: TokenGenerator::new(),
            identity,
            ttl,
            base_path: base_path.into(),
        }
    }

    /// Create and persist a new RSVP.
    pub async fn create(&self, request: CreateRequest) -> RsvpResult<RsvpRecord> {
        let ttl = self.resolve_ttl(request.ttl)?;
        let record = RsvpRecord::new(
            self.tokens.generate(),
            self.clock.now_ms(),
            ttl,
            request.rsvp_type,
        );

        self.store.insert(&record).await.map_err(|e| {
            error!(rsvp_id = %record.id, error = %e, "Failed to store RSVP");
            RsvpError::from(e)
        })?;

        info!(rsvp_id = %record.id, ttl_ms = ttl, "Created RSVP");
        Ok(record)
    }

    /// Path of an RSVP's routes, e.g. `/rsvps/<id>`
    pub fn rsvp_path(&self, id: &RsvpId) -> String {
        format!("{}/{}", self.base_path, id)
    }

    /// Absolute URL of an RSVP on this node
    pub fn rsvp_url(&self, id: &RsvpId) -> String {
        format!("{}{}", self.identity.origin(), self.rsvp_path(id))
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    fn resolve_ttl(&self, requested: Option<u64>) -> RsvpResult<u64> {
        let max = saturating_millis(self.ttl.max_ttl);
        match requested {
            None => Ok(saturating_millis(self.ttl.default_ttl)),
            Some(0) => Err(RsvpError::InvalidData("ttl must be greater than 0".into())),
            Some(ttl) if ttl > max => Err(RsvpError::InvalidData(format!(
                "ttl must not exceed {} ms",
                max
            ))),
            Some(ttl) => Ok(ttl),
        }
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }
}

/// Whole milliseconds of `duration`, clamped to `u64::MAX`
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
