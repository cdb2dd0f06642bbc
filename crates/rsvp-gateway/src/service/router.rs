//! Response routing: local delivery or proxying to the owning node.

use super::RendezvousService;
use crate::domain::error::{ProxyError, RsvpError, RsvpResult};
use crate::domain::notifications::Payload;
use crate::domain::record::RsvpId;
use crate::domain::ttl;
use crate::ports::outbound::RemoteReply;
use tracing::{debug, error, warn};

/// Where a routed response went
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Published to the waiter on this node
    Local,
    /// Accepted by the owning node; its reply is passed through
    Remote(RemoteReply),
}

impl RendezvousService {
    /// Route a response for `id` to its listener.
    ///
    /// `forwarded` marks a request that another node already proxied here.
    /// Such a request is never proxied again, which stops forwarding loops
    /// between nodes whose identities are misconfigured.
    pub async fn route_response(
        &self,
        id: &RsvpId,
        payload: Payload,
        forwarded: bool,
    ) -> RsvpResult<Delivery> {
        let record = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| {
                error!(rsvp_id = %id, error = %e, "Failed to load RSVP");
                RsvpError::from(e)
            })?
            .ok_or_else(|| RsvpError::NotFound(id.clone()))?;

        let listener = record
            .listener
            .as_ref()
            .ok_or_else(|| RsvpError::NoListener(id.clone()))?;

        ttl::remaining_for(&record, self.now())?;

        if self.identity.is_local(listener) {
            // Fire-and-forget: without a local subscriber the payload is dropped
            let delivered = self.notifications.publish(id, payload);
            debug!(rsvp_id = %id, delivered, "Routed response locally");
            return Ok(Delivery::Local);
        }

        if forwarded {
            warn!(
                rsvp_id = %id,
                listener = %listener.origin(),
                node = %self.identity.origin(),
                "Forwarded response does not belong to this node, refusing to proxy again"
            );
            return Err(ProxyError::transport().into());
        }

        debug!(rsvp_id = %id, listener = %listener.origin(), "Proxying response");
        let reply = self
            .forwarder
            .forward(listener, &self.rsvp_path(id), payload)
            .await?;
        Ok(Delivery::Remote(reply))
    }
}
