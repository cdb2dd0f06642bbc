//! Waiting connections and token release.
//!
//! A wait ends on exactly one of delivery, expiry or disconnect. The expiry
//! timer lives inside `await_outcome`, so it is dropped (cancelled) on every
//! path. Release is idempotent, so whichever event loses the race finds
//! nothing left to do.

use super::registry::Registration;
use super::RendezvousService;
use crate::domain::error::{RsvpError, RsvpResult};
use crate::domain::notifications::{Payload, Subscription};
use crate::domain::record::RsvpId;
use std::future::Future;
use tracing::{debug, info, warn};

/// A registered, subscribed wait on this node
pub struct ListenerWait {
    pub registration: Registration,
    subscription: Subscription,
}

impl ListenerWait {
    pub fn id(&self) -> &RsvpId {
        &self.registration.id
    }
}

/// Terminal event of a wait
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// The response arrived; carries the payload bytes
    Delivered(Payload),
    /// The remaining TTL elapsed first
    Expired,
    /// The waiting connection went away first
    Disconnected,
    /// A newer wait for the same id on this node replaced this one
    Superseded,
}

impl RendezvousService {
    /// Register this node as listener for `id` and subscribe for delivery.
    ///
    /// The subscription exists before the listener is published to the
    /// store, so a response routed right after registration finds it. An
    /// older wait for the same id on this node is only superseded once the
    /// registration succeeds; on failure it is put back.
    pub async fn open_wait(&self, id: &RsvpId) -> RsvpResult<ListenerWait> {
        let mut subscription = self.notifications.subscribe(id);

        match self.register_listener(id, self.identity.listener()).await {
            Ok(registration) => {
                self.notifications.commit(&mut subscription);
                Ok(ListenerWait {
                    registration,
                    subscription,
                })
            }
            Err(e) => {
                self.notifications.rollback(subscription);
                Err(e)
            }
        }
    }

    /// Suspend until the wait reaches its terminal event, then release it.
    ///
    /// `disconnected` resolves when the waiting connection is closed by its
    /// peer.
    pub async fn await_outcome<D>(&self, wait: ListenerWait, disconnected: D) -> WaitOutcome
    where
        D: Future<Output = ()>,
    {
        let ListenerWait {
            registration,
            subscription,
        } = wait;
        let remaining = registration.remaining();
        let id = registration.id;
        let generation = subscription.generation;

        let expiry = tokio::time::sleep(remaining);
        tokio::pin!(expiry);
        tokio::pin!(disconnected);

        let outcome = tokio::select! {
            biased;
            received = subscription.receiver => match received {
                Ok(payload) => WaitOutcome::Delivered(payload),
                Err(_) => WaitOutcome::Superseded,
            },
            _ = &mut expiry => WaitOutcome::Expired,
            _ = &mut disconnected => WaitOutcome::Disconnected,
        };

        self.notifications.unsubscribe(&id, generation);

        match &outcome {
            WaitOutcome::Delivered(payload) => {
                debug!(rsvp_id = %id, bytes = payload.len(), "Response delivered");
                self.release_quietly(&id).await;
            }
            WaitOutcome::Expired => {
                info!(rsvp_id = %id, "RSVP expired while waiting");
                self.release_quietly(&id).await;
            }
            WaitOutcome::Disconnected => {
                debug!(rsvp_id = %id, "Listener disconnected");
                self.release_quietly(&id).await;
            }
            WaitOutcome::Superseded => {
                // The newer wait owns the record now
                debug!(rsvp_id = %id, "Wait superseded by a newer registration");
            }
        }

        outcome
    }

    /// Delete the record for `id`. Deleting a missing record succeeds.
    pub async fn release(&self, id: &RsvpId) -> RsvpResult<()> {
        self.store.delete(id).await.map_err(RsvpError::from)
    }

    /// [`release`](Self::release) for paths with nobody left to report to;
    /// failures are logged and swallowed.
    pub async fn release_quietly(&self, id: &RsvpId) {
        if let Err(e) = self.release(id).await {
            warn!(rsvp_id = %id, error = %e, "Could not delete RSVP");
        }
    }
}
