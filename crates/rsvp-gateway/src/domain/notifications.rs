//! Local notification hub - per-token subscription table.
//!
//! Maps an RSVP id to the single connection on this node waiting for its
//! response. The table is node-local; a waiter on another node is reached
//! through the proxy forwarder instead.
//!
//! Flow:
//! 1. The listening connection calls `subscribe()` and holds the receiver
//! 2. Once its registration is settled it calls `commit()` or `rollback()`
//! 3. The response router calls `publish()` when the response arrives here
//! 4. Every terminal path calls `unsubscribe()` with its generation
//!
//! `publish()` removes the entry before sending, so a payload is handed to
//! at most one receiver and a later `unsubscribe()` is a no-op.

use crate::domain::record::RsvpId;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Response payload as received, byte for byte.
pub type Payload = Bytes;

/// A registered waiter
struct Waiter {
    /// Distinguishes successive subscriptions for the same id
    generation: u64,
    /// Channel to hand the payload to the waiting connection
    sender: oneshot::Sender<Payload>,
}

/// Statistics for the notification hub
#[derive(Debug, Default)]
pub struct NotificationStats {
    /// Total subscriptions created
    pub total_subscribed: AtomicU64,
    /// Total payloads handed to a waiter
    pub total_delivered: AtomicU64,
    /// Total payloads published with no waiter present
    pub total_dropped: AtomicU64,
    /// Total subscriptions replaced by a newer one for the same id
    pub total_superseded: AtomicU64,
}

/// Handle held by a waiting connection.
///
/// The receiver yields the payload, or an error once the subscription has
/// been superseded or removed.
pub struct Subscription {
    pub id: RsvpId,
    pub generation: u64,
    pub receiver: oneshot::Receiver<Payload>,
    /// Waiter replaced by this subscription, parked until commit or rollback
    displaced: Option<Waiter>,
}

/// Per-token subscription table
pub struct NotificationHub {
    waiters: DashMap<RsvpId, Waiter>,
    next_generation: AtomicU64,
    stats: Arc<NotificationStats>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            waiters: DashMap::new(),
            next_generation: AtomicU64::new(1),
            stats: Arc::new(NotificationStats::default()),
        }
    }

    /// Subscribe to the response for `id`.
    ///
    /// An existing subscription for the same id is taken out of the table
    /// but kept alive inside the new one. [`commit`](Self::commit) closes it,
    /// [`rollback`](Self::rollback) restores it.
    pub fn subscribe(&self, id: &RsvpId) -> Subscription {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        let displaced = self
            .waiters
            .insert(id.clone(), Waiter { generation, sender });
        self.stats.total_subscribed.fetch_add(1, Ordering::Relaxed);
        debug!(
            rsvp_id = %id,
            generation,
            replacing = displaced.as_ref().map(|w| w.generation),
            "Subscribed"
        );

        Subscription {
            id: id.clone(),
            generation,
            receiver,
            displaced,
        }
    }

    /// Make `subscription` final. A waiter it replaced observes a closed
    /// channel.
    pub fn commit(&self, subscription: &mut Subscription) {
        if let Some(previous) = subscription.displaced.take() {
            self.stats.total_superseded.fetch_add(1, Ordering::Relaxed);
            debug!(
                rsvp_id = %subscription.id,
                previous_generation = previous.generation,
                generation = subscription.generation,
                "Replaced existing subscription"
            );
        }
    }

    /// Withdraw `subscription` and put back the waiter it replaced.
    ///
    /// A newer subscription that arrived in between stays in place.
    pub fn rollback(&self, subscription: Subscription) {
        let Subscription {
            id,
            generation,
            displaced,
            ..
        } = subscription;
        // A parked waiter whose connection already ended is not restored
        let displaced = displaced.filter(|previous| !previous.sender.is_closed());

        match self.waiters.entry(id) {
            Entry::Occupied(mut entry) if entry.get().generation == generation => {
                match displaced {
                    Some(previous) => {
                        entry.insert(previous);
                    }
                    None => {
                        entry.remove();
                    }
                }
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                if let Some(previous) = displaced {
                    entry.insert(previous);
                }
            }
        }
    }

    /// Hand `payload` to the waiter for `id`.
    ///
    /// Fire-and-forget: returns false and drops the payload when no waiter is
    /// subscribed on this node, or the waiter went away concurrently.
    pub fn publish(&self, id: &RsvpId, payload: Payload) -> bool {
        let Some((_, waiter)) = self.waiters.remove(id) else {
            self.stats.total_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(rsvp_id = %id, "No local subscriber, payload dropped");
            return false;
        };

        match waiter.sender.send(payload) {
            Ok(()) => {
                self.stats.total_delivered.fetch_add(1, Ordering::Relaxed);
                debug!(rsvp_id = %id, generation = waiter.generation, "Published payload");
                true
            }
            Err(_) => {
                // Receiver dropped between lookup and send
                self.stats.total_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(rsvp_id = %id, "Subscriber gone, payload dropped");
                false
            }
        }
    }

    /// Remove the subscription for `id` if it is still `generation`.
    ///
    /// Returns true if an entry was removed.
    pub fn unsubscribe(&self, id: &RsvpId, generation: u64) -> bool {
        self.waiters
            .remove_if(id, |_, waiter| waiter.generation == generation)
            .is_some()
    }

    /// Whether a waiter is subscribed for `id`
    pub fn is_waiting(&self, id: &RsvpId) -> bool {
        self.waiters.contains_key(id)
    }

    /// Number of connections currently waiting on this node
    pub fn waiting_count(&self) -> usize {
        self.waiters.len()
    }

    /// Get statistics
    pub fn stats(&self) -> &NotificationStats {
        &self.stats
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
