//! Background expiry sweep for the record store.
//!
//! Space reclamation only. Expiry decisions never depend on this task having
//! run.

use crate::ports::outbound::{RsvpStore, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Periodically remove records whose TTL has elapsed.
pub async fn sweep_task(store: Arc<dyn RsvpStore>, clock: Arc<dyn TimeSource>, interval: Duration) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;
        match store.remove_expired(clock.now_ms()).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed = removed, "Swept expired RSVPs"),
            Err(e) => warn!(error = %e, "Expired RSVP sweep failed"),
        }
    }
}
