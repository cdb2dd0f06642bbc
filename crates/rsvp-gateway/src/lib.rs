//! RSVP Gateway - cross-host request/response rendezvous.
//!
//! A requester creates a short-lived token, a listener waits on it from any
//! node, and a responder posts the answer to any node. The answer reaches the
//! waiting connection wherever it is held: directly when the listener is on
//! the receiving node, through one proxy hop otherwise.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          RSVP NODE                                    │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │   POST /rsvps      GET /rsvps/{id} (SSE)      POST /rsvps/{id}        │
//! │         │                   │                        │                │
//! │  ┌──────┴───────────────────┴────────────────────────┴──────┐         │
//! │  │          Middleware: Tracing → Body limit                │         │
//! │  └──────────────────────────┬───────────────────────────────┘         │
//! │                             │                                         │
//! │  ┌──────────────────────────┴───────────────────────────────┐         │
//! │  │                 Rendezvous Service                        │         │
//! │  │   create · register_listener · route_response · release   │         │
//! │  └───────┬───────────────────┬───────────────────────┬───────┘         │
//! │          │                   │                       │                 │
//! │    RsvpStore          NotificationHub        ResponseForwarder         │
//! │ (memory / RocksDB)   (node-local oneshot)      (reqwest proxy)         │
//! └──────────┼───────────────────────────────────────────┼─────────────────┘
//!            │                                           │
//!      shared by all nodes                        owning node
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rsvp_gateway::{bind, InMemoryRsvpStore, RsvpConfig, SystemTimeSource};
//!
//! let server = bind(
//!     RsvpConfig::default(),
//!     Arc::new(InMemoryRsvpStore::new()),
//!     Arc::new(SystemTimeSource),
//! )
//! .await?;
//! server.run(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod server;
pub mod service;

// Re-exports for public API
pub use adapters::{HttpForwarder, InMemoryRsvpStore};
#[cfg(feature = "rocksdb")]
pub use adapters::RocksDbRsvpStore;
pub use domain::config::{RsvpConfig, StorageBackend};
pub use domain::error::{ApiError, RsvpError, RsvpResult};
pub use domain::identity::NodeIdentity;
pub use domain::record::{Listener, Protocol, RsvpId, RsvpRecord};
pub use ports::{ResponseForwarder, RsvpStore, SystemTimeSource, TimeSource};
pub use server::{bind, BoundServer, ServerError};
pub use service::{CreateRequest, Delivery, RendezvousService, WaitOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
