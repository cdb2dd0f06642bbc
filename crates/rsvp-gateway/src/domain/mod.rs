//! Domain types for the rendezvous protocol.
//!
//! Records, identity, TTL evaluation, token generation, configuration, the
//! error taxonomy and the node-local notification table.

pub mod config;
pub mod error;
pub mod identity;
pub mod notifications;
pub mod record;
pub mod token;
pub mod ttl;

// Re-exports for convenience
pub use config::RsvpConfig;
pub use error::{ApiError, ProxyError, RsvpError, RsvpResult, StoreError};
pub use identity::NodeIdentity;
pub use notifications::{NotificationHub, Payload, Subscription};
pub use record::{Listener, Protocol, RsvpId, RsvpRecord};
pub use token::TokenGenerator;
pub use ttl::ExpiredError;
