//! Adapters implementing the outbound ports.

pub mod http_forwarder;
pub mod memory_store;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

pub use http_forwarder::{ForwarderError, HttpForwarder, FORWARDED_HEADER};
pub use memory_store::InMemoryRsvpStore;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::RocksDbRsvpStore;
