//! # Cross-Node Integration Flows
//!
//! Real nodes on ephemeral ports, sharing one record store, driven over HTTP.
//!
//! - `rendezvous`: create / wait / respond, locally and across nodes
//! - `proxy`: failures relayed from or on the way to the owning node

pub mod harness;
pub mod proxy;
pub mod rendezvous;
