//! # RSVP Test Suite
//!
//! Multi-node flows against real servers.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs     # Test nodes, SSE parsing
//!     ├── rendezvous.rs  # Create / wait / respond, local and cross-node
//!     └── proxy.rs       # Relayed remote failures, transport faults
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rsvp-tests
//! cargo test -p rsvp-tests integration::proxy::
//! ```

pub mod integration;
