//! HTTP middleware for the rendezvous routes.

pub mod tracing;

pub use self::tracing::TracingLayer;
