//! Ports for the rendezvous service.

pub mod outbound;

pub use outbound::{
    ManualTimeSource, RemoteReply, ResponseForwarder, RsvpStore, SystemTimeSource, TimeSource,
};
