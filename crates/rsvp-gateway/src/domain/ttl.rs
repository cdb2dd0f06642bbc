//! TTL evaluation.
//!
//! Expiry is decided here on every ttl-sensitive read, independent of when
//! (or whether) store housekeeping physically removes the record.

use crate::domain::record::{RsvpId, RsvpRecord};

/// The record's validity window has elapsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("RSVP {id} has expired")]
pub struct ExpiredError {
    pub id: RsvpId,
}

/// Remaining validity in milliseconds: `ttl - (now - created_at)`.
///
/// A result of zero or less is expired. A `now` earlier than `created_at`
/// (clock skew between nodes) counts as no time elapsed.
pub fn remaining(id: &RsvpId, created_at: u64, ttl: u64, now: u64) -> Result<u64, ExpiredError> {
    let elapsed = now.saturating_sub(created_at);
    match ttl.checked_sub(elapsed) {
        Some(left) if left > 0 => Ok(left),
        _ => Err(ExpiredError { id: id.clone() }),
    }
}

/// [`remaining`] for a stored record.
pub fn remaining_for(record: &RsvpRecord, now: u64) -> Result<u64, ExpiredError> {
    remaining(&record.id, record.created_at, record.ttl, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> RsvpId {
        RsvpId::from("token")
    }

    #[test]
    fn test_full_ttl_at_creation() {
        assert_eq!(remaining(&id(), 1_000, 300_000, 1_000), Ok(300_000));
    }

    #[test]
    fn test_partial_ttl() {
        assert_eq!(remaining(&id(), 1_000, 500, 1_200), Ok(300));
    }

    #[test]
    fn test_exact_boundary_is_expired() {
        let err = remaining(&id(), 1_000, 500, 1_500).unwrap_err();
        assert_eq!(err.id, id());
    }

    #[test]
    fn test_past_ttl_is_expired() {
        assert!(remaining(&id(), 1_000, 500, 1_600).is_err());
    }

    #[test]
    fn test_zero_ttl_is_always_expired() {
        assert!(remaining(&id(), 1_000, 0, 1_000).is_err());
    }

    #[test]
    fn test_clock_skew_counts_as_no_elapsed_time() {
        assert_eq!(remaining(&id(), 2_000, 500, 1_000), Ok(500));
    }

    #[test]
    fn test_remaining_for_record() {
        let record = RsvpRecord::new(id(), 0, 1_500, None);
        assert_eq!(remaining_for(&record, 500), Ok(1_000));
    }
}
