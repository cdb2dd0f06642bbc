//! Rendezvous error taxonomy and public error bodies.
//!
//! Every variant is recoverable at the request boundary. Only the messages in
//! [`messages`] and the token id ever reach a caller; storage and transport
//! causes are logged instead.

use crate::domain::record::RsvpId;
use crate::domain::ttl::ExpiredError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Public error names
pub mod names {
    pub const NOT_FOUND: &str = "NotFoundError";
    pub const EXPIRED: &str = "ExpiredError";
    pub const INVALID_STATE: &str = "InvalidStateError";
    pub const DATA: &str = "DataError";
    pub const UNKNOWN: &str = "UnknownError";
}

/// Public error messages
pub mod messages {
    pub const NOT_FOUND: &str = "RSVP not found.";
    pub const EXPIRED: &str = "The RSVP has expired.";
    pub const NO_LISTENER: &str = "The RSVP listener was not found.";
    pub const UNKNOWN: &str = "An unknown error occurred.";
}

/// HTTP status codes used by the protocol
pub mod status {
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const INTERNAL_ERROR: u16 = 500;
}

/// JSON error body returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ApiError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            details: serde_json::Map::new(),
        }
    }

    /// Attach the token id under `details.rsvpId`.
    pub fn with_rsvp_id(mut self, id: &RsvpId) -> Self {
        self.details.insert(
            "rsvpId".to_string(),
            serde_json::Value::String(id.to_string()),
        );
        self
    }

    /// Generic, non-descriptive internal error.
    pub fn unknown() -> Self {
        Self::new(names::UNKNOWN, messages::UNKNOWN)
    }

    pub fn to_json_bytes(&self) -> Bytes {
        // Serializing a struct of strings and a JSON map cannot fail.
        Bytes::from(serde_json::to_vec(self).unwrap_or_default())
    }
}

/// Failure relayed from (or on the way to) a remote listening node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("proxied request failed with status {status}")]
pub struct ProxyError {
    /// Status to surface to our own caller
    pub status: u16,
    /// Body to surface verbatim
    pub body: Bytes,
    /// Content type of `body`, when known
    pub content_type: Option<String>,
}

impl ProxyError {
    /// The remote node answered with a non-success response.
    pub fn remote(status: u16, body: Bytes, content_type: Option<String>) -> Self {
        Self {
            status,
            body,
            content_type,
        }
    }

    /// No response was received from the remote node.
    pub fn transport() -> Self {
        Self {
            status: status::INTERNAL_ERROR,
            body: ApiError::unknown().to_json_bytes(),
            content_type: Some("application/json".to_string()),
        }
    }
}

/// Record store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate RSVP id: {0}")]
    Duplicate(RsvpId),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("record serialization error: {0}")]
    Serialization(String),
}

/// Rendezvous protocol errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RsvpError {
    #[error("RSVP not found: {0}")]
    NotFound(RsvpId),

    #[error(transparent)]
    Expired(#[from] ExpiredError),

    #[error("no listener registered for RSVP {0}")]
    NoListener(RsvpId),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl RsvpError {
    /// HTTP status surfaced to the caller
    pub fn status_code(&self) -> u16 {
        match self {
            RsvpError::NotFound(_) => status::NOT_FOUND,
            RsvpError::Expired(_) | RsvpError::NoListener(_) | RsvpError::InvalidData(_) => {
                status::BAD_REQUEST
            }
            RsvpError::Proxy(e) => e.status,
            RsvpError::Store(_) => status::INTERNAL_ERROR,
        }
    }

    /// Public error body. Proxy errors carry their own body and map to the
    /// generic error here.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            RsvpError::NotFound(id) => {
                ApiError::new(names::NOT_FOUND, messages::NOT_FOUND).with_rsvp_id(id)
            }
            RsvpError::Expired(e) => {
                ApiError::new(names::EXPIRED, messages::EXPIRED).with_rsvp_id(&e.id)
            }
            RsvpError::NoListener(id) => {
                ApiError::new(names::INVALID_STATE, messages::NO_LISTENER).with_rsvp_id(id)
            }
            RsvpError::InvalidData(details) => ApiError::new(names::DATA, details.clone()),
            RsvpError::Proxy(_) | RsvpError::Store(_) => ApiError::unknown(),
        }
    }
}

/// Result type for rendezvous operations
pub type RsvpResult<T> = Result<T, RsvpError>;
