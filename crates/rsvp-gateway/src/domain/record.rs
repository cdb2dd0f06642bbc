//! RSVP record and listener location types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque RSVP token.
///
/// Ids arriving from request paths are not validated: an id that does not
/// match any record is reported as not found, echoing the id back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RsvpId(String);

impl RsvpId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RsvpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RsvpId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RsvpId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for RsvpId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Scheme used to reach a listening node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network location of the node holding the open wait connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub hostname: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl Listener {
    pub fn new(hostname: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            protocol,
        }
    }

    /// Origin of the listening node, e.g. `https://node-2.internal:8443`.
    pub fn origin(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.hostname, self.port)
    }
}

/// Persisted RSVP record.
///
/// Timestamps and `ttl` are milliseconds; timestamps count from the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpRecord {
    pub id: RsvpId,
    pub created_at: u64,
    pub updated_at: u64,
    pub ttl: u64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rsvp_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listener: Option<Listener>,
}

impl RsvpRecord {
    /// New unregistered record created at `now`.
    pub fn new(id: RsvpId, now: u64, ttl: u64, rsvp_type: Option<String>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            ttl,
            rsvp_type,
            listener: None,
        }
    }

    /// Instant after which housekeeping may physically remove the record.
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.ttl)
    }
}
