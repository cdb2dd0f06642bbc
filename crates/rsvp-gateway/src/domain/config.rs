//! Node configuration with validation.

use crate::domain::record::Protocol;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Main node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RsvpConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Externally visible identity of this node
    pub identity: IdentityConfig,
    /// Token validity defaults and bounds
    pub ttl: TtlConfig,
    /// Outbound proxy transport
    pub proxy: ProxyConfig,
    /// Record store backend
    pub storage: StorageConfig,
    /// Request limits
    pub limits: LimitsConfig,
}

impl RsvpConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.http.base_path.starts_with('/') || self.http.base_path.ends_with('/') {
            return Err(ConfigError::InvalidBasePath(self.http.base_path.clone()));
        }

        if self.ttl.default_ttl == Duration::ZERO {
            return Err(ConfigError::InvalidTtl("default_ttl cannot be 0".into()));
        }
        if self.ttl.default_ttl > self.ttl.max_ttl {
            return Err(ConfigError::InvalidTtl(
                "default_ttl cannot exceed max_ttl".into(),
            ));
        }

        if self.proxy.request_timeout == Duration::ZERO {
            return Err(ConfigError::InvalidTimeout(
                "proxy request_timeout cannot be 0".into(),
            ));
        }

        if self.storage.sweep_interval == Duration::ZERO {
            return Err(ConfigError::Invalid("sweep_interval cannot be 0".into()));
        }

        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if matches!(self.identity.virtual_hostname.as_deref(), Some("")) {
            return Err(ConfigError::Invalid("virtual_hostname cannot be empty".into()));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080, 0 = ephemeral)
    pub port: u16,
    /// Path prefix for RSVP routes
    pub base_path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            base_path: "/rsvps".to_string(),
        }
    }
}

/// Node identity used for the local/remote delivery decision.
///
/// The virtual overrides identify one logical node when several share a
/// physical host (e.g. pods behind one address).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Scheme other nodes use to reach this one
    pub protocol: Protocol,
    /// Public hostname
    pub public_hostname: Option<String>,
    /// Public port
    pub public_port: Option<u16>,
    /// Per-process hostname override
    pub virtual_hostname: Option<String>,
    /// Per-process port override
    pub virtual_port: Option<u16>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Https,
            public_hostname: None,
            public_port: None,
            virtual_hostname: None,
            virtual_port: None,
        }
    }
}

/// Token validity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// TTL applied when the creator does not supply one
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
    /// Largest TTL a creator may request
    #[serde(with = "humantime_serde")]
    pub max_ttl: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            max_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Whole-request timeout for forwarded responses
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connection establishment timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Record store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Rocksdb,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database directory (RocksDB only)
    pub path: PathBuf,
    /// Interval of the background expiry sweep
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("./data/rsvp"),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024, // 1MB
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base path: {0:?}")]
    InvalidBasePath(String),
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Parse `"500ms"`, `"10s"`, `"5m"` or plain seconds.
    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
