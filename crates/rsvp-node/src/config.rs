//! Node configuration from `RSVP_*` environment variables.
//!
//! Unset variables keep their defaults. A set variable that does not parse
//! is a startup error rather than a silent fallback.

use anyhow::{anyhow, bail, Context, Result};
use rsvp_gateway::domain::config::humantime_serde::parse_duration;
use rsvp_gateway::{Protocol, RsvpConfig, StorageBackend};
use std::str::FromStr;
use std::time::Duration;

/// Load configuration from the process environment.
pub fn load_config() -> Result<RsvpConfig> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration through `lookup`, starting from the defaults.
pub fn load_config_from<F>(lookup: F) -> Result<RsvpConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = RsvpConfig::default();

    // HTTP
    if let Some(host) = lookup("RSVP_HOST") {
        config.http.host = parse("RSVP_HOST", &host)?;
    }
    if let Some(port) = lookup("RSVP_PORT") {
        config.http.port = parse("RSVP_PORT", &port)?;
    }
    if let Some(base_path) = lookup("RSVP_BASE_PATH") {
        config.http.base_path = base_path;
    }

    // Identity
    if let Some(protocol) = lookup("RSVP_PROTOCOL") {
        config.identity.protocol = parse_protocol(&protocol)?;
    }
    config.identity.public_hostname = lookup("RSVP_PUBLIC_HOSTNAME");
    if let Some(port) = lookup("RSVP_PUBLIC_PORT") {
        config.identity.public_port = Some(parse("RSVP_PUBLIC_PORT", &port)?);
    }
    config.identity.virtual_hostname = lookup("RSVP_VIRTUAL_HOSTNAME");
    if let Some(port) = lookup("RSVP_VIRTUAL_PORT") {
        config.identity.virtual_port = Some(parse("RSVP_VIRTUAL_PORT", &port)?);
    }

    // TTL
    if let Some(ttl) = lookup("RSVP_DEFAULT_TTL") {
        config.ttl.default_ttl = duration("RSVP_DEFAULT_TTL", &ttl)?;
    }
    if let Some(ttl) = lookup("RSVP_MAX_TTL") {
        config.ttl.max_ttl = duration("RSVP_MAX_TTL", &ttl)?;
    }

    // Proxy
    if let Some(timeout) = lookup("RSVP_PROXY_TIMEOUT") {
        config.proxy.request_timeout = duration("RSVP_PROXY_TIMEOUT", &timeout)?;
    }
    if let Some(timeout) = lookup("RSVP_PROXY_CONNECT_TIMEOUT") {
        config.proxy.connect_timeout = duration("RSVP_PROXY_CONNECT_TIMEOUT", &timeout)?;
    }

    // Storage
    if let Some(backend) = lookup("RSVP_STORAGE") {
        config.storage.backend = match backend.to_ascii_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "rocksdb" => StorageBackend::Rocksdb,
            other => bail!("RSVP_STORAGE must be \"memory\" or \"rocksdb\", got {other:?}"),
        };
    }
    if let Some(path) = lookup("RSVP_DATA_DIR") {
        config.storage.path = path.into();
    }
    if let Some(interval) = lookup("RSVP_SWEEP_INTERVAL") {
        config.storage.sweep_interval = duration("RSVP_SWEEP_INTERVAL", &interval)?;
    }

    // Limits
    if let Some(size) = lookup("RSVP_MAX_REQUEST_SIZE") {
        config.limits.max_request_size = parse("RSVP_MAX_REQUEST_SIZE", &size)?;
    }

    config.validate().context("Invalid RSVP configuration")?;
    Ok(config)
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {value:?}"))
}

fn duration(key: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| anyhow!("{key} has an invalid duration {value:?}: {e}"))
}

fn parse_protocol(value: &str) -> Result<Protocol> {
    match value.trim().to_ascii_lowercase().as_str() {
        "http" => Ok(Protocol::Http),
        "https" => Ok(Protocol::Https),
        other => bail!("RSVP_PROTOCOL must be \"http\" or \"https\", got {other:?}"),
    }
}
