//! Node self-identity for the local/remote delivery decision.

use crate::domain::config::IdentityConfig;
use crate::domain::record::{Listener, Protocol};

/// Hostname used when neither a virtual nor a public hostname is configured.
pub const FALLBACK_HOSTNAME: &str = "localhost";

/// Externally visible `{hostname, port, protocol}` of this node.
///
/// Resolved once after the HTTP listener is bound and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    hostname: String,
    port: u16,
    protocol: Protocol,
}

impl NodeIdentity {
    pub fn new(hostname: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            protocol,
        }
    }

    /// Resolve identity per field: virtual override, then public setting,
    /// then the transport's bound port (or [`FALLBACK_HOSTNAME`]).
    pub fn resolve(config: &IdentityConfig, bound_port: u16) -> Self {
        let hostname = config
            .virtual_hostname
            .clone()
            .or_else(|| config.public_hostname.clone())
            .unwrap_or_else(|| FALLBACK_HOSTNAME.to_string());
        let port = config
            .virtual_port
            .or(config.public_port)
            .unwrap_or(bound_port);

        Self {
            hostname,
            port,
            protocol: config.protocol,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// This node as a listener location.
    pub fn listener(&self) -> Listener {
        Listener::new(self.hostname.clone(), self.port, self.protocol)
    }

    /// Whether `listener` names this node. Hostnames compare ASCII
    /// case-insensitively; protocol is not part of the comparison.
    pub fn is_local(&self, listener: &Listener) -> bool {
        self.port == listener.port && self.hostname.eq_ignore_ascii_case(&listener.hostname)
    }

    /// Base URL other parties use to reach this node.
    pub fn origin(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.hostname, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IdentityConfig {
        IdentityConfig {
            protocol: Protocol::Https,
            public_hostname: Some("rsvp.example.com".into()),
            public_port: Some(443),
            virtual_hostname: None,
            virtual_port: None,
        }
    }

    #[test]
    fn test_public_identity() {
        let identity = NodeIdentity::resolve(&config(), 8080);
        assert_eq!(identity.hostname(), "rsvp.example.com");
        assert_eq!(identity.port(), 443);
    }

    #[test]
    fn test_virtual_override_wins() {
        let mut cfg = config();
        cfg.virtual_hostname = Some("pod-7.rsvp".into());
        cfg.virtual_port = Some(31007);
        let identity = NodeIdentity::resolve(&cfg, 8080);
        assert_eq!(identity.hostname(), "pod-7.rsvp");
        assert_eq!(identity.port(), 31007);
    }

    #[test]
    fn test_overrides_apply_per_field() {
        let mut cfg = config();
        cfg.virtual_port = Some(31007);
        let identity = NodeIdentity::resolve(&cfg, 8080);
        assert_eq!(identity.hostname(), "rsvp.example.com");
        assert_eq!(identity.port(), 31007);
    }

    #[test]
    fn test_bound_port_fallback() {
        let identity = NodeIdentity::resolve(&IdentityConfig::default(), 41234);
        assert_eq!(identity.hostname(), FALLBACK_HOSTNAME);
        assert_eq!(identity.port(), 41234);
    }

    #[test]
    fn test_own_listener_is_local() {
        let identity = NodeIdentity::resolve(&config(), 8080);
        assert!(identity.is_local(&identity.listener()));
    }

    #[test]
    fn test_locality_comparison() {
        let identity = NodeIdentity::new("Node-1.Internal", 8443, Protocol::Https);
        assert!(identity.is_local(&Listener::new("node-1.internal", 8443, Protocol::Http)));
        assert!(!identity.is_local(&Listener::new("node-1.internal", 8444, Protocol::Https)));
        assert!(!identity.is_local(&Listener::new("node-2.internal", 8443, Protocol::Https)));
    }
}
