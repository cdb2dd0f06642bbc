//! Proxy forwarder over HTTP.
//!
//! Relays a response payload to the node owning the listener, through one
//! pooled `reqwest` client shared by all forwarded calls.

use crate::domain::config::ProxyConfig;
use crate::domain::error::ProxyError;
use crate::domain::notifications::Payload;
use crate::domain::record::Listener;
use crate::ports::outbound::{RemoteReply, ResponseForwarder};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

/// Header marking a request as already forwarded once.
pub const FORWARDED_HEADER: &str = "x-rsvp-forwarded";

/// Errors building the forwarder
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// `reqwest`-backed [`ResponseForwarder`].
pub struct HttpForwarder {
    client: Client,
}

impl HttpForwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self, ForwarderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Target URL: `{protocol}://{hostname}:{port}{path}`.
    pub fn target_url(target: &Listener, path: &str) -> String {
        format!("{}{}", target.origin(), path)
    }
}

#[async_trait]
impl ResponseForwarder for HttpForwarder {
    async fn forward(
        &self,
        target: &Listener,
        path: &str,
        payload: Payload,
    ) -> Result<RemoteReply, ProxyError> {
        let url = Self::target_url(target, path);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(FORWARDED_HEADER, "1")
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Proxy request failed without a response");
                ProxyError::transport()
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| {
            warn!(url = %url, status = %status, error = %e, "Failed to read proxied response body");
            ProxyError::transport()
        })?;

        if !status.is_success() {
            debug!(url = %url, status = %status, "Remote node rejected proxied response");
            return Err(ProxyError::remote(status.as_u16(), body, content_type));
        }

        debug!(url = %url, status = %status, "Proxied response delivered");
        Ok(RemoteReply {
            status: status.as_u16(),
            body,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Protocol;
    use std::time::Duration;

    #[test]
    fn test_target_url() {
        let target = Listener::new("node-2.internal", 8443, Protocol::Https);
        assert_eq!(
            HttpForwarder::target_url(&target, "/rsvps/abc"),
            "https://node-2.internal:8443/rsvps/abc"
        );
    }

    #[tokio::test]
    async fn test_unreachable_target_is_generic_500() {
        // Bind then drop to obtain a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let forwarder = HttpForwarder::new(&ProxyConfig {
            request_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
        })
        .unwrap();
        let target = Listener::new("127.0.0.1", port, Protocol::Http);

        let err = forwarder
            .forward(&target, "/rsvps/abc", Payload::from_static(b"{}"))
            .await
            .unwrap_err();
        assert_eq!(err, ProxyError::transport());
    }
}
