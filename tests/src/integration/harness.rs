//! Test node harness.

use rsvp_gateway::domain::config::RsvpConfig;
use rsvp_gateway::{bind, InMemoryRsvpStore, Protocol, RendezvousService, SystemTimeSource};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running node; shut down on drop
pub struct TestNode {
    pub addr: SocketAddr,
    pub service: Arc<RendezvousService>,
    shutdown: Option<oneshot::Sender<()>>,
    _handle: JoinHandle<()>,
}

impl TestNode {
    /// Start a node on 127.0.0.1 that identifies itself as `http://127.0.0.1:<port>`
    pub async fn start(store: Arc<InMemoryRsvpStore>) -> Self {
        let mut config = RsvpConfig::default();
        config.http.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.http.port = 0;
        config.identity.protocol = Protocol::Http;
        config.identity.public_hostname = Some("127.0.0.1".to_string());

        let server = bind(config, store, Arc::new(SystemTimeSource))
            .await
            .expect("node should bind");
        let addr = server.local_addr();
        let service = server.service();

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = server
                .run(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            service,
            shutdown: Some(shutdown),
            _handle: handle,
        }
    }

    /// Absolute URL for `path` on this node
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// A shared store and two nodes using it
pub async fn two_nodes() -> (Arc<InMemoryRsvpStore>, TestNode, TestNode) {
    let store = Arc::new(InMemoryRsvpStore::new());
    let a = TestNode::start(store.clone()).await;
    let b = TestNode::start(store.clone()).await;
    (store, a, b)
}

/// Create an RSVP through `node`, returning its id
pub async fn create_rsvp(client: &reqwest::Client, node: &TestNode, ttl: u64) -> String {
    let created: serde_json::Value = client
        .post(node.url("/rsvps"))
        .json(&serde_json::json!({ "ttl": ttl, "type": "someType" }))
        .send()
        .await
        .expect("create request")
        .json()
        .await
        .expect("create body");
    created["id"].as_str().expect("id").to_string()
}

/// Joined `data:` lines of the first event in an SSE body
pub fn sse_data(body: &str) -> Option<String> {
    let event = first_event(body)?;
    let data: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|d| d.strip_prefix(' ').unwrap_or(d))
        .collect();
    (!data.is_empty()).then(|| data.join("\n"))
}

/// `event:` name of the first event in an SSE body
pub fn sse_event_name(body: &str) -> Option<String> {
    first_event(body)?
        .lines()
        .find_map(|line| line.strip_prefix("event:"))
        .map(|name| name.trim().to_string())
}

/// First block of an SSE body that is not only comments (keep-alives)
fn first_event(body: &str) -> Option<&str> {
    body.split("\n\n")
        .find(|block| block.lines().any(|line| !line.is_empty() && !line.starts_with(':')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_parsing() {
        let body = ": keep-alive\n\nevent: expired\ndata: {\"name\":\"ExpiredError\"}\n\n";
        assert_eq!(sse_event_name(body).as_deref(), Some("expired"));
        assert_eq!(sse_data(body).as_deref(), Some("{\"name\":\"ExpiredError\"}"));

        let body = "data: {\"a\":1}\n\n";
        assert_eq!(sse_event_name(body), None);
        assert_eq!(sse_data(body).as_deref(), Some("{\"a\":1}"));
    }
}
