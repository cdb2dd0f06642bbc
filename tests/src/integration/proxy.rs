//! # Proxy Failure Flows
//!
//! The owning node's reply is relayed verbatim, and a node that cannot be
//! reached surfaces as the generic internal error.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{create_rsvp, TestNode};
    use axum::{http::StatusCode, routing::post, Router};
    use rsvp_gateway::{InMemoryRsvpStore, Listener, Protocol, RsvpId};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    const REMOTE_ERROR: &str = r#"{"name":"InvalidStateError","message":"Invalid state error."}"#;

    /// A stand-in remote node that rejects every response
    async fn rejecting_remote() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = Router::new().route(
            "/rsvps/:id",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    [("content-type", "application/json")],
                    REMOTE_ERROR,
                )
            }),
        );
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        port
    }

    /// A port nothing is listening on
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn node_with_remote_listener(port: u16) -> (TestNode, String) {
        let node = TestNode::start(Arc::new(InMemoryRsvpStore::new())).await;
        let client = reqwest::Client::new();
        let id = create_rsvp(&client, &node, 300_000).await;
        node.service
            .register_listener(
                &RsvpId::from(id.as_str()),
                Listener::new("127.0.0.1", port, Protocol::Http),
            )
            .await
            .unwrap();
        (node, id)
    }

    #[tokio::test]
    async fn test_remote_rejection_is_relayed_verbatim() {
        let port = rejecting_remote().await;
        let (node, id) = node_with_remote_listener(port).await;

        let reply = reqwest::Client::new()
            .post(node.url(&format!("/rsvps/{id}")))
            .body(r#"{"a":1}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 400);
        assert_eq!(reply.text().await.unwrap(), REMOTE_ERROR);
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_unknown_error() {
        let port = closed_port().await;
        let (node, id) = node_with_remote_listener(port).await;

        let reply = reqwest::Client::new()
            .post(node.url(&format!("/rsvps/{id}")))
            .body(r#"{"a":1}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 500);
        let error: serde_json::Value = reply.json().await.unwrap();
        assert_eq!(
            error,
            serde_json::json!({
                "name": "UnknownError",
                "message": "An unknown error occurred."
            })
        );
    }

    #[tokio::test]
    async fn test_forwarded_request_is_not_proxied_again() {
        let port = rejecting_remote().await;
        let (node, id) = node_with_remote_listener(port).await;

        let reply = reqwest::Client::new()
            .post(node.url(&format!("/rsvps/{id}")))
            .header("x-rsvp-forwarded", "1")
            .body(r#"{"a":1}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 500);
        let error: serde_json::Value = reply.json().await.unwrap();
        assert_eq!(error["name"], "UnknownError");
    }
}
