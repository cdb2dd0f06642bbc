//! # Rendezvous Flows
//!
//! Create on one node, wait on a second, respond through either. The
//! responder never needs to know which node holds the waiting connection.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{create_rsvp, sse_data, sse_event_name, two_nodes, TestNode};
    use rsvp_gateway::{InMemoryRsvpStore, RsvpId, RsvpStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const PAYLOAD: &str = r#"{"type":"Invite","object":{"url":"https://acme.example.com/checkout/1"}}"#;

    // =============================================================================
    // DELIVERY
    // =============================================================================

    #[tokio::test]
    async fn test_cross_node_round_trip() {
        let (store, a, b) = two_nodes().await;
        let client = reqwest::Client::new();
        let id = create_rsvp(&client, &a, 300_000).await;

        // Headers arrive once B is registered as the listener
        let listening = client.get(b.url(&format!("/rsvps/{id}"))).send().await.unwrap();
        assert_eq!(listening.status(), 200);
        assert_eq!(
            listening.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        // Respond through A; A proxies to B
        let reply = client
            .post(a.url(&format!("/rsvps/{id}")))
            .header("content-type", "application/json")
            .body(PAYLOAD)
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 200);
        let reply: serde_json::Value = reply.json().await.unwrap();
        assert_eq!(reply, serde_json::json!({ "success": true }));

        let body = timeout(Duration::from_secs(5), listening.text())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sse_data(&body).as_deref(), Some(PAYLOAD));

        // The token is released after delivery
        let gone = store.find_by_id(&RsvpId::from(id.as_str())).await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_same_node_round_trip() {
        let node = TestNode::start(Arc::new(InMemoryRsvpStore::new())).await;
        let client = reqwest::Client::new();
        let id = create_rsvp(&client, &node, 300_000).await;

        let listening = client.get(node.url(&format!("/rsvps/{id}"))).send().await.unwrap();

        let reply = client
            .post(node.url(&format!("/rsvps/{id}")))
            .body(PAYLOAD)
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 200);

        let body = timeout(Duration::from_secs(5), listening.text())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sse_data(&body).as_deref(), Some(PAYLOAD));
    }

    #[tokio::test]
    async fn test_crlf_formatted_payload_is_delivered() {
        let (store, a, b) = two_nodes().await;
        let client = reqwest::Client::new();
        let id = create_rsvp(&client, &a, 300_000).await;

        let listening = client.get(b.url(&format!("/rsvps/{id}"))).send().await.unwrap();
        assert_eq!(listening.status(), 200);

        let reply = client
            .post(a.url(&format!("/rsvps/{id}")))
            .header("content-type", "application/json")
            .body("{\r\n  \"a\": 1\r\n}")
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 200);

        let body = timeout(Duration::from_secs(5), listening.text())
            .await
            .unwrap()
            .unwrap();
        let data = sse_data(&body).expect("listener receives the payload");
        let delivered: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(delivered, serde_json::json!({ "a": 1 }));

        let gone = store.find_by_id(&RsvpId::from(id.as_str())).await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_second_response_is_rejected() {
        let (_store, a, b) = two_nodes().await;
        let client = reqwest::Client::new();
        let id = create_rsvp(&client, &a, 300_000).await;

        let listening = client.get(b.url(&format!("/rsvps/{id}"))).send().await.unwrap();
        let first = client
            .post(b.url(&format!("/rsvps/{id}")))
            .body(PAYLOAD)
            .send()
            .await
            .unwrap();
        assert_eq!(first.status(), 200);
        timeout(Duration::from_secs(5), listening.text())
            .await
            .unwrap()
            .unwrap();

        let second = client
            .post(a.url(&format!("/rsvps/{id}")))
            .body(PAYLOAD)
            .send()
            .await
            .unwrap();
        assert_eq!(second.status(), 404);
    }

    // =============================================================================
    // EXPIRY
    // =============================================================================

    #[tokio::test]
    async fn test_wait_ends_with_expired_event() {
        let (store, a, b) = two_nodes().await;
        let client = reqwest::Client::new();
        let id = create_rsvp(&client, &a, 300).await;

        let listening = client.get(b.url(&format!("/rsvps/{id}"))).send().await.unwrap();
        assert_eq!(listening.status(), 200);

        let body = timeout(Duration::from_secs(5), listening.text())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sse_event_name(&body).as_deref(), Some("expired"));
        let error: serde_json::Value = serde_json::from_str(&sse_data(&body).unwrap()).unwrap();
        assert_eq!(error["name"], "ExpiredError");
        assert_eq!(error["details"]["rsvpId"], id.as_str());

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_listen_after_expiry_is_rejected() {
        let (_store, a, b) = two_nodes().await;
        let client = reqwest::Client::new();
        let id = create_rsvp(&client, &a, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let listening = client.get(b.url(&format!("/rsvps/{id}"))).send().await.unwrap();
        assert_eq!(listening.status(), 400);
        let error: serde_json::Value = listening.json().await.unwrap();
        assert_eq!(error["name"], "ExpiredError");
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (_store, a, _b) = two_nodes().await;
        let client = reqwest::Client::new();

        let reply = client
            .post(a.url("/rsvps/abc-unknown-id"))
            .body(PAYLOAD)
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 404);
        let error: serde_json::Value = reply.json().await.unwrap();
        assert_eq!(error["name"], "NotFoundError");
        assert_eq!(error["details"]["rsvpId"], "abc-unknown-id");

        let listening = client.get(a.url("/rsvps/abc-unknown-id")).send().await.unwrap();
        assert_eq!(listening.status(), 404);
    }

    #[tokio::test]
    async fn test_response_without_listener_is_invalid_state() {
        let (_store, a, b) = two_nodes().await;
        let client = reqwest::Client::new();
        let id = create_rsvp(&client, &a, 300_000).await;

        let reply = client
            .post(b.url(&format!("/rsvps/{id}")))
            .body(PAYLOAD)
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 400);
        let error: serde_json::Value = reply.json().await.unwrap();
        assert_eq!(error["name"], "InvalidStateError");
        assert_eq!(error["message"], "The RSVP listener was not found.");
    }
}
