//! HTTP surface of a rendezvous node.
//!
//! Binding happens before anything else so the node identity can fall back
//! to the port actually bound. The routes are thin: every decision lives in
//! [`RendezvousService`].

use crate::adapters::http_forwarder::{ForwarderError, HttpForwarder, FORWARDED_HEADER};
use crate::domain::config::{ConfigError, RsvpConfig};
use crate::domain::error::{ProxyError, RsvpError};
use crate::domain::identity::NodeIdentity;
use crate::domain::record::RsvpId;
use crate::domain::ttl::ExpiredError;
use crate::middleware::TracingLayer;
use crate::ports::outbound::{RsvpStore, TimeSource};
use crate::service::{sweep_task, CreateRequest, Delivery, RendezvousService, WaitOutcome};
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

/// Server startup errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error(transparent)]
    Forwarder(#[from] ForwarderError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handler state
#[derive(Clone)]
struct AppState {
    service: Arc<RendezvousService>,
    shutdown: watch::Receiver<bool>,
}

/// A node whose listener is bound but not yet serving
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    service: Arc<RendezvousService>,
    store: Arc<dyn RsvpStore>,
    clock: Arc<dyn TimeSource>,
    sweep_interval: Duration,
    router: Router,
    shutdown_tx: watch::Sender<bool>,
}

/// Validate `config`, bind the HTTP listener and assemble the node.
pub async fn bind(
    config: RsvpConfig,
    store: Arc<dyn RsvpStore>,
    clock: Arc<dyn TimeSource>,
) -> Result<BoundServer, ServerError> {
    config.validate()?;

    let addr = config.http_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;

    let identity = NodeIdentity::resolve(&config.identity, local_addr.port());
    let forwarder = Arc::new(HttpForwarder::new(&config.proxy)?);
    let service = Arc::new(RendezvousService::new(
        store.clone(),
        forwarder,
        clock.clone(),
        identity,
        config.ttl.clone(),
        config.http.base_path.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let router = build_router(
        AppState {
            service: service.clone(),
            shutdown: shutdown_rx,
        },
        &config,
    );

    Ok(BoundServer {
        listener,
        local_addr,
        service,
        store,
        clock,
        sweep_interval: config.storage.sweep_interval,
        router,
        shutdown_tx,
    })
}

impl BoundServer {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn service(&self) -> Arc<RendezvousService> {
        Arc::clone(&self.service)
    }

    /// Serve until `shutdown` resolves.
    ///
    /// On shutdown every open wait ends as disconnected, which releases its
    /// token, and in-flight requests are drained.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let BoundServer {
            listener,
            local_addr,
            service,
            store,
            clock,
            sweep_interval,
            router,
            shutdown_tx,
        } = self;

        let sweeper = tokio::spawn(sweep_task(store, clock, sweep_interval));

        info!(
            addr = %local_addr,
            identity = %service.identity().origin(),
            "RSVP node listening"
        );

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutdown requested, closing open waits");
                let _ = shutdown_tx.send(true);
            })
            .await;

        sweeper.abort();
        info!("RSVP node stopped");
        result.map_err(ServerError::from)
    }
}

fn build_router(state: AppState, config: &RsvpConfig) -> Router {
    let base = config.http.base_path.as_str();

    let middleware = ServiceBuilder::new()
        .layer(TracingLayer::new())
        .layer(RequestBodyLimitLayer::new(config.limits.max_request_size));

    Router::new()
        .route(base, post(create))
        .route(&format!("{base}/:id"), get(listen).post(submit))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(middleware)
        .with_state(state)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST {base}`: create a token
async fn create(State(state): State<AppState>, body: Bytes) -> Result<Response, RsvpError> {
    let request = if body.is_empty() {
        CreateRequest::default()
    } else {
        serde_json::from_slice::<CreateRequest>(&body)
            .map_err(|e| RsvpError::InvalidData(format!("invalid create request: {e}")))?
    };

    let record = state.service.create(request).await?;
    let url = state.service.rsvp_url(&record.id);

    Ok(Json(json!({
        "id": record.id,
        "createdAt": record.created_at,
        "ttl": record.ttl,
        "url": url,
    }))
    .into_response())
}

/// `GET {base}/{id}`: register this node and stream the single outcome
async fn listen(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<ReceiverStream<Result<Event, Infallible>>>, RsvpError> {
    let id = RsvpId::from(id);
    let wait = state.service.open_wait(&id).await?;

    let (tx, rx) = mpsc::channel(1);
    let service = Arc::clone(&state.service);
    let mut shutdown = state.shutdown;

    tokio::spawn(async move {
        let disconnected = async {
            tokio::select! {
                _ = tx.closed() => {}
                sender_gone = async { shutdown.wait_for(|stop| *stop).await.is_err() } => {
                    // No shutdown will ever come; only the client can end the wait
                    if sender_gone {
                        tx.closed().await;
                    }
                }
            }
        };

        let outcome = service.await_outcome(wait, disconnected).await;
        if let Some(event) = outcome_event(&id, outcome) {
            let _ = tx.send(Ok(event)).await;
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

/// `POST {base}/{id}`: submit the response for a token
async fn submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RsvpError> {
    let id = RsvpId::from(id);

    serde_json::from_slice::<serde::de::IgnoredAny>(&body)
        .map_err(|e| RsvpError::InvalidData(format!("response body must be JSON: {e}")))?;
    let forwarded = headers.contains_key(FORWARDED_HEADER);

    match state.service.route_response(&id, body, forwarded).await? {
        Delivery::Local => Ok(Json(json!({ "success": true })).into_response()),
        Delivery::Remote(reply) => Ok(passthrough(reply.status, reply.content_type, reply.body)),
    }
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let hub = state.service.notifications();
    let stats = hub.stats();

    Json(json!({
        "status": "ok",
        "waiting": hub.waiting_count(),
        "stats": {
            "subscribed": stats.total_subscribed.load(Ordering::Relaxed),
            "delivered": stats.total_delivered.load(Ordering::Relaxed),
            "dropped": stats.total_dropped.load(Ordering::Relaxed),
            "superseded": stats.total_superseded.load(Ordering::Relaxed),
        }
    }))
}

/// SSE event for a terminal wait outcome; `None` when nobody is listening
fn outcome_event(id: &RsvpId, outcome: WaitOutcome) -> Option<Event> {
    match outcome {
        WaitOutcome::Delivered(payload) => Some(Event::default().data(event_data(&payload))),
        WaitOutcome::Expired => {
            let body = RsvpError::from(ExpiredError { id: id.clone() }).to_api_error();
            Some(
                Event::default()
                    .event("expired")
                    .data(event_data(&body.to_json_bytes())),
            )
        }
        WaitOutcome::Superseded => Some(
            Event::default()
                .event("superseded")
                .data(json!({ "rsvpId": id }).to_string()),
        ),
        WaitOutcome::Disconnected => None,
    }
}

/// SSE data field text for a JSON body.
///
/// SSE splits data on `\n` and cannot carry `\r`, so CRLF and lone CR line
/// endings (legal JSON whitespace) become `\n`. The client rejoins the data
/// lines with `\n`.
fn event_data(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

fn passthrough(status: u16, content_type: Option<String>, body: Bytes) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, body).into_response();
    if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        passthrough(self.status, self.content_type, self.body)
    }
}

impl IntoResponse for RsvpError {
    fn into_response(self) -> Response {
        match self {
            RsvpError::Proxy(e) => e.into_response(),
            other => {
                if let RsvpError::Store(e) = &other {
                    error!(error = %e, "Storage fault while handling request");
                }
                let status = StatusCode::from_u16(other.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(other.to_api_error())).into_response()
            }
        }
    }
}
