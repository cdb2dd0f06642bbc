//! Request tracing.
//!
//! Opens an `rsvp_request` span per request and records the response status
//! on it. Requests proxied from another node are tagged so a delivery can be
//! followed across hops.

use crate::adapters::http_forwarder::FORWARDED_HEADER;
use axum::http::{Request, Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{info_span, Instrument, Span};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TracingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();

        let span = info_span!(
            "rsvp_request",
            http.method = %req.method(),
            http.target = %req.uri().path(),
            rsvp.forwarded = is_forwarded(&req),
            http.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        );

        if let Some(parent) = parent_trace(&req) {
            span.follows_from(parent);
        }

        Box::pin(
            async move {
                let result = inner.call(req).await;

                let span = Span::current();
                match &result {
                    Ok(response) => {
                        let status = response.status();
                        span.record("http.status_code", status.as_u16());
                        span.record(
                            "otel.status_code",
                            if status.is_server_error() { "ERROR" } else { "OK" },
                        );
                    }
                    Err(_) => {
                        span.record("otel.status_code", "ERROR");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

fn is_forwarded<B>(req: &Request<B>) -> bool {
    req.headers().contains_key(FORWARDED_HEADER)
}

/// Span for a W3C `traceparent` header, if one is present and well formed
fn parent_trace<B>(req: &Request<B>) -> Option<Span> {
    let traceparent = req.headers().get("traceparent")?.to_str().ok()?;

    let mut parts = traceparent.split('-');
    let (_version, trace_id, parent_id, _flags) =
        (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    Some(info_span!(
        "parent_trace",
        trace_id = trace_id,
        parent_span_id = parent_id
    ))
}
