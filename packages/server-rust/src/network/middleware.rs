//! Tower layers wrapped around every route.
//!
//! Outermost first: request id assignment, a tracing span tagged with that
//! id, the body size limit, the request timeout, and finally copying the id
//! onto the response. The limit sits outside the timeout because the
//! timeout layer has to build an empty body of the inner response type.

use axum::body::Body;
use axum::http::header::HeaderName;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::config::NetworkConfig;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Wraps `router` in the transport middleware configured by `config`.
#[must_use]
pub fn with_http_layers(router: Router, config: &NetworkConfig) -> Router {
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout(),
            ))
            .layer(PropagateRequestIdLayer::new(request_id)),
    )
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http",
        method = %request.method(),
        path = request.uri().path(),
        request_id
    )
}
