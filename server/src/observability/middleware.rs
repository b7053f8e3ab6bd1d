//! Request counting middleware.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use super::metrics::Metrics;

/// Count every request in `http_requests_total{path}` and log it.
///
/// Uses the route template when one matched so path parameters do not blow up
/// label cardinality.
pub async fn track_requests(State(metrics): State<Metrics>, request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str)
        .to_owned();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    tracing::info!(
        method = %request.method(),
        path = %request.uri().path(),
        remote_addr = remote_addr.as_deref().unwrap_or("-"),
        "Handling request"
    );
    metrics.record_http_request(&path);

    next.run(request).await
}
