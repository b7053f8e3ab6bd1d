//! Prometheus metrics registry and exposition.
//!
//! Each [`Metrics`] owns its own registry so independent app instances (and
//! tests) never share counters.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::bus::ConnectionState;

/// Content type of the Prometheus text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Relay metrics.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    bridge_requests_total: IntCounterVec,
    bus_events_total: IntCounterVec,
    bus_connection_state: IntGauge,
}

impl Metrics {
    /// Create and register all instruments, labelled with `service`.
    pub fn new(service: &str) -> Result<Self, prometheus::Error> {
        let labels = HashMap::from([("service".to_string(), service.to_string())]);
        let registry = Registry::new_custom(None, Some(labels))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["path"],
        )?;
        let bridge_requests_total = IntCounterVec::new(
            Opts::new("bridge_requests_total", "Bridged bus requests by outcome"),
            &["outcome"],
        )?;
        let bus_events_total = IntCounterVec::new(
            Opts::new("bus_events_total", "Bus connection lifecycle events"),
            &["event"],
        )?;
        let bus_connection_state = IntGauge::new(
            "bus_connection_state",
            "Bus connection state (0=disconnected 1=connecting 2=connected 3=reconnecting 4=closed)",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(bridge_requests_total.clone()))?;
        registry.register(Box::new(bus_events_total.clone()))?;
        registry.register(Box::new(bus_connection_state.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                bridge_requests_total,
                bus_events_total,
                bus_connection_state,
            }),
        })
    }

    pub fn record_http_request(&self, path: &str) {
        self.inner.http_requests_total.with_label_values(&[path]).inc();
    }

    pub fn record_bridge_outcome(&self, outcome: &str) {
        self.inner.bridge_requests_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_bus_event(&self, event: &str) {
        self.inner.bus_events_total.with_label_values(&[event]).inc();
    }

    pub fn set_bus_state(&self, state: ConnectionState) {
        self.inner.bus_connection_state.set(state.code());
    }

    /// Render every registered metric in text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// `GET /metrics`
pub async fn metrics_handler(State(metrics): State<Metrics>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Router serving only `/metrics`, for the dedicated metrics listener.
pub fn metrics_router<S>(metrics: Metrics) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}
