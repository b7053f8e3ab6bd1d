//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router, backed by an in-memory bus so no NATS server is needed.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use bytes::Bytes;
use emit_server::api::{create_router, AppState};
use emit_server::bus::{BusClient, BusObserver, MemoryBus};
use emit_server::config::Config;
use emit_server::observability::{BusEventLogger, HealthFlag, Metrics};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Subject the backend listens on in tests.
pub const SUBJECT: &str = "magic-mix.app";

/// API token configured for the management endpoints.
pub const API_TOKEN: &str = "test-api-token";

pub struct TestApp {
    pub router: Router,
    pub bus: Arc<MemoryBus>,
    pub metrics: Metrics,
    pub health: HealthFlag,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a test app with the default test config.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test())
    }

    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        let metrics = Metrics::new(&config.service_name).expect("Failed to create metrics");
        let health = HealthFlag::default();
        let observer: Arc<dyn BusObserver> =
            Arc::new(BusEventLogger::new(metrics.clone(), health.clone()));
        let bus = Arc::new(MemoryBus::new(vec![observer]));

        let state = AppState::new(
            config.clone(),
            Arc::clone(&bus) as Arc<dyn BusClient>,
            metrics.clone(),
            health.clone(),
        )
        .expect("Failed to build app state");
        let router = create_router(state);

        Self {
            router,
            bus,
            metrics,
            health,
            config: Arc::new(config),
        }
    }

    /// Make the backend echo a fixed reply after `delay`.
    pub fn backend_replies(&self, reply: &'static str, delay: Duration) {
        self.bus
            .respond_with(SUBJECT, delay, move |_| Ok(Bytes::from_static(reply.as_bytes())));
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// POST `body` as JSON.
    pub fn post_json(uri: &str, body: &str) -> Request<Body> {
        Self::request(Method::POST, uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .expect("Failed to build request")
    }

    /// Empty GET request.
    pub fn get(uri: &str) -> Request<Body> {
        Self::request(Method::GET, uri)
            .body(Body::empty())
            .expect("Failed to build request")
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Decoded JSON bodies of every request the backend received.
    pub fn backend_requests(&self) -> Vec<serde_json::Value> {
        self.bus
            .requests()
            .into_iter()
            .map(|(_, payload)| serde_json::from_slice(&payload).expect("request is JSON"))
            .collect()
    }
}

/// Collect a response body as text.
pub async fn body_to_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}

/// Collect a response body as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}
