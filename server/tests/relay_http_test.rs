//! Event Relay HTTP Tests
//!
//! Drives `POST /api/v1/relay/{endpoint}` against the in-memory bus.

mod helpers;

use std::time::{Duration, Instant};

use axum::http::{header, StatusCode};
use emit_server::config::{BridgeConfig, Config};
use helpers::{body_to_string, TestApp};

#[tokio::test]
async fn forwards_and_returns_reply_verbatim() {
    let app = TestApp::new();
    app.backend_replies(r#"{"id": 42}"#, Duration::ZERO);

    let response = app
        .oneshot(TestApp::post_json("/api/v1/relay/sharepoint", r#"{"hello":"world"}"#))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(body_to_string(response).await, r#"{"id": 42}"#);

    let sent = app.backend_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["channel"], "noma2");
    assert_eq!(sent[0]["args"][0], "execute");
    assert_eq!(sent[0]["args"][1], "mix");
    assert_eq!(sent[0]["args"][2], "create_event");
    assert_eq!(sent[0]["args"][4], r#"{"hello":"world"}"#);

    let record: serde_json::Value = serde_json::from_str(sent[0]["body"].as_str().unwrap()).unwrap();
    assert_eq!(record["tag"], "sharepoint");
    assert_eq!(record["source"], "koksmat-emit");
    assert_eq!(record["payload"]["hello"], "world");
}

#[tokio::test]
async fn invalid_json_is_rejected_before_the_bus() {
    let app = TestApp::new();
    app.backend_replies("{}", Duration::ZERO);

    let response = app.oneshot(TestApp::post_json("/api/v1/relay/x", "not json")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.bus.requests().is_empty());
}

#[tokio::test]
async fn slow_backend_is_gateway_timeout_within_deadline() {
    let base = Config::default_for_test();
    let config = Config {
        bridge: BridgeConfig {
            timeout: Duration::from_millis(100),
            ..base.bridge.clone()
        },
        ..base
    };
    let app = TestApp::with_config(config);
    app.backend_replies("{}", Duration::from_secs(5));

    let started = Instant::now();
    let response = app.oneshot(TestApp::post_json("/api/v1/relay/x", "{}")).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn no_responder_is_bad_gateway() {
    let app = TestApp::new();
    let response = app.oneshot(TestApp::post_json("/api/v1/relay/x", "{}")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn lost_connection_is_unavailable_and_flips_health() {
    let app = TestApp::new();
    app.backend_replies("{}", Duration::ZERO);
    app.bus.simulate_disconnect("network down");
    app.bus.simulate_connection_lost();

    let response = app.oneshot(TestApp::post_json("/api/v1/relay/x", "{}")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let health = app.oneshot(TestApp::get("/health")).await;
    assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(!app.health.is_healthy());
}

#[tokio::test]
async fn concurrent_relays_complete_independently() {
    let app = TestApp::new();
    app.backend_replies(r#"{"ok":true}"#, Duration::from_millis(100));

    let requests = (0..10).map(|i| {
        app.oneshot(TestApp::post_json(
            &format!("/api/v1/relay/item-{i}"),
            &format!(r#"{{"n":{i}}}"#),
        ))
    });
    let started = Instant::now();
    let responses = futures::future::join_all(requests).await;

    assert!(responses.iter().all(|r| r.status() == StatusCode::OK));
    assert!(started.elapsed() < Duration::from_millis(900));
    assert_eq!(app.bus.requests().len(), 10);
}
