//! Microsoft Graph Notification HTTP Tests

mod helpers;

use std::time::Duration;

use axum::http::{header, StatusCode};
use emit_server::config::Config;
use helpers::{body_to_string, TestApp};

const PATH: &str = "/api/v1/officegraph/notify";

const BATCH: &str = r##"{
    "value": [
        {
            "subscriptionId": "sub-1",
            "subscriptionExpirationDateTime": "2025-03-19T22:11:09.952-08:00",
            "changeType": "created",
            "resource": "Users/abc/Messages/1",
            "resourceData": { "@odata.type": "#Microsoft.Graph.Message", "id": "1" },
            "clientState": "secret",
            "tenantId": "tenant-1"
        },
        {
            "subscriptionId": "sub-2",
            "changeType": "updated",
            "resource": "Users/abc/Messages/2"
        }
    ]
}"##;

#[tokio::test]
async fn validation_token_is_echoed() {
    let app = TestApp::new();
    let response = app
        .oneshot(TestApp::post_json(&format!("{PATH}?validationToken=abc123"), ""))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(body_to_string(response).await, "abc123");
    assert!(app.bus.requests().is_empty());
}

#[tokio::test]
async fn validation_token_is_url_decoded() {
    let app = TestApp::new();
    let response = app
        .oneshot(TestApp::post_json(
            &format!("{PATH}?validationToken=Validation%3A%20Token%2B1"),
            "",
        ))
        .await;

    assert_eq!(body_to_string(response).await, "Validation: Token+1");
}

#[tokio::test]
async fn invalid_body_is_bad_request_with_decode_error() {
    let app = TestApp::new();
    let response = app.oneshot(TestApp::post_json(PATH, "{not json")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_string(response).await;
    assert!(body.contains("key must be a string"), "unexpected body: {body}");
    assert!(app.bus.requests().is_empty());
}

#[tokio::test]
async fn well_formed_batch_is_received() {
    let app = TestApp::new();
    let response = app.oneshot(TestApp::post_json(PATH, BATCH)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response).await, "received");
    assert!(app.bus.requests().is_empty());
}

#[tokio::test]
async fn missing_or_null_value_is_received() {
    for body in ["{}", r#"{"value":null}"#] {
        let app = TestApp::new();
        let response = app.oneshot(TestApp::post_json(PATH, body)).await;

        assert_eq!(response.status(), StatusCode::OK, "body {body}");
        assert_eq!(body_to_string(response).await, "received");
    }
}

#[tokio::test]
async fn empty_validation_token_is_not_a_handshake() {
    let app = TestApp::new();
    let response = app
        .oneshot(TestApp::post_json(
            &format!("{PATH}?validationToken="),
            r#"{"value":[]}"#,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response).await, "received");
}

#[tokio::test]
async fn forwarding_sends_items_in_order() {
    let config = Config {
        graph_forward_notifications: true,
        ..Config::default_for_test()
    };
    let app = TestApp::with_config(config);
    app.backend_replies(r#"{"ok":true}"#, Duration::ZERO);

    let response = app.oneshot(TestApp::post_json(PATH, BATCH)).await;
    assert_eq!(body_to_string(response).await, "received");

    let sent = app.backend_requests();
    assert_eq!(sent.len(), 2);
    for (request, expected) in sent.iter().zip(["sub-1", "sub-2"]) {
        let args = request["args"].as_array().unwrap();
        assert_eq!(args[2], "create_event");
        let item: serde_json::Value = serde_json::from_str(args[4].as_str().unwrap()).unwrap();
        assert_eq!(item["subscriptionId"], expected);

        let record: serde_json::Value =
            serde_json::from_str(request["body"].as_str().unwrap()).unwrap();
        assert_eq!(record["tag"], "officegraph");
    }
}

#[tokio::test]
async fn forwarding_failure_does_not_abort_the_batch() {
    let config = Config {
        graph_forward_notifications: true,
        ..Config::default_for_test()
    };
    let app = TestApp::with_config(config);

    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = std::sync::Arc::clone(&calls);
    app.bus.respond_with(helpers::SUBJECT, Duration::ZERO, move |payload| {
        if seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
            Err("backend rejected".to_string())
        } else {
            Ok(payload)
        }
    });

    let response = app.oneshot(TestApp::post_json(PATH, BATCH)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response).await, "received");
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}
