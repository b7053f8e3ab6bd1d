//! Webhook API Handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use emit_common::{ChangeNotificationCollection, GitHubWebhookInput, GitHubWebhookOutput};
use tracing::instrument;

use crate::api::AppState;
use crate::error::RelayError;

use super::types::{RawWebhook, WebhookListResponse};
use super::{dispatch, registered, GitHubProvider, GraphProvider};

/// POST /api/v1/github
#[utoipa::path(
    post,
    path = "/api/v1/github",
    tag = "webhooks",
    request_body = GitHubWebhookInput,
    responses(
        (status = 200, description = "Delivery acknowledged", body = GitHubWebhookOutput),
        (status = 400, description = "Body is not valid JSON", body = String),
    ),
)]
#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn github_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    dispatch(&GitHubProvider, &state, RawWebhook::new(HashMap::new(), body)).await
}

/// POST /api/v1/officegraph/notify
#[utoipa::path(
    post,
    path = "/api/v1/officegraph/notify",
    tag = "webhooks",
    params(
        ("validationToken" = Option<String>, Query, description = "Subscription validation token to echo back"),
    ),
    request_body = ChangeNotificationCollection,
    responses(
        (status = 200, description = "Token echoed or notifications received", body = String, content_type = "text/plain"),
        (status = 400, description = "Body could not be decoded", body = String),
    ),
)]
#[instrument(skip(state, query, body), fields(bytes = body.len()))]
pub async fn graph_notify(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    dispatch(&GraphProvider, &state, RawWebhook::new(query, body)).await
}

/// POST /api/v1/relay/{endpoint}
///
/// Wraps the JSON body in an event record tagged `endpoint` and forwards it
/// to the automation backend, returning the backend's reply verbatim.
#[utoipa::path(
    post,
    path = "/api/v1/relay/{endpoint}",
    tag = "webhooks",
    params(
        ("endpoint" = String, Path, description = "Tag stamped on the forwarded event"),
    ),
    request_body(content = String, description = "Any JSON document", content_type = "application/json"),
    responses(
        (status = 200, description = "Backend reply", body = String, content_type = "application/json"),
        (status = 400, description = "Body is not valid JSON", body = String),
        (status = 502, description = "Backend transport failure", body = String),
        (status = 503, description = "Bus connection lost", body = String),
        (status = 504, description = "Backend did not reply in time", body = String),
    ),
)]
#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn relay_event(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let body = std::str::from_utf8(&body).map_err(|e| RelayError::Validation(e.to_string()))?;
    let reply = state.forwarder.forward(&endpoint, body).await?;

    Ok(([(header::CONTENT_TYPE, "application/json")], reply).into_response())
}

/// GET /v1/webhooks
#[utoipa::path(
    get,
    path = "/v1/webhooks",
    tag = "webhooks",
    responses(
        (status = 200, description = "Inbound webhook endpoints", body = WebhookListResponse),
        (status = 401, description = "Missing or invalid API token"),
    ),
    security(("bearer_auth" = [])),
)]
#[instrument]
pub async fn list_webhooks() -> Json<WebhookListResponse> {
    Json(WebhookListResponse {
        webhooks: registered(),
    })
}
