//! Inbound Webhooks
//!
//! Provider endpoints share one shape: parse the raw request into a provider
//! event (or an immediate reply), then respond to it. New providers implement
//! [`WebhookProvider`] and reuse the bridge and token plumbing on `AppState`.

pub mod github;
pub mod graph;
pub mod handlers;
pub mod types;

use std::future::Future;

use axum::{
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::api::AppState;
use crate::auth::require_bearer;
use crate::error::RelayError;

pub use github::GitHubProvider;
pub use graph::GraphProvider;
pub use types::{Inbound, RawWebhook, RegisteredWebhook, WebhookListResponse};

pub const GITHUB_PATH: &str = "/api/v1/github";
pub const GRAPH_PATH: &str = "/api/v1/officegraph/notify";
pub const RELAY_PATH: &str = "/api/v1/relay/{endpoint}";

/// A webhook provider.
pub trait WebhookProvider: Send + Sync {
    /// Parsed provider event.
    type Event: Send;

    /// Provider name; also the tag of forwarded events.
    const NAME: &'static str;

    /// Validate the inbound request.
    fn parse(&self, raw: &RawWebhook) -> Result<Inbound<Self::Event>, RelayError>;

    /// Build the HTTP response for a parsed event.
    fn respond(&self, state: &AppState, event: Self::Event) -> impl Future<Output = Response> + Send;
}

/// Run `provider` against an inbound request.
pub async fn dispatch<P: WebhookProvider>(provider: &P, state: &AppState, raw: RawWebhook) -> Response {
    match provider.parse(&raw) {
        Ok(Inbound::Reply(response)) => response,
        Ok(Inbound::Event(event)) => provider.respond(state, event).await,
        Err(e) => {
            tracing::warn!(provider = P::NAME, error = %e, "Rejected webhook");
            e.into_response()
        }
    }
}

/// Inbound endpoints exposed by this relay.
pub fn registered() -> Vec<RegisteredWebhook> {
    [
        (GitHubProvider::NAME, GITHUB_PATH),
        (GraphProvider::NAME, GRAPH_PATH),
        ("relay", RELAY_PATH),
    ]
    .into_iter()
    .map(|(provider, path)| RegisteredWebhook {
        provider: provider.to_string(),
        path: path.to_string(),
        method: "POST".to_string(),
    })
    .collect()
}

/// Public webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(GITHUB_PATH, post(handlers::github_webhook))
        .route(GRAPH_PATH, post(handlers::graph_notify))
        .route(RELAY_PATH, post(handlers::relay_event))
}

/// Management routes, guarded by the API token.
pub fn management_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/webhooks", get(handlers::list_webhooks))
        .layer(from_fn_with_state(state, require_bearer))
}
