//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use emit_common::{
    ChangeNotification, ChangeNotificationCollection, GitHubOwner, GitHubRepository,
    GitHubWebhookInput, GitHubWebhookOutput, ResourceData, WebhookStatus,
};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::TokenIssuer,
    bridge::{Bridge, EventForwarder},
    bus::BusClient,
    config::Config,
    observability::{metrics_handler, track_requests, HealthFlag, Metrics},
    webhooks::{self, RegisteredWebhook, WebhookListResponse},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Bus connection shared by every request
    pub bus: Arc<dyn BusClient>,
    /// Forwards events through the bridge
    pub forwarder: EventForwarder,
    pub metrics: Metrics,
    pub health: HealthFlag,
}

impl AppState {
    /// Wire the bridge, token issuer and forwarder over `bus`.
    pub fn new(
        config: Config,
        bus: Arc<dyn BusClient>,
        metrics: Metrics,
        health: HealthFlag,
    ) -> anyhow::Result<Self> {
        let issuer = TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl_hours)?;
        let bridge = Bridge::new(
            Arc::clone(&bus),
            config.bridge.channel.clone(),
            config.bridge.log_bodies,
        );
        let forwarder = EventForwarder::new(bridge, issuer, config.bridge.clone(), metrics.clone());

        Ok(Self {
            config: Arc::new(config),
            bus,
            forwarder,
            metrics,
            health,
        })
    }
}

impl FromRef<AppState> for Metrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Create the main router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/hello", get(hello))
        .route("/verbose", get(verbose))
        .route("/metrics", get(metrics_handler))
        .merge(webhooks::router())
        .merge(webhooks::management_router(state.clone()))
        // API documentation
        .merge(api_docs())
        // Middleware
        .route_layer(from_fn_with_state(state.metrics.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// Health check endpoint.
///
/// Fails once the bus connection has been lost for good.
async fn health_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.health.is_healthy() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "bus unavailable")
    }
}

async fn hello() -> &'static str {
    "Hello, World!"
}

async fn verbose() -> &'static str {
    tracing::debug!("This is a verbose message");
    "This is a verbose message"
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Koksmat Emit API",
        description = "Receives provider webhooks and relays them to the automation bus",
        version = "1.0.0"
    ),
    paths(
        webhooks::handlers::github_webhook,
        webhooks::handlers::graph_notify,
        webhooks::handlers::relay_event,
        webhooks::handlers::list_webhooks,
    ),
    components(schemas(
        GitHubOwner,
        GitHubRepository,
        GitHubWebhookInput,
        GitHubWebhookOutput,
        WebhookStatus,
        ResourceData,
        ChangeNotification,
        ChangeNotificationCollection,
        RegisteredWebhook,
        WebhookListResponse,
    )),
    modifiers(&BearerAuth),
    tags((name = "webhooks", description = "Inbound webhook endpoints")),
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// API documentation routes.
fn api_docs() -> Router<AppState> {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
