//! GitHub webhooks
//!
//! Issue and pull request deliveries are acknowledged synchronously; nothing
//! is sent to the bus.

use axum::{response::IntoResponse, response::Response, Json};
use emit_common::{GitHubWebhookInput, GitHubWebhookOutput, WebhookStatus};
use tracing::info;

use crate::api::AppState;
use crate::error::RelayError;

use super::types::{Inbound, RawWebhook};
use super::WebhookProvider;

/// GitHub issue / pull request webhook.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubProvider;

/// Map a delivery to its acknowledgement.
pub fn classify(input: &GitHubWebhookInput) -> GitHubWebhookOutput {
    let repo = &input.repository.name;
    match input.action.as_str() {
        "created" | "opened" => GitHubWebhookOutput {
            message: format!("A new issue or PR was opened in {repo}"),
            status: WebhookStatus::Success,
        },
        "closed" => GitHubWebhookOutput {
            message: format!("An issue or PR was closed in {repo}"),
            status: WebhookStatus::Success,
        },
        other => GitHubWebhookOutput {
            message: format!("Action not handled: {other}"),
            status: WebhookStatus::Ignored,
        },
    }
}

impl WebhookProvider for GitHubProvider {
    type Event = GitHubWebhookInput;

    const NAME: &'static str = "github";

    fn parse(&self, raw: &RawWebhook) -> Result<Inbound<Self::Event>, RelayError> {
        serde_json::from_slice(&raw.body)
            .map(Inbound::Event)
            .map_err(|e| RelayError::Validation(e.to_string()))
    }

    async fn respond(&self, _state: &AppState, event: Self::Event) -> Response {
        let output = classify(&event);
        info!(
            action = %event.action,
            repository = %event.repository.name,
            owner = %event.repository.owner.login,
            status = ?output.status,
            "GitHub webhook handled"
        );
        Json(output).into_response()
    }
}
