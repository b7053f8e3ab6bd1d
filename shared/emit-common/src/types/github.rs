//! GitHub Webhook Types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Repository owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GitHubOwner {
    #[serde(default)]
    pub login: String,
}

/// Repository the event happened in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GitHubRepository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: GitHubOwner,
}

/// Subset of a GitHub issue / pull request webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GitHubWebhookInput {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub repository: GitHubRepository,
}

/// Outcome of handling a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Success,
    Ignored,
}

/// Response body of the GitHub webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GitHubWebhookOutput {
    pub message: String,
    pub status: WebhookStatus,
}
