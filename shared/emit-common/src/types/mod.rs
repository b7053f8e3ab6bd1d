//! Shared Types

pub mod bridge;
pub mod event;
pub mod github;
pub mod graph;

pub use bridge::BridgeRequest;
pub use event::{EventRecord, EventRecordBuilder};
pub use github::{GitHubOwner, GitHubRepository, GitHubWebhookInput, GitHubWebhookOutput, WebhookStatus};
pub use graph::{ChangeNotification, ChangeNotificationCollection, ResourceData};
