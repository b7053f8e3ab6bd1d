//! Webhook Types

use std::collections::HashMap;

use axum::response::Response;
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;

/// Inbound webhook as received over HTTP.
#[derive(Debug, Clone, Default)]
pub struct RawWebhook {
    /// Decoded query parameters
    pub query: HashMap<String, String>,
    /// Request body, untouched
    pub body: Bytes,
}

impl RawWebhook {
    pub const fn new(query: HashMap<String, String>, body: Bytes) -> Self {
        Self { query, body }
    }
}

/// Result of parsing an inbound webhook.
pub enum Inbound<E> {
    /// Answer immediately without further processing (e.g. a handshake).
    Reply(Response),
    /// A provider event to respond to.
    Event(E),
}

/// An inbound webhook endpoint exposed by this relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RegisteredWebhook {
    pub provider: String,
    pub path: String,
    pub method: String,
}

/// Response of `GET /v1/webhooks`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookListResponse {
    pub webhooks: Vec<RegisteredWebhook>,
}
