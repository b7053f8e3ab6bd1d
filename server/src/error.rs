//! HTTP-facing Relay Errors

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::TokenError;
use crate::bridge::BridgeError;

/// Errors a webhook handler can return to its caller.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed inbound payload.
    #[error("{0}")]
    Validation(String),

    /// The bus did not reply in time.
    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),

    /// The bus connection is unusable.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The relay credential could not be minted.
    #[error("failed to sign relay credential: {0}")]
    Signing(String),

    /// Any other upstream failure.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl RelayError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<BridgeError> for RelayError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Timeout { .. } => Self::UpstreamTimeout(err.to_string()),
            BridgeError::ConnectionLost => Self::UpstreamUnavailable(err.to_string()),
            BridgeError::Serialization(_)
            | BridgeError::InvalidRequest(_)
            | BridgeError::Transport(_)
            | BridgeError::InvalidReply => Self::Upstream(err.to_string()),
        }
    }
}

impl From<TokenError> for RelayError {
    fn from(err: TokenError) -> Self {
        Self::Signing(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Rejected request");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
