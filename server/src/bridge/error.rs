//! Bridge Error Types

use std::time::Duration;

use emit_common::CommonError;
use thiserror::Error;

use crate::bus::BusError;

/// Failure of a bridged request/reply exchange.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// Envelope could not be encoded.
    #[error("failed to encode bridge request: {0}")]
    Serialization(String),

    /// Caller supplied an unusable request (empty args, zero timeout).
    #[error("invalid bridge request: {0}")]
    InvalidRequest(String),

    /// No reply within the deadline.
    #[error("request to '{subject}' timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },

    /// Bus is unusable (reconnects exhausted or closed).
    #[error("bus connection lost")]
    ConnectionLost,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Reply payload was not UTF-8 text.
    #[error("reply is not valid UTF-8")]
    InvalidReply,
}

impl From<BusError> for BridgeError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Timeout { subject, timeout } => Self::Timeout { subject, timeout },
            BusError::ConnectionLost | BusError::NotConnected => Self::ConnectionLost,
            BusError::ConnectionFailed { .. } | BusError::Transport(_) => {
                Self::Transport(err.to_string())
            }
        }
    }
}

impl From<CommonError> for BridgeError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::EmptyArgs | CommonError::MissingField(_) => {
                Self::InvalidRequest(err.to_string())
            }
            CommonError::InvalidPayload(_) | CommonError::Serialization(_) => {
                Self::Serialization(err.to_string())
            }
        }
    }
}

impl BridgeError {
    /// Outcome label recorded in `bridge_requests_total`.
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Serialization(_) | Self::InvalidRequest(_) => "invalid",
            Self::Timeout { .. } => "timeout",
            Self::ConnectionLost => "unavailable",
            Self::Transport(_) | Self::InvalidReply => "error",
        }
    }
}
