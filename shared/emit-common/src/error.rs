//! Common Error Types

use thiserror::Error;

/// Errors raised while building or encoding shared envelopes.
#[derive(Debug, Error)]
pub enum CommonError {
    /// Payload is not syntactically valid JSON.
    #[error("invalid json payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// A required field was empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Bridge request without a verb.
    #[error("bridge request args must not be empty")]
    EmptyArgs,

    /// Encoding to the wire format failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;
