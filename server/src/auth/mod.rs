//! Authentication
//!
//! Outbound: relay credentials minted for bus calls.
//! Inbound: static bearer token guarding the management endpoints.

mod error;
mod jwt;
mod middleware;

pub use error::{AuthError, AuthResult, ErrorResponse};
pub use jwt::{RelayClaims, TokenError, TokenIssuer, DEFAULT_TOKEN_TTL_HOURS};
pub use middleware::require_bearer;
