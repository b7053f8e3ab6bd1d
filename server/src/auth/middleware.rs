//! Authentication Middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::AppState;

use super::error::{AuthError, AuthResult};

/// Middleware requiring the configured static API token.
///
/// Expects `Authorization: Bearer <WEBHOOKS_API_TOKEN>`. When no token is
/// configured every request is rejected.
///
/// ```ignore
/// Router::new()
///     .route("/v1/webhooks", get(handler))
///     .layer(axum::middleware::from_fn_with_state(state, require_bearer))
/// ```
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> AuthResult<Response> {
    let expected = state
        .config
        .webhooks_api_token
        .as_deref()
        .ok_or(AuthError::NotConfigured)?;

    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?;

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        tracing::warn!("Rejected request with invalid API token");
        return Err(AuthError::InvalidToken);
    }

    Ok(next.run(request).await)
}

/// Compare two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
