//! HTTP response construction
//!
//! Unified mapping from session-manager outcomes to HTTP responses so every
//! handler emits the same `{"error", "error_description"}` JSON shape and the
//! same status codes for the same failure kinds.

use crate::errors::AuthError;
use actix_web::{http::StatusCode, HttpResponse};
use serde_json::json;

/// Map an authentication failure onto its HTTP status code
#[must_use]
pub const fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidCredentials | AuthError::InvalidCode => StatusCode::UNAUTHORIZED,
        AuthError::UnverifiedAccount => StatusCode::FORBIDDEN,
        AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        AuthError::NoSessionFound => StatusCode::NOT_FOUND,
        AuthError::MalformedCallback(_) | AuthError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        AuthError::NetworkOrServiceError(_) => StatusCode::BAD_GATEWAY,
        AuthError::Busy => StatusCode::CONFLICT,
        AuthError::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Build the JSON error response for an authentication failure.
///
/// Rate-limited responses additionally carry `wait_seconds` so the client can
/// render a countdown instead of a generic error.
#[must_use]
pub fn error_response(error: &AuthError) -> HttpResponse {
    let mut body = json!({
        "error": error.kind(),
        "error_description": error.to_string(),
    });
    if let AuthError::RateLimited { wait_seconds } = error {
        body["wait_seconds"] = json!(wait_seconds);
    }

    HttpResponse::build(status_for(error)).json(body)
}

/// Build a `302 Found` redirect to the given location
#[must_use]
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header(("Location", location.to_string()))
        .finish()
}
