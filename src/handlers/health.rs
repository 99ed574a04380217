// Health check endpoint
use actix_web::{HttpResponse, Result};
use serde_json::json;

/// Liveness probe.
///
/// # Errors
/// Never fails.
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": crate::VERSION,
    })))
}
