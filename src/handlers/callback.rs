//! OAuth flow handlers
//!
//! `oauth_sign_in` starts a flow by redirecting to the provider's
//! authorization URL. `oauth_callback` is the fixed `/auth/callback`
//! endpoint: providers redirect the browser here with query parameters, and
//! the SPA forwards fragment-carrying URLs (which never reach a server on
//! their own) as a JSON POST to the same path.

use crate::errors::AuthError;
use crate::identity::Provider;
use crate::session::SessionManager;
use crate::settings::GradpassSettings;
use crate::utils::responses::{error_response, redirect};
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct OAuthSignInQuery {
    pub provider: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackBody {
    /// Full callback URL as seen by the browser, fragment included
    pub url: String,
}

/// Start an OAuth flow: 302 to the provider's authorization URL.
///
/// # Errors
/// Never fails; failures are rendered as JSON error responses.
pub async fn oauth_sign_in(
    query: web::Query<OAuthSignInQuery>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    let Some(name) = &query.provider else {
        return Ok(error_response(&AuthError::InvalidRequest(
            "provider query parameter is required".to_string(),
        )));
    };

    let provider: Provider = match name.parse() {
        Ok(provider) => provider,
        Err(err) => return Ok(error_response(&err)),
    };

    match manager.sign_in_with_oauth(provider) {
        Ok(url) => {
            info!("Starting {provider} OAuth flow");
            Ok(redirect(&url))
        }
        Err(err) => Ok(error_response(&err)),
    }
}

/// Provider redirect target: reconcile the query-borne callback and bounce
/// the browser back to a safe default view either way.
///
/// # Errors
/// Never fails; failures become an `auth_error` redirect.
pub async fn oauth_callback_get(
    req: HttpRequest,
    manager: web::Data<SessionManager>,
    settings: web::Data<GradpassSettings>,
) -> Result<HttpResponse> {
    let raw_url = format!(
        "{}{}",
        settings.application.redirect_base_url.trim_end_matches('/'),
        req.uri()
    );

    match manager.handle_oauth_callback(&raw_url).await {
        Ok(session) => {
            info!("OAuth callback established session for {}", session.user.id);
            Ok(redirect("/?auth=success"))
        }
        Err(err) => {
            warn!("OAuth callback failed: {err}");
            Ok(redirect(&format!("/?auth_error={}", err.kind())))
        }
    }
}

/// SPA-forwarded callback: the full URL (fragment included) arrives as JSON
/// and the outcome is answered in kind.
///
/// # Errors
/// Never fails; failures are rendered as JSON error responses.
pub async fn oauth_callback_post(
    body: web::Json<CallbackBody>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    match manager.handle_oauth_callback(&body.url).await {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "status": "signed_in",
            "session": session,
        }))),
        Err(err) => {
            warn!("OAuth callback failed: {err}");
            Ok(error_response(&err))
        }
    }
}
