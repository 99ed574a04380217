// Credential flow handlers: sign-up, sign-in, phone OTP, sign-out, reset
use crate::models::SignUpOutcome;
use crate::session::SessionManager;
use crate::utils::responses::error_response;
use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PhoneRequest {
    pub phone: String,
}

#[derive(Deserialize)]
pub struct PhoneVerifyRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

/// Create a new email/password account.
///
/// # Errors
/// Never fails; failures are rendered as JSON error responses.
pub async fn sign_up(
    body: web::Json<SignUpRequest>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    match manager
        .sign_up(&body.email, &body.password, &body.display_name)
        .await
    {
        Ok(SignUpOutcome::Session(session)) => Ok(HttpResponse::Ok().json(json!({
            "status": "signed_in",
            "session": session,
        }))),
        Ok(SignUpOutcome::Pending(pending)) => Ok(HttpResponse::Accepted().json(json!({
            "status": "pending",
            "pending": pending,
        }))),
        Err(err) => Ok(error_response(&err)),
    }
}

/// Sign in with an email/password pair.
///
/// # Errors
/// Never fails; failures are rendered as JSON error responses.
pub async fn sign_in(
    body: web::Json<SignInRequest>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    match manager.sign_in(&body.email, &body.password).await {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "status": "signed_in",
            "session": session,
        }))),
        Err(err) => Ok(error_response(&err)),
    }
}

/// Dispatch a one-time code to a phone number.
///
/// # Errors
/// Never fails; failures are rendered as JSON error responses.
pub async fn phone_send(
    body: web::Json<PhoneRequest>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    match manager.sign_in_with_phone(&body.phone).await {
        Ok(pending) => Ok(HttpResponse::Accepted().json(json!({
            "status": "pending",
            "pending": pending,
        }))),
        Err(err) => Ok(error_response(&err)),
    }
}

/// Verify a delivered one-time code and establish a session.
///
/// # Errors
/// Never fails; failures are rendered as JSON error responses.
pub async fn phone_verify(
    body: web::Json<PhoneVerifyRequest>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    match manager.verify_phone_otp(&body.phone, &body.code).await {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "status": "signed_in",
            "session": session,
        }))),
        Err(err) => Ok(error_response(&err)),
    }
}

/// Clear the session; local state is cleared before the remote service hears.
///
/// # Errors
/// Never fails; failures are rendered as JSON error responses.
pub async fn sign_out(manager: web::Data<SessionManager>) -> Result<HttpResponse> {
    match manager.sign_out().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "status": "signed_out" }))),
        Err(err) => Ok(error_response(&err)),
    }
}

/// Dispatch a password-reset email (rate limited locally).
///
/// # Errors
/// Never fails; failures are rendered as JSON error responses.
pub async fn reset_password(
    body: web::Json<ResetPasswordRequest>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    match manager.reset_password(&body.email).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "status": "reset_sent" }))),
        Err(err) => Ok(error_response(&err)),
    }
}

/// Report the current session, 401 when signed out.
///
/// # Errors
/// Never fails; a missing session is answered with a 401 body.
pub async fn session_info(manager: web::Data<SessionManager>) -> Result<HttpResponse> {
    match manager.current_session().await {
        Some(session) => Ok(HttpResponse::Ok().json(json!({
            "status": "signed_in",
            "session": session,
        }))),
        None => Ok(HttpResponse::Unauthorized().json(json!({
            "error": "no_session",
            "error_description": "No user is signed in",
        }))),
    }
}
