//! `GoTrue`-style identity service client
//!
//! HTTP client for the hosted identity API: `/token`, `/signup`, `/otp`,
//! `/verify`, `/authorize`, `/logout`, `/recover`, `/user`. The client keeps
//! the most recently established remote session so `current_session` can
//! answer the callback handler's authoritative check without re-parsing URLs.
//!
//! All remote error payloads (`{"error", "error_description"}` or `{"msg"}`)
//! are classified into `AuthError` here; callers never see raw shapes.

use crate::errors::AuthError;
use crate::identity::{IdentityService, Provider};
use crate::models::{PendingAuth, Session, SignUpOutcome, User};
use crate::settings::ProviderSettings;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, warn};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use url::Url;

/// Default access-token lifetime when the service omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Per-provider authorization options taken from settings
#[derive(Debug, Clone, Default)]
struct ProviderOptions {
    scopes: Option<String>,
    extra_auth_params: Vec<(String, String)>,
}

/// Client for a `GoTrue`-style hosted identity service
pub struct GoTrueClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
    providers: HashMap<Provider, ProviderOptions>,
    // Most recent remote session; the manager owns the authoritative copy
    session: RwLock<Option<Session>>,
}

impl GoTrueClient {
    /// Create a client for the identity service at `base_url`.
    ///
    /// `base_url` is the project URL; the auth API lives under `/auth/v1`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRequest` if `base_url` cannot be parsed or
    /// a configured provider name is unknown.
    pub fn new(
        base_url: &str,
        api_key: &str,
        provider_settings: &[ProviderSettings],
    ) -> Result<Self, AuthError> {
        let base = base_url.trim_end_matches('/');
        let base_url = Url::parse(&format!("{base}/auth/v1/"))
            .map_err(|e| AuthError::InvalidRequest(format!("invalid identity URL: {e}")))?;

        let mut providers = HashMap::new();
        for settings in provider_settings {
            if !settings.enabled {
                continue;
            }
            let provider: Provider = settings.name.parse()?;
            providers.insert(
                provider,
                ProviderOptions {
                    scopes: if settings.scopes.is_empty() {
                        None
                    } else {
                        Some(settings.scopes.join(" "))
                    },
                    extra_auth_params: settings
                        .extra_auth_params
                        .clone()
                        .unwrap_or_default()
                        .into_iter()
                        .collect(),
                },
            );
        }

        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            providers,
            session: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> Url {
        // Joining a static relative path onto a validated base cannot fail
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .header("apikey", &self.api_key)
    }

    /// Parse a token-grant response body into a `Session` and remember it
    async fn handle_session_response(&self, resp: Response) -> Result<Session, AuthError> {
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AuthError::NetworkOrServiceError(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status, &bytes));
        }

        let token: TokenResponse = serde_json::from_slice(&bytes).map_err(|e| {
            AuthError::NetworkOrServiceError(format!("unexpected session payload: {e}"))
        })?;

        let session = token.into_session();
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Check a no-body response for an error payload
    async fn handle_empty_response(resp: Response) -> Result<(), AuthError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AuthError::NetworkOrServiceError(e.to_string()))?;
        Err(classify_error(status, &bytes))
    }
}

#[async_trait]
impl IdentityService for GoTrueClient {
    async fn password_sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let resp = self
            .post("token?grant_type=password")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_session_response(resp).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let resp = self
            .post("signup")
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": display_name },
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AuthError::NetworkOrServiceError(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status, &bytes));
        }

        // Autoconfirm projects answer with a full token grant; projects that
        // require email verification answer with the bare user record.
        if let Ok(token) = serde_json::from_slice::<TokenResponse>(&bytes) {
            let session = token.into_session();
            *self.session.write().await = Some(session.clone());
            return Ok(SignUpOutcome::Session(session));
        }

        match serde_json::from_slice::<RemoteUser>(&bytes) {
            Ok(user) => {
                debug!("Sign-up for user {} pending email verification", user.id);
                Ok(SignUpOutcome::Pending(PendingAuth::VerificationRequired))
            }
            Err(e) => Err(AuthError::NetworkOrServiceError(format!(
                "unexpected sign-up payload: {e}"
            ))),
        }
    }

    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.session.read().await.clone())
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError> {
        // Validate the pair by resolving the user behind the access token
        let resp = self
            .http
            .get(self.url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AuthError::NetworkOrServiceError(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status, &bytes));
        }

        let user: RemoteUser = serde_json::from_slice(&bytes).map_err(|e| {
            AuthError::NetworkOrServiceError(format!("unexpected user payload: {e}"))
        })?;

        let session = Session {
            user: user.into_user(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: Utc::now() + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
        };
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    fn authorize_url(&self, provider: Provider, redirect_to: &str) -> Result<String, AuthError> {
        let options = self.providers.get(&provider).ok_or_else(|| {
            AuthError::InvalidRequest(format!("provider {provider} is not configured"))
        })?;

        let mut url = self.url("authorize");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("provider", provider.as_str());
            pairs.append_pair("redirect_to", redirect_to);
            if let Some(scopes) = &options.scopes {
                pairs.append_pair("scopes", scopes);
            }
            for (key, value) in &options.extra_auth_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    async fn start_phone_otp(&self, phone: &str) -> Result<(), AuthError> {
        let resp = self
            .post("otp")
            .json(&json!({ "phone": phone, "create_user": true }))
            .send()
            .await
            .map_err(transport_error)?;

        Self::handle_empty_response(resp).await
    }

    async fn verify_phone_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError> {
        let resp = self
            .post("verify")
            .json(&json!({ "phone": phone, "token": code, "type": "sms" }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            // Any 4xx from /verify short of rate limiting means the code
            // did not match or has expired
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| AuthError::NetworkOrServiceError(e.to_string()))?;
            debug!(
                "OTP verification rejected ({status}): {}",
                String::from_utf8_lossy(&bytes)
            );
            return Err(AuthError::InvalidCode);
        }

        self.handle_session_response(resp).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        *self.session.write().await = None;

        let resp = self
            .post("logout")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        Self::handle_empty_response(resp).await
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        let resp = self
            .post("recover")
            .json(&json!({ "email": email, "redirect_to": redirect_to }))
            .send()
            .await
            .map_err(transport_error)?;

        Self::handle_empty_response(resp).await
    }
}

fn transport_error(err: reqwest::Error) -> AuthError {
    AuthError::NetworkOrServiceError(err.to_string())
}

/// Map a non-2xx identity service response into the error taxonomy.
///
/// `GoTrue` error bodies come in several shapes (`error`/`error_description`,
/// `msg`, `message`); classification works off status first, then the text.
fn classify_error(status: StatusCode, body: &[u8]) -> AuthError {
    let message = remote_error_message(body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return AuthError::RateLimited { wait_seconds: 60 };
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("not confirmed") || lower.contains("not verified") {
        return AuthError::UnverifiedAccount;
    }
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        if lower.contains("invalid login credentials") || lower.contains("invalid grant") {
            return AuthError::InvalidCredentials;
        }
        if lower.contains("token") && (lower.contains("invalid") || lower.contains("expired")) {
            return AuthError::InvalidCredentials;
        }
    }

    warn!("Unclassified identity service error ({status}): {message}");
    AuthError::NetworkOrServiceError(message)
}

/// Pull the human-readable message out of whichever error shape was returned
fn remote_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body).map_or_else(
        |_| String::from_utf8_lossy(body).into_owned(),
        |value| {
            value
                .get("error_description")
                .or_else(|| value.get("msg"))
                .or_else(|| value.get("message"))
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .map_or_else(|| value.to_string(), ToString::to_string)
        },
    )
}

/// Token-grant response from `/token`, `/verify` and autoconfirmed `/signup`
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    user: RemoteUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let lifetime = self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Session {
            user: self.user.into_user(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        }
    }
}

/// User record as the service returns it
#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    email: Option<String>,
    phone: Option<String>,
    email_confirmed_at: Option<String>,
    confirmed_at: Option<String>,
    user_metadata: Option<Value>,
}

impl RemoteUser {
    fn into_user(self) -> User {
        let metadata = self.user_metadata.unwrap_or(Value::Null);
        let meta_str =
            |key: &str| metadata.get(key).and_then(Value::as_str).map(str::to_string);

        User {
            id: self.id,
            email: self.email.filter(|e| !e.is_empty()),
            phone: self.phone.filter(|p| !p.is_empty()),
            name: meta_str("full_name").or_else(|| meta_str("name")),
            avatar_url: meta_str("avatar_url"),
            email_verified: self.email_confirmed_at.is_some() || self.confirmed_at.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoTrueClient {
        GoTrueClient::new(
            "https://project.example.co",
            "anon-key",
            &[ProviderSettings {
                name: "linkedin".to_string(),
                scopes: vec![
                    "r_liteprofile".to_string(),
                    "r_emailaddress".to_string(),
                ],
                extra_auth_params: Some(
                    [("response_type".to_string(), "code".to_string())].into(),
                ),
                enabled: true,
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_normalization() {
        let client = client();
        assert_eq!(
            client.url("token").as_str(),
            "https://project.example.co/auth/v1/token"
        );
    }

    #[test]
    fn test_authorize_url_carries_provider_options() {
        let client = client();
        let url = client
            .authorize_url(Provider::Linkedin, "https://app.example.com/auth/callback")
            .unwrap();

        assert!(url.starts_with("https://project.example.co/auth/v1/authorize?"));
        assert!(url.contains("provider=linkedin"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"));
        assert!(url.contains("scopes=r_liteprofile+r_emailaddress"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn test_authorize_url_rejects_unconfigured_provider() {
        let client = client();
        let err = client
            .authorize_url(Provider::Google, "https://app.example.com/auth/callback")
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[test]
    fn test_error_classification() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            br#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err, AuthError::InvalidCredentials);

        let err = classify_error(StatusCode::BAD_REQUEST, br#"{"msg":"Email not confirmed"}"#);
        assert_eq!(err, AuthError::UnverifiedAccount);

        let err = classify_error(StatusCode::TOO_MANY_REQUESTS, b"{}");
        assert!(matches!(err, AuthError::RateLimited { .. }));

        let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, b"boom");
        assert!(matches!(err, AuthError::NetworkOrServiceError(_)));
    }

    #[test]
    fn test_remote_user_mapping() {
        let raw = serde_json::json!({
            "id": "uuid-1",
            "email": "jane@example.com",
            "phone": "",
            "email_confirmed_at": "2026-01-01T00:00:00Z",
            "user_metadata": { "full_name": "Jane Doe", "avatar_url": "https://cdn/x.png" }
        });
        let user: RemoteUser = serde_json::from_value(raw).unwrap();
        let user = user.into_user();

        assert_eq!(user.id, "uuid-1");
        assert_eq!(user.email.as_deref(), Some("jane@example.com"));
        assert_eq!(user.phone, None);
        assert_eq!(user.name.as_deref(), Some("Jane Doe"));
        assert!(user.email_verified);
    }

    #[test]
    fn test_token_response_without_expiry_gets_default() {
        let raw = serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "user": { "id": "uuid-2" }
        });
        let token: TokenResponse = serde_json::from_value(raw).unwrap();
        let session = token.into_session();
        assert!(!session.is_expired());
    }
}
