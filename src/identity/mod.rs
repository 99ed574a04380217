//! Identity & Session Service boundary
//!
//! The hosted identity provider is a black box behind the [`IdentityService`]
//! trait: the session manager is written against `dyn IdentityService` so the
//! whole credential flow can be exercised with a fake service in tests.
//!
//! # Modules
//!
//! - [`gotrue`] - `reqwest`-based client for a `GoTrue`-style hosted service

pub mod gotrue;

pub use gotrue::GoTrueClient;

use crate::errors::AuthError;
use crate::models::{Session, SignUpOutcome};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// OAuth providers the platform is registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Linkedin,
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "linkedin" => Ok(Provider::Linkedin),
            other => Err(AuthError::InvalidRequest(format!(
                "unsupported OAuth provider: {other}"
            ))),
        }
    }
}

/// Operations the session manager consumes from the hosted identity service.
///
/// Implementations map the service's loosely-typed error payloads into the
/// closed [`AuthError`] taxonomy; raw remote error shapes never cross this
/// boundary.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Create a session from an email/password pair
    ///
    /// # Errors
    /// Returns `InvalidCredentials` on rejection, `UnverifiedAccount` for an
    /// unconfirmed email, or the mapped remote failure.
    async fn password_sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Create a new account; may yield a session immediately or require
    /// email verification first
    ///
    /// # Errors
    /// Returns the mapped remote failure, including `RateLimited` when the
    /// service throttles sign-ups.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AuthError>;

    /// Ask the service for an already-established session, if any.
    ///
    /// The service may have completed an implicit token exchange as a side
    /// effect of an earlier call; this is the authoritative check the OAuth
    /// callback handler runs before parsing anything out of the URL.
    ///
    /// # Errors
    /// Returns the mapped remote failure; an absent session is `Ok(None)`,
    /// not an error.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Install an explicit access/refresh token pair as the session
    ///
    /// # Errors
    /// Returns `InvalidCredentials` if the pair is rejected, or the mapped
    /// remote failure.
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError>;

    /// Build the authorization URL to redirect the user to.
    ///
    /// Makes no network request and never produces a session; the session is
    /// established later via the callback flow.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the provider is not configured.
    fn authorize_url(&self, provider: Provider, redirect_to: &str) -> Result<String, AuthError>;

    /// Trigger out-of-band delivery of a one-time code to `phone` (E.164)
    ///
    /// # Errors
    /// Returns the mapped remote failure, including `RateLimited` when code
    /// delivery is throttled.
    async fn start_phone_otp(&self, phone: &str) -> Result<(), AuthError>;

    /// Complete the phone flow by verifying the delivered code
    ///
    /// # Errors
    /// Returns `InvalidCode` on mismatch or expiry, or the mapped remote
    /// failure.
    async fn verify_phone_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError>;

    /// Revoke the remote session behind `access_token`
    ///
    /// # Errors
    /// Returns the mapped remote failure when revocation is rejected.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Dispatch a password-reset email linking back to `redirect_to`
    ///
    /// # Errors
    /// Returns the mapped remote failure, including `RateLimited` when the
    /// service throttles reset emails.
    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AuthError>;
}
