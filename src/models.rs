//! Core session and user data types
//!
//! These are the authoritative shapes the session manager reasons about.
//! Everything the identity service returns is normalized into them at the
//! identity boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a signed-in account.
///
/// Email is optional because phone-only accounts exist; at least one of
/// `email` / `phone` is always present on a real account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier assigned by the identity service
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Display name, from sign-up metadata or the OAuth profile
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
}

/// The authenticated state of one client: a user plus the opaque token pair
/// needed for subsequent authorized calls.
///
/// Absence of a `Session` means signed-out. At most one is current per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Outcome of an operation that cannot yield a session yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAuth {
    /// Sign-up accepted; the service requires email verification first
    VerificationRequired,
    /// One-time code dispatched to the submitted phone number
    OtpSent,
}

/// Result of a sign-up: either a usable session right away, or a pending
/// state when the service requires email verification first
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    Session(Session),
    Pending(PendingAuth),
}

/// Kind of credential flow an attempt belongs to.
///
/// The manager rejects a second in-flight attempt of the same kind with
/// `AuthError::Busy`, so kinds double as serialization keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptKind {
    SignIn,
    SignUp,
    OauthCallback,
    PhoneOtp,
    PhoneVerify,
    PasswordReset,
}

impl AttemptKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AttemptKind::SignIn => "sign_in",
            AttemptKind::SignUp => "sign_up",
            AttemptKind::OauthCallback => "oauth_callback",
            AttemptKind::PhoneOtp => "phone_otp",
            AttemptKind::PhoneVerify => "phone_verify",
            AttemptKind::PasswordReset => "password_reset",
        }
    }
}

impl std::fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-flight credential operation.
///
/// Transient: created when an operation starts, dropped when it completes.
/// The sequence number orders attempts against session writes so a stale
/// result can be detected and discarded.
#[derive(Debug, Clone, Copy)]
pub struct AuthAttempt {
    pub kind: AttemptKind,
    pub seq: u64,
}
