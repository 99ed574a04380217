//! Authentication error taxonomy
//!
//! Every fallible operation in the crate surfaces one of these variants.
//! Loosely-typed error payloads from the remote identity service are mapped
//! into this closed set at the identity boundary and never propagate raw.

use std::fmt;

/// Closed set of authentication failures surfaced by the session manager.
///
/// Each variant carries a machine-checkable kind (see [`AuthError::kind`])
/// and renders a human-readable reason through `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Email/password or token pair rejected by the identity service
    InvalidCredentials,

    /// Account exists but its email has not been verified yet
    UnverifiedAccount,

    /// Too many requests; `wait_seconds` is the remaining cool-down
    RateLimited { wait_seconds: u64 },

    /// One-time phone code did not match
    InvalidCode,

    /// OAuth callback carried no error, no session, no usable tokens or code
    NoSessionFound,

    /// Callback URL could not be parsed, or carried an explicit provider error
    MalformedCallback(String),

    /// Transport failure or unclassifiable remote rejection
    NetworkOrServiceError(String),

    /// An attempt of the same kind is already in flight
    Busy,

    /// The identity service did not answer within the attempt timeout
    Timeout,

    /// Input rejected locally before any remote call (bad email, phone, provider)
    InvalidRequest(String),
}

impl AuthError {
    /// Stable machine-readable error code, used as the `error` field on the wire
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UnverifiedAccount => "unverified_account",
            AuthError::RateLimited { .. } => "rate_limited",
            AuthError::InvalidCode => "invalid_code",
            AuthError::NoSessionFound => "no_session_found",
            AuthError::MalformedCallback(_) => "malformed_callback",
            AuthError::NetworkOrServiceError(_) => "service_error",
            AuthError::Busy => "busy",
            AuthError::Timeout => "timeout",
            AuthError::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Whether this failure was produced by a local guard rather than the
    /// remote service. The UI shows a countdown for local rate limiting and a
    /// generic error otherwise, so the distinction is part of the contract.
    #[must_use]
    pub const fn is_local_guard(&self) -> bool {
        matches!(
            self,
            AuthError::RateLimited { .. } | AuthError::Busy | AuthError::InvalidRequest(_)
        )
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid login credentials"),
            AuthError::UnverifiedAccount => {
                write!(f, "Account email has not been verified yet")
            }
            AuthError::RateLimited { wait_seconds } => {
                write!(f, "Please wait {wait_seconds} seconds before trying again")
            }
            AuthError::InvalidCode => write!(f, "The verification code is incorrect"),
            AuthError::NoSessionFound => write!(f, "No session or authorization data found"),
            AuthError::MalformedCallback(msg) => write!(f, "Callback rejected: {msg}"),
            AuthError::NetworkOrServiceError(msg) => write!(f, "Identity service error: {msg}"),
            AuthError::Busy => write!(f, "Another attempt of this kind is already in progress"),
            AuthError::Timeout => write!(f, "The identity service did not respond in time"),
            AuthError::InvalidRequest(msg) => write!(f, "Invalid request: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}
