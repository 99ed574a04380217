//! OAuth callback processing
//!
//! A returning OAuth redirect can carry its payload three different ways:
//! an explicit error in the query, tokens embedded in the URL fragment, or a
//! PKCE-style authorization code in the query. The precedence between those
//! signals is the contract callers rely on, so the fall-through is modeled as
//! an explicit state machine rather than nested conditionals:
//!
//! ```text
//! START -> CHECK_URL_ERROR -> CHECK_EXISTING_SESSION
//!       -> CHECK_FRAGMENT_TOKENS -> CHECK_AUTH_CODE -> FAILED_NO_DATA
//! ```
//!
//! An explicit URL error always wins, even when a session happens to exist by
//! other means. The existing-session check precedes fragment/code parsing
//! because it is cheaper and authoritative when present. Every branch
//! terminates in `SUCCESS(Session)` or `FAILED(AuthError)`.

use crate::errors::AuthError;
use crate::identity::IdentityService;
use crate::models::Session;
use log::{debug, info, warn};
use url::Url;

/// Explicit provider error carried in the callback query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackError {
    pub code: String,
    pub description: Option<String>,
}

/// Transient value parsed from a returning redirect URL.
///
/// Exists only for the duration of callback handling and is consumed exactly
/// once; the session manager memoizes the outcome per raw URL so a re-run of
/// the handler (e.g. a re-render) never re-processes the same redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthRedirectState {
    pub error: Option<CallbackError>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub code: Option<String>,
}

impl OAuthRedirectState {
    /// Parse the query and fragment components of a raw callback URL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedCallback` if the URL cannot be parsed.
    pub fn parse(raw_url: &str) -> Result<Self, AuthError> {
        let url = Url::parse(raw_url)
            .map_err(|e| AuthError::MalformedCallback(format!("unparseable URL: {e}")))?;

        let mut state = Self::default();

        let mut error_code = None;
        let mut error_description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "error" => error_code = Some(value.into_owned()),
                "error_description" => error_description = Some(value.into_owned()),
                "code" => state.code = Some(value.into_owned()),
                _ => {}
            }
        }
        state.error = error_code.map(|code| CallbackError {
            code,
            description: error_description,
        });

        if let Some(fragment) = url.fragment() {
            for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
                match key.as_ref() {
                    "access_token" => state.access_token = Some(value.into_owned()),
                    "refresh_token" => state.refresh_token = Some(value.into_owned()),
                    _ => {}
                }
            }
        }

        Ok(state)
    }

    /// Both fragment tokens present, i.e. the implicit-grant payload is usable
    #[must_use]
    pub const fn has_fragment_tokens(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }
}

/// Stages of callback processing, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    CheckUrlError,
    CheckExistingSession,
    CheckFragmentTokens,
    CheckAuthCode,
    FailedNoData,
}

/// Drive the callback state machine to a terminal outcome.
///
/// Pure orchestration over the injected identity service; holds no session
/// state of its own, so the precedence rules are testable in isolation from
/// network I/O.
///
/// # Errors
///
/// Returns the terminal `AuthError` of whichever stage failed; no branch
/// leaves the caller pending.
pub async fn resolve_callback(
    identity: &dyn IdentityService,
    redirect: &OAuthRedirectState,
) -> Result<Session, AuthError> {
    let mut stage = Stage::Start;

    loop {
        debug!("Callback state machine at {stage:?}");
        stage = match stage {
            Stage::Start => Stage::CheckUrlError,

            Stage::CheckUrlError => {
                // An explicit provider error short-circuits everything else,
                // even an already-established session.
                if let Some(error) = &redirect.error {
                    warn!("OAuth provider returned error: {}", error.code);
                    let reason = error
                        .description
                        .clone()
                        .unwrap_or_else(|| error.code.clone());
                    return Err(AuthError::MalformedCallback(reason));
                }
                Stage::CheckExistingSession
            }

            Stage::CheckExistingSession => {
                match identity.current_session().await? {
                    Some(session) => {
                        info!("Session already established for user {}", session.user.id);
                        return Ok(session);
                    }
                    None => Stage::CheckFragmentTokens,
                }
            }

            Stage::CheckFragmentTokens => {
                if redirect.has_fragment_tokens() {
                    // Both tokens are guaranteed present by has_fragment_tokens
                    let access = redirect.access_token.as_deref().unwrap_or_default();
                    let refresh = redirect.refresh_token.as_deref().unwrap_or_default();
                    let session = identity.set_session(access, refresh).await?;
                    info!("Installed fragment tokens for user {}", session.user.id);
                    return Ok(session);
                }
                Stage::CheckAuthCode
            }

            Stage::CheckAuthCode => {
                if redirect.code.is_some() {
                    // PKCE-style flow: the exchange happens as a side effect
                    // of an earlier service call, so re-query for the session.
                    debug!("Authorization code present, re-querying for session");
                    if let Some(session) = identity.current_session().await? {
                        info!("Code exchange yielded session for user {}", session.user.id);
                        return Ok(session);
                    }
                }
                Stage::FailedNoData
            }

            Stage::FailedNoData => {
                warn!("Callback carried no error, session, tokens or usable code");
                return Err(AuthError::NoSessionFound);
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragment_tokens() {
        let state = OAuthRedirectState::parse(
            "https://app.example.com/auth/callback#access_token=at123&refresh_token=rt456&token_type=bearer",
        )
        .unwrap();

        assert!(state.has_fragment_tokens());
        assert_eq!(state.access_token.as_deref(), Some("at123"));
        assert_eq!(state.refresh_token.as_deref(), Some("rt456"));
        assert_eq!(state.error, None);
        assert_eq!(state.code, None);
    }

    #[test]
    fn test_parse_query_error() {
        let state = OAuthRedirectState::parse(
            "https://app.example.com/auth/callback?error=access_denied&error_description=User+cancelled",
        )
        .unwrap();

        let error = state.error.unwrap();
        assert_eq!(error.code, "access_denied");
        assert_eq!(error.description.as_deref(), Some("User cancelled"));
    }

    #[test]
    fn test_parse_authorization_code() {
        let state =
            OAuthRedirectState::parse("https://app.example.com/auth/callback?code=pkce-code-1")
                .unwrap();

        assert_eq!(state.code.as_deref(), Some("pkce-code-1"));
        assert!(!state.has_fragment_tokens());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(OAuthRedirectState::parse("not a url").is_err());
    }

    #[test]
    fn test_lone_access_token_is_not_usable() {
        let state = OAuthRedirectState::parse(
            "https://app.example.com/auth/callback#access_token=at123",
        )
        .unwrap();
        assert!(!state.has_fragment_tokens());
    }
}

#[cfg(test)]
mod state_machine_tests {
    use super::*;
    use crate::testing::{MockIdentityService, TestFixtures};

    fn parse(url: &str) -> OAuthRedirectState {
        OAuthRedirectState::parse(url).unwrap()
    }

    #[tokio::test]
    async fn test_url_error_short_circuits_even_with_session() {
        // A session is reachable, but the explicit error must win
        let mock = MockIdentityService::new().with_remote_session(TestFixtures::session());
        let redirect = parse(
            "https://app.example.com/auth/callback?error=access_denied&error_description=User+cancelled",
        );

        let err = resolve_callback(&mock, &redirect).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::MalformedCallback("User cancelled".to_string())
        );
        assert_eq!(mock.session_queries(), 0);
    }

    #[tokio::test]
    async fn test_existing_session_precedes_fragment_parsing() {
        let session = TestFixtures::session();
        let mock = MockIdentityService::new()
            .with_remote_session(session.clone())
            .with_installable_tokens("other-at", "other-rt", TestFixtures::user());

        // Fragment tokens present, but the established session is authoritative
        let redirect = parse(
            "https://app.example.com/auth/callback#access_token=other-at&refresh_token=other-rt",
        );
        let resolved = resolve_callback(&mock, &redirect).await.unwrap();
        assert_eq!(resolved.user.id, session.user.id);
        assert_eq!(mock.installed_sessions(), 0);
    }

    #[tokio::test]
    async fn test_fragment_tokens_install_session_for_owning_user() {
        let mut owner = TestFixtures::user();
        owner.id = "token-owner".to_string();
        let mock = MockIdentityService::new().with_installable_tokens("at123", "rt456", owner);

        let redirect = parse(
            "https://app.example.com/auth/callback#access_token=at123&refresh_token=rt456",
        );
        let session = resolve_callback(&mock, &redirect).await.unwrap();
        assert_eq!(session.user.id, "token-owner");
        assert_eq!(session.access_token, "at123");
    }

    #[tokio::test]
    async fn test_invalid_fragment_tokens_fail() {
        let mock =
            MockIdentityService::new().with_installable_tokens("good-at", "good-rt", TestFixtures::user());

        let redirect = parse(
            "https://app.example.com/auth/callback#access_token=bad&refresh_token=bad",
        );
        let err = resolve_callback(&mock, &redirect).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_auth_code_requeries_for_session() {
        // The exchange happens as a side effect: the first session query is
        // empty, the re-query after spotting the code finds the session.
        let mock = MockIdentityService::new()
            .with_session_after_queries(1, TestFixtures::session());

        let redirect = parse("https://app.example.com/auth/callback?code=pkce-code");
        let session = resolve_callback(&mock, &redirect).await.unwrap();
        assert_eq!(session.user.id, TestFixtures::user().id);
        assert_eq!(mock.session_queries(), 2);
    }

    #[tokio::test]
    async fn test_code_without_session_fails_no_data() {
        let mock = MockIdentityService::new();
        let redirect = parse("https://app.example.com/auth/callback?code=pkce-code");
        let err = resolve_callback(&mock, &redirect).await.unwrap_err();
        assert_eq!(err, AuthError::NoSessionFound);
    }

    #[tokio::test]
    async fn test_bare_callback_fails_no_data() {
        let mock = MockIdentityService::new();
        let redirect = parse("https://app.example.com/auth/callback");
        let err = resolve_callback(&mock, &redirect).await.unwrap_err();
        assert_eq!(err, AuthError::NoSessionFound);
    }
}
