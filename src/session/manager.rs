//! Session Manager - single source of truth for "who is signed in"
//!
//! The manager owns the one authoritative `Session` per client process and
//! orchestrates every credential flow against the injected identity service,
//! normalizing outcomes into `Session` updates or `AuthError` values.
//!
//! ## Write discipline
//!
//! All session writes are serialized behind one lock. Each operation runs as
//! an [`AuthAttempt`] with a monotonically increasing sequence number; an
//! attempt only installs its session if nothing wrote the session after the
//! attempt began, so a stale completion is discarded and the last globally
//! consistent state wins. A second in-flight attempt of the same kind is
//! rejected with `AuthError::Busy` instead of racing.
//!
//! Readers observe the session through a `tokio::sync::watch` channel rather
//! than ambient global state.

use crate::errors::AuthError;
use crate::identity::{IdentityService, Provider};
use crate::models::{AttemptKind, AuthAttempt, PendingAuth, Session, SignUpOutcome};
use crate::session::callback::{resolve_callback, OAuthRedirectState};
use crate::utils::phone::normalize_e164;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

/// Minimum password length enforced by the identity service
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Fixed length of the one-time phone code
pub const OTP_CODE_LENGTH: usize = 6;

/// Cool-down between password-reset dispatches (local guard)
const RESET_COOLDOWN: Duration = Duration::from_secs(15);

/// Default timeout for a single identity-service call
const CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Fixed, pre-registered OAuth callback path
pub const CALLBACK_PATH: &str = "/auth/callback";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    // Shape check only; the identity service is the authority on deliverability
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex")
});

/// Mutable state guarded by the manager's lock
struct ManagerState {
    session: Option<Session>,
    /// Sequence number of the attempt that last wrote the session
    last_write_seq: u64,
    next_seq: u64,
    inflight: HashSet<AttemptKind>,
    last_reset_at: Option<Instant>,
    /// Raw URL and outcome of the most recent OAuth callback, so a re-run of
    /// the handler consumes the redirect exactly once
    last_callback: Option<(String, Result<Session, AuthError>)>,
}

/// Central coordinator for all credential flows
pub struct SessionManager {
    identity: Arc<dyn IdentityService>,
    state: Mutex<ManagerState>,
    session_tx: watch::Sender<Option<Session>>,
    redirect_base_url: String,
    call_timeout: Duration,
    reset_cooldown: Duration,
}

impl SessionManager {
    /// Create a manager bound to an identity service.
    ///
    /// `redirect_base_url` is the public origin of this gateway; the OAuth
    /// callback URL and password-reset link are derived from it.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityService>, redirect_base_url: &str) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            identity,
            state: Mutex::new(ManagerState {
                session: None,
                last_write_seq: 0,
                next_seq: 1,
                inflight: HashSet::new(),
                last_reset_at: None,
                last_callback: None,
            }),
            session_tx,
            redirect_base_url: redirect_base_url.trim_end_matches('/').to_string(),
            call_timeout: CALL_TIMEOUT,
            reset_cooldown: RESET_COOLDOWN,
        }
    }

    /// Override the identity-call timeout
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Override the password-reset cool-down window
    #[must_use]
    pub const fn with_reset_cooldown(mut self, cooldown: Duration) -> Self {
        self.reset_cooldown = cooldown;
        self
    }

    /// The fixed callback URL registered with every OAuth provider
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.redirect_base_url)
    }

    /// Snapshot of the current session; `None` means signed out
    pub async fn current_session(&self) -> Option<Session> {
        self.state.lock().await.session.clone()
    }

    /// Subscribe to session changes (publish/subscribe for readers)
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }
}

// =============================================================================
// Credential flows
// =============================================================================

impl SessionManager {
    /// Create a new email/password account.
    ///
    /// The identity service may require email verification before a usable
    /// session exists; in that case the outcome is
    /// `SignUpOutcome::Pending(VerificationRequired)` and the session is left
    /// untouched until a later sign-in.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a malformed email or short password,
    /// `Busy` while another sign-up is in flight, or the mapped remote error.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        validate_email(email)?;
        validate_password(password)?;

        let attempt = self.begin(AttemptKind::SignUp).await?;
        let result = self
            .bounded(self.identity.sign_up(email, password, display_name))
            .await;

        match result {
            Ok(SignUpOutcome::Session(session)) => {
                let session = self.commit(attempt, session).await;
                Ok(SignUpOutcome::Session(session))
            }
            Ok(SignUpOutcome::Pending(pending)) => {
                info!("Sign-up for {email} pending verification");
                self.release(attempt).await;
                Ok(SignUpOutcome::Pending(pending))
            }
            Err(err) => {
                self.release(attempt).await;
                Err(err)
            }
        }
    }

    /// Sign in with an email/password pair.
    ///
    /// On success the session is set atomically; on failure it is left
    /// untouched and the specific error is surfaced.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials`, `UnverifiedAccount`, `RateLimited`, `Busy`,
    /// `Timeout` or `NetworkOrServiceError`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validate_email(email)?;

        let attempt = self.begin(AttemptKind::SignIn).await?;
        match self
            .bounded(self.identity.password_sign_in(email, password))
            .await
        {
            Ok(session) => Ok(self.commit(attempt, session).await),
            Err(err) => {
                self.release(attempt).await;
                Err(err)
            }
        }
    }

    /// Start an OAuth flow; returns the authorization URL to navigate to.
    ///
    /// Produces no session. The session is established out-of-band later via
    /// [`Self::handle_oauth_callback`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the provider is not configured.
    pub fn sign_in_with_oauth(&self, provider: Provider) -> Result<String, AuthError> {
        let url = self
            .identity
            .authorize_url(provider, &self.callback_url())?;
        info!("Redirecting to {provider} authorization URL");
        Ok(url)
    }

    /// Reconcile a returning OAuth redirect into a session.
    ///
    /// Runs the callback state machine (see [`crate::session::callback`]).
    /// A given raw URL is consumed exactly once: re-running the handler with
    /// the same URL returns the recorded outcome without touching the
    /// identity service again.
    ///
    /// # Errors
    ///
    /// `MalformedCallback` for an unparseable URL or explicit provider error,
    /// `NoSessionFound` when no branch yields a session, `Busy`, `Timeout`,
    /// or the mapped remote error.
    pub async fn handle_oauth_callback(&self, raw_url: &str) -> Result<Session, AuthError> {
        {
            let state = self.state.lock().await;
            if let Some((consumed_url, outcome)) = &state.last_callback {
                if consumed_url == raw_url {
                    debug!("Callback already consumed; returning recorded outcome");
                    return outcome.clone();
                }
            }
        }

        let attempt = self.begin(AttemptKind::OauthCallback).await?;

        let outcome = match OAuthRedirectState::parse(raw_url) {
            Ok(redirect) => {
                self.bounded(resolve_callback(self.identity.as_ref(), &redirect))
                    .await
            }
            Err(err) => Err(err),
        };

        let outcome = match outcome {
            Ok(session) => Ok(self.commit(attempt, session).await),
            Err(err) => {
                self.release(attempt).await;
                Err(err)
            }
        };

        let mut state = self.state.lock().await;
        state.last_callback = Some((raw_url.to_string(), outcome.clone()));
        drop(state);

        outcome
    }

    /// Trigger one-time-code delivery to a phone number.
    ///
    /// The number is normalized to E.164 before dispatch. Returns
    /// `PendingAuth::OtpSent`; no session exists yet.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a non-E.164 number, `Busy`, `Timeout` or the
    /// mapped remote error.
    pub async fn sign_in_with_phone(&self, phone: &str) -> Result<PendingAuth, AuthError> {
        let phone = normalize_e164(phone)?;

        let attempt = self.begin(AttemptKind::PhoneOtp).await?;
        let result = self.bounded(self.identity.start_phone_otp(&phone)).await;
        self.release(attempt).await;

        result.map(|()| {
            info!("OTP dispatched to {phone}");
            PendingAuth::OtpSent
        })
    }

    /// Complete the phone flow by verifying the delivered code.
    ///
    /// # Errors
    ///
    /// `InvalidCode` on mismatch (session untouched), `InvalidRequest` for a
    /// malformed number or code shape, `Busy`, `Timeout` or the mapped
    /// remote error.
    pub async fn verify_phone_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError> {
        let phone = normalize_e164(phone)?;
        validate_otp_shape(code)?;

        let attempt = self.begin(AttemptKind::PhoneVerify).await?;
        match self
            .bounded(self.identity.verify_phone_otp(&phone, code))
            .await
        {
            Ok(session) => Ok(self.commit(attempt, session).await),
            Err(err) => {
                self.release(attempt).await;
                Err(err)
            }
        }
    }

    /// Sign out the current client.
    ///
    /// The local session is cleared synchronously before the remote service
    /// is notified, and the clear is never rolled back: local sign-out is
    /// authoritative for this client. Idempotent.
    ///
    /// # Errors
    ///
    /// Never fails today; the `Result` is part of the operation contract.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = {
            let mut state = self.state.lock().await;
            let seq = state.next_seq;
            state.next_seq += 1;
            state.last_write_seq = seq;
            let previous = state.session.take();
            let _ = self.session_tx.send(None);
            previous
        };

        if let Some(session) = previous {
            // Best effort: a remote failure does not resurrect the session
            match self
                .bounded(self.identity.sign_out(&session.access_token))
                .await
            {
                Ok(()) => info!("Remote session revoked for user {}", session.user.id),
                Err(err) => {
                    warn!("Remote sign-out failed (local sign-out stands): {err}");
                }
            }
        }

        Ok(())
    }

    /// Dispatch a password-reset email.
    ///
    /// Guarded by a local cool-down independent of the remote service's own
    /// rate limiting: a second call within the window is rejected with
    /// `RateLimited` carrying the remaining seconds, rounded up.
    ///
    /// # Errors
    ///
    /// `RateLimited` within the cool-down, `InvalidRequest` for a malformed
    /// email, `Busy`, `Timeout` or the mapped remote error.
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        validate_email(email)?;

        {
            let state = self.state.lock().await;
            if let Some(last) = state.last_reset_at {
                let elapsed = last.elapsed();
                if elapsed < self.reset_cooldown {
                    let remaining = self.reset_cooldown - elapsed;
                    return Err(AuthError::RateLimited {
                        wait_seconds: ceil_seconds(remaining),
                    });
                }
            }
        }

        let attempt = self.begin(AttemptKind::PasswordReset).await?;
        let redirect_to = format!("{}/reset-password", self.redirect_base_url);
        let result = self
            .bounded(self.identity.send_password_reset(email, &redirect_to))
            .await;

        let mut state = self.state.lock().await;
        state.inflight.remove(&attempt.kind);
        if result.is_ok() {
            // The cool-down window starts at the successful dispatch
            state.last_reset_at = Some(Instant::now());
        }
        drop(state);

        result
    }
}

// =============================================================================
// Attempt bookkeeping
// =============================================================================

impl SessionManager {
    /// Register an attempt, rejecting a duplicate of the same kind
    async fn begin(&self, kind: AttemptKind) -> Result<AuthAttempt, AuthError> {
        let mut state = self.state.lock().await;
        if !state.inflight.insert(kind) {
            debug!("Rejecting {kind} attempt: one already in flight");
            return Err(AuthError::Busy);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        Ok(AuthAttempt { kind, seq })
    }

    /// Install a successful attempt's session, unless a later write made the
    /// result stale; either way the session value is returned to the caller.
    async fn commit(&self, attempt: AuthAttempt, session: Session) -> Session {
        let mut state = self.state.lock().await;
        state.inflight.remove(&attempt.kind);

        if state.last_write_seq > attempt.seq {
            debug!(
                "Discarding stale {} result (write seq {} > attempt seq {})",
                attempt.kind, state.last_write_seq, attempt.seq
            );
            return session;
        }

        state.last_write_seq = attempt.seq;
        state.session = Some(session.clone());
        let _ = self.session_tx.send(state.session.clone());
        drop(state);

        info!("Session established for user {}", session.user.id);
        session
    }

    /// Drop an attempt without touching the session
    async fn release(&self, attempt: AuthAttempt) {
        self.state.lock().await.inflight.remove(&attempt.kind);
    }

    /// Bound an identity-service call by the attempt timeout
    async fn bounded<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Identity service call exceeded {:?}", self.call_timeout);
                Err(AuthError::Timeout)
            }
        }
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AuthError::InvalidRequest(format!(
            "malformed email address: {email}"
        )))
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() >= PASSWORD_MIN_LENGTH {
        Ok(())
    } else {
        Err(AuthError::InvalidRequest(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )))
    }
}

fn validate_otp_shape(code: &str) -> Result<(), AuthError> {
    if code.len() == OTP_CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AuthError::InvalidRequest(format!(
            "verification code must be {OTP_CODE_LENGTH} digits"
        )))
    }
}

fn ceil_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockIdentityService, TestFixtures};

    fn manager(mock: Arc<MockIdentityService>) -> SessionManager {
        SessionManager::new(mock, "https://app.example.com")
            .with_call_timeout(Duration::from_millis(200))
            .with_reset_cooldown(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_sign_in_sets_session() {
        let mock = Arc::new(
            MockIdentityService::new()
                .with_password_user("jane@example.com", "secret1", TestFixtures::user()),
        );
        let manager = manager(mock);

        let session = manager.sign_in("jane@example.com", "secret1").await.unwrap();
        assert_eq!(session.user.email.as_deref(), Some("jane@example.com"));
        assert_eq!(manager.current_session().await, Some(session));
    }

    #[tokio::test]
    async fn test_wrong_password_leaves_session_untouched() {
        let mock = Arc::new(
            MockIdentityService::new()
                .with_password_user("user@example.com", "rightpass", TestFixtures::user()),
        );
        let manager = manager(mock);

        let err = manager
            .sign_in("user@example.com", "wrongpass")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(manager.current_session().await, None);
    }

    #[tokio::test]
    async fn test_sign_up_pending_verification_keeps_session_null() {
        let mock = Arc::new(MockIdentityService::new().with_verification_required());
        let manager = manager(mock);

        let outcome = manager
            .sign_up("new@example.com", "secret1", "Jane Doe")
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            SignUpOutcome::Pending(PendingAuth::VerificationRequired)
        ));
        assert_eq!(manager.current_session().await, None);
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password() {
        let manager = manager(Arc::new(MockIdentityService::new()));
        let err = manager
            .sign_up("new@example.com", "abc", "Jane")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[tokio::test]
    async fn test_sign_in_rejects_malformed_email() {
        let manager = manager(Arc::new(MockIdentityService::new()));
        let err = manager.sign_in("not-an-email", "secret1").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[tokio::test]
    async fn test_phone_otp_normalizes_before_dispatch() {
        let mock = Arc::new(MockIdentityService::new());
        let manager = manager(Arc::clone(&mock));

        let pending = manager.sign_in_with_phone("15551234567").await.unwrap();
        assert_eq!(pending, PendingAuth::OtpSent);
        assert_eq!(mock.otp_dispatches(), vec!["+15551234567".to_string()]);
    }

    #[tokio::test]
    async fn test_wrong_otp_leaves_session_untouched() {
        let mock = Arc::new(
            MockIdentityService::new().with_phone_user("+15551234567", "654321", {
                let mut user = TestFixtures::user();
                user.phone = Some("+15551234567".to_string());
                user
            }),
        );
        let manager = manager(mock);

        let err = manager
            .verify_phone_otp("+15551234567", "000000")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCode);
        assert_eq!(manager.current_session().await, None);
    }

    #[tokio::test]
    async fn test_correct_otp_establishes_session() {
        let mut user = TestFixtures::user();
        user.phone = Some("+15551234567".to_string());
        let mock = Arc::new(
            MockIdentityService::new().with_phone_user("+15551234567", "654321", user),
        );
        let manager = manager(mock);

        let session = manager
            .verify_phone_otp("15551234567", "654321")
            .await
            .unwrap();
        assert_eq!(session.user.phone.as_deref(), Some("+15551234567"));
        assert!(manager.current_session().await.is_some());
    }

    #[tokio::test]
    async fn test_sign_out_is_idempotent() {
        let mock = Arc::new(
            MockIdentityService::new()
                .with_password_user("jane@example.com", "secret1", TestFixtures::user()),
        );
        let manager = manager(Arc::clone(&mock));

        manager.sign_in("jane@example.com", "secret1").await.unwrap();
        manager.sign_out().await.unwrap();
        assert_eq!(manager.current_session().await, None);

        // Second call: still signed out, still no error
        manager.sign_out().await.unwrap();
        assert_eq!(manager.current_session().await, None);
        assert_eq!(mock.sign_out_count(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_survives_remote_failure() {
        let mock = Arc::new(
            MockIdentityService::new()
                .with_password_user("jane@example.com", "secret1", TestFixtures::user())
                .with_sign_out_failure(),
        );
        let manager = manager(mock);

        manager.sign_in("jane@example.com", "secret1").await.unwrap();
        manager.sign_out().await.unwrap();
        assert_eq!(manager.current_session().await, None);
    }

    #[tokio::test]
    async fn test_reset_password_cooldown() {
        let mock = Arc::new(MockIdentityService::new());
        let manager = SessionManager::new(
            Arc::clone(&mock) as Arc<dyn IdentityService>,
            "https://app.example.com",
        )
        .with_reset_cooldown(Duration::from_secs(15));

        manager.reset_password("a@b.com").await.unwrap();

        let err = manager.reset_password("a@b.com").await.unwrap_err();
        match err {
            AuthError::RateLimited { wait_seconds } => {
                assert!((14..=15).contains(&wait_seconds));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reset_password_allowed_after_window() {
        let mock = Arc::new(MockIdentityService::new());
        let manager = SessionManager::new(
            Arc::clone(&mock) as Arc<dyn IdentityService>,
            "https://app.example.com",
        )
        .with_reset_cooldown(Duration::from_millis(50));

        manager.reset_password("a@b.com").await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        manager.reset_password("a@b.com").await.unwrap();
        assert_eq!(mock.reset_dispatches().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_link_points_back_at_gateway() {
        let mock = Arc::new(MockIdentityService::new());
        let manager = manager(Arc::clone(&mock));

        manager.reset_password("a@b.com").await.unwrap();
        let dispatches = mock.reset_dispatches();
        assert_eq!(
            dispatches[0].1,
            "https://app.example.com/reset-password".to_string()
        );
    }

    #[tokio::test]
    async fn test_failed_reset_does_not_start_cooldown() {
        let mock = Arc::new(MockIdentityService::new().with_failure(
            AuthError::NetworkOrServiceError("smtp down".to_string()),
        ));
        let manager = manager(Arc::clone(&mock));

        manager.reset_password("a@b.com").await.unwrap_err();

        mock.clear_failure();
        // No RateLimited: the failed dispatch never opened the window
        manager.reset_password("a@b.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_busy_on_concurrent_same_kind_attempt() {
        let mock = Arc::new(
            MockIdentityService::new()
                .with_password_user("jane@example.com", "secret1", TestFixtures::user())
                .with_delay(Duration::from_millis(100)),
        );
        let manager = Arc::new(manager(mock));

        let first = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.sign_in("jane@example.com", "secret1").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = manager
            .sign_in("jane@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Busy);

        first.await.unwrap().unwrap();
        assert!(manager.current_session().await.is_some());
    }

    #[tokio::test]
    async fn test_identity_timeout_surfaces_timeout_error() {
        let mock = Arc::new(
            MockIdentityService::new()
                .with_password_user("jane@example.com", "secret1", TestFixtures::user())
                .with_delay(Duration::from_millis(500)),
        );
        let manager = manager(mock);

        let err = manager
            .sign_in("jane@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Timeout);
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let slow_user = TestFixtures::user();
        let mut fast_user = TestFixtures::user();
        fast_user.id = "user-fast".to_string();
        fast_user.phone = Some("+15551234567".to_string());

        let mock = Arc::new(
            MockIdentityService::new()
                .with_password_user("jane@example.com", "secret1", slow_user)
                .with_phone_user("+15551234567", "654321", fast_user)
                .with_password_delay(Duration::from_millis(100)),
        );
        let manager = Arc::new(manager(mock));

        // Slow password attempt starts first...
        let slow = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.sign_in("jane@example.com", "secret1").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // ...then a phone verification completes and writes the session
        manager
            .verify_phone_otp("+15551234567", "654321")
            .await
            .unwrap();

        // The password result arrives late: returned to its caller, but the
        // phone-established session stays authoritative
        slow.await.unwrap().unwrap();
        let current = manager.current_session().await.unwrap();
        assert_eq!(current.user.id, "user-fast");
    }

    #[tokio::test]
    async fn test_watch_subscribers_observe_session_changes() {
        let mock = Arc::new(
            MockIdentityService::new()
                .with_password_user("jane@example.com", "secret1", TestFixtures::user()),
        );
        let manager = manager(mock);
        let mut rx = manager.subscribe();
        assert!(rx.borrow().is_none());

        manager.sign_in("jane@example.com", "secret1").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());

        manager.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_oauth_sign_in_returns_url_without_session() {
        let mock = Arc::new(MockIdentityService::new());
        let manager = manager(mock);

        let url = manager.sign_in_with_oauth(Provider::Google).unwrap();
        assert!(url.contains("provider=google"));
        assert!(url.contains("auth%2Fcallback") || url.contains("auth/callback"));
        assert_eq!(manager.current_session().await, None);
    }

    #[tokio::test]
    async fn test_callback_url_is_fixed_path() {
        let manager = manager(Arc::new(MockIdentityService::new()));
        assert_eq!(
            manager.callback_url(),
            "https://app.example.com/auth/callback"
        );
    }
}
