//! Mock objects and fake implementations for testing
//!
//! Provides a scriptable in-memory [`IdentityService`] so session flows can
//! be exercised without network I/O. Behavior is configured up front with
//! builder methods; call counters let tests assert what crossed the boundary.

use crate::errors::AuthError;
use crate::identity::{IdentityService, Provider};
use crate::models::{PendingAuth, Session, SignUpOutcome, User};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct MockState {
    /// email -> (password, user)
    password_users: HashMap<String, (String, User)>,
    /// phone -> (expected code, user)
    phone_users: HashMap<String, (String, User)>,
    /// access token -> (refresh token, user) installable via set_session
    installable: HashMap<String, (String, User)>,
    /// Session returned by current_session once `queries_until_session`
    /// queries have happened
    remote_session: Option<Session>,
    queries_until_session: u32,
    verification_required: bool,
    sign_out_fails: bool,
    forced_failure: Option<AuthError>,

    session_queries: u32,
    installed_sessions: u32,
    sign_outs: u32,
    otp_dispatches: Vec<String>,
    reset_dispatches: Vec<(String, String)>,
}

/// Scriptable fake identity service
#[derive(Default)]
pub struct MockIdentityService {
    state: Mutex<MockState>,
    delay: Option<Duration>,
    password_delay: Option<Duration>,
}

impl MockIdentityService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a verified email/password account
    #[must_use]
    pub fn with_password_user(self, email: &str, password: &str, user: User) -> Self {
        self.locked()
            .password_users
            .insert(email.to_string(), (password.to_string(), user));
        self
    }

    /// Register a phone account reachable through the OTP flow
    #[must_use]
    pub fn with_phone_user(self, phone: &str, code: &str, user: User) -> Self {
        self.locked()
            .phone_users
            .insert(phone.to_string(), (code.to_string(), user));
        self
    }

    /// Make sign-ups answer with a pending-verification outcome
    #[must_use]
    pub fn with_verification_required(self) -> Self {
        self.locked().verification_required = true;
        self
    }

    /// Make `current_session` report an established session immediately
    #[must_use]
    pub fn with_remote_session(self, session: Session) -> Self {
        self.locked().remote_session = Some(session);
        self
    }

    /// Make `current_session` report a session only after `queries` empty
    /// answers, simulating an exchange completing as a side effect
    #[must_use]
    pub fn with_session_after_queries(self, queries: u32, session: Session) -> Self {
        {
            let mut state = self.locked();
            state.remote_session = Some(session);
            state.queries_until_session = queries;
        }
        self
    }

    /// Register a token pair accepted by `set_session`
    #[must_use]
    pub fn with_installable_tokens(self, access: &str, refresh: &str, user: User) -> Self {
        self.locked()
            .installable
            .insert(access.to_string(), (refresh.to_string(), user));
        self
    }

    /// Make remote sign-out fail (the local clear must still stand)
    #[must_use]
    pub fn with_sign_out_failure(self) -> Self {
        self.locked().sign_out_fails = true;
        self
    }

    /// Fail every call with the given error until cleared
    #[must_use]
    pub fn with_failure(self, error: AuthError) -> Self {
        self.locked().forced_failure = Some(error);
        self
    }

    pub fn clear_failure(&self) {
        self.locked().forced_failure = None;
    }

    /// Delay every call, for timeout and concurrency tests
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only password sign-ins, for stale-result tests
    #[must_use]
    pub const fn with_password_delay(mut self, delay: Duration) -> Self {
        self.password_delay = Some(delay);
        self
    }

    // --- counters -----------------------------------------------------------

    #[must_use]
    pub fn session_queries(&self) -> u32 {
        self.locked().session_queries
    }

    #[must_use]
    pub fn installed_sessions(&self) -> u32 {
        self.locked().installed_sessions
    }

    #[must_use]
    pub fn sign_out_count(&self) -> u32 {
        self.locked().sign_outs
    }

    /// Phone numbers OTPs were dispatched to, in order
    #[must_use]
    pub fn otp_dispatches(&self) -> Vec<String> {
        self.locked().otp_dispatches.clone()
    }

    /// `(email, redirect_to)` pairs of reset dispatches, in order
    #[must_use]
    pub fn reset_dispatches(&self) -> Vec<(String, String)> {
        self.locked().reset_dispatches.clone()
    }

    // --- helpers ------------------------------------------------------------

    fn locked(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn forced(&self) -> Result<(), AuthError> {
        self.locked()
            .forced_failure
            .clone()
            .map_or(Ok(()), Err)
    }

    fn session_for(user: User, access: &str, refresh: &str) -> Session {
        Session {
            user,
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        }
    }

    fn fresh_session(user: User) -> Session {
        let access = format!("mock-at-{}", Uuid::new_v4());
        let refresh = format!("mock-rt-{}", Uuid::new_v4());
        Self::session_for(user, &access, &refresh)
    }
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn password_sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.pause().await;
        if let Some(delay) = self.password_delay {
            tokio::time::sleep(delay).await;
        }
        self.forced()?;

        let state = self.locked();
        match state.password_users.get(email) {
            Some((expected, user)) if expected == password => {
                if user.email_verified {
                    Ok(Self::fresh_session(user.clone()))
                } else {
                    Err(AuthError::UnverifiedAccount)
                }
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        self.pause().await;
        self.forced()?;

        let state = self.locked();
        if state.verification_required {
            return Ok(SignUpOutcome::Pending(PendingAuth::VerificationRequired));
        }
        drop(state);

        let user = User {
            id: format!("mock-user-{}", Uuid::new_v4()),
            email: Some(email.to_string()),
            phone: None,
            name: Some(display_name.to_string()),
            avatar_url: None,
            email_verified: true,
        };
        Ok(SignUpOutcome::Session(Self::fresh_session(user)))
    }

    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        self.pause().await;
        self.forced()?;

        let mut state = self.locked();
        state.session_queries += 1;
        if state.session_queries <= state.queries_until_session {
            return Ok(None);
        }
        Ok(state.remote_session.clone())
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError> {
        self.pause().await;
        self.forced()?;

        let mut state = self.locked();
        match state.installable.get(access_token) {
            Some((refresh, user)) if refresh == refresh_token => {
                let session = Self::session_for(user.clone(), access_token, refresh_token);
                state.installed_sessions += 1;
                state.remote_session = Some(session.clone());
                Ok(session)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn authorize_url(&self, provider: Provider, redirect_to: &str) -> Result<String, AuthError> {
        Ok(format!(
            "https://id.example.com/auth/v1/authorize?provider={provider}&redirect_to={redirect_to}"
        ))
    }

    async fn start_phone_otp(&self, phone: &str) -> Result<(), AuthError> {
        self.pause().await;
        self.forced()?;

        self.locked()
            .otp_dispatches
            .push(phone.to_string());
        Ok(())
    }

    async fn verify_phone_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError> {
        self.pause().await;
        self.forced()?;

        let state = self.locked();
        match state.phone_users.get(phone) {
            Some((expected, user)) if expected == code => {
                Ok(Self::fresh_session(user.clone()))
            }
            _ => Err(AuthError::InvalidCode),
        }
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        self.pause().await;

        let mut state = self.locked();
        state.sign_outs += 1;
        if state.sign_out_fails {
            return Err(AuthError::NetworkOrServiceError(
                "logout endpoint unavailable".to_string(),
            ));
        }
        state.remote_session = None;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        self.pause().await;
        self.forced()?;

        self.locked()
            .reset_dispatches
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }
}
