//! Pre-built test data
//!
//! Shared fixtures so unit and integration tests construct users, sessions
//! and managers the same way.

use crate::identity::IdentityService;
use crate::models::{Session, User};
use crate::session::SessionManager;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Factory for common test objects
pub struct TestFixtures;

impl TestFixtures {
    /// A verified email user
    #[must_use]
    pub fn user() -> User {
        User {
            id: "user-1".to_string(),
            email: Some("jane@example.com".to_string()),
            phone: None,
            name: Some("Jane Doe".to_string()),
            avatar_url: None,
            email_verified: true,
        }
    }

    /// A valid, unexpired session for [`Self::user`]
    #[must_use]
    pub fn session() -> Session {
        Session {
            user: Self::user(),
            access_token: "fixture-access-token".to_string(),
            refresh_token: "fixture-refresh-token".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    /// A manager over the given identity service with test-friendly timings
    #[must_use]
    pub fn session_manager(identity: Arc<dyn IdentityService>) -> SessionManager {
        SessionManager::new(identity, "https://app.example.com")
            .with_call_timeout(std::time::Duration::from_millis(500))
            .with_reset_cooldown(std::time::Duration::from_secs(15))
    }
}
