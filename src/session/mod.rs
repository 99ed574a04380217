//! Session lifecycle
//!
//! # Modules
//!
//! - [`manager`] - the session manager, single source of truth for the
//!   current session and orchestrator of every credential flow
//! - [`callback`] - OAuth redirect parsing and the callback state machine

pub mod callback;
pub mod manager;

pub use callback::{CallbackError, OAuthRedirectState};
pub use manager::{SessionManager, CALLBACK_PATH, OTP_CODE_LENGTH, PASSWORD_MIN_LENGTH};
