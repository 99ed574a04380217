#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the gradpass application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod errors;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use errors::AuthError;
pub use identity::{GoTrueClient, IdentityService, Provider};
pub use models::{PendingAuth, Session, SignUpOutcome, User};
pub use session::SessionManager;
pub use settings::GradpassSettings;
