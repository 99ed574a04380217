//! Unified testing utilities
//!
//! Available to unit tests unconditionally and to integration tests through
//! the `testing` feature.
//!
//! - [`mock`] - scriptable fake identity service
//! - [`fixtures`] - pre-built users, sessions and managers

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::MockIdentityService;
