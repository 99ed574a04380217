// HTTP request handlers for the auth gateway
pub mod auth;
pub mod callback;
pub mod health;

// Re-export the main handler functions
pub use auth::{
    phone_send, phone_verify, reset_password, session_info, sign_in, sign_out, sign_up,
};
pub use callback::{oauth_callback_get, oauth_callback_post, oauth_sign_in};
pub use health::health;
