#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use gradpass::{
    handlers::{
        health, oauth_callback_get, oauth_callback_post, oauth_sign_in, phone_send, phone_verify,
        reset_password, session_info, sign_in, sign_out, sign_up,
    },
    session::CALLBACK_PATH,
    settings::GradpassSettings,
    GoTrueClient, SessionManager,
};
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables.
    // This also initializes the logger.
    let settings = GradpassSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let identity = GoTrueClient::new(
        &settings.identity.base_url,
        &settings.resolve_api_key(),
        &settings.providers,
    )
    .map_err(|e| std::io::Error::other(format!("Failed to configure identity client: {e}")))?;

    let manager = SessionManager::new(
        Arc::new(identity),
        &settings.application.redirect_base_url,
    )
    .with_call_timeout(Duration::from_secs(settings.auth.call_timeout_seconds))
    .with_reset_cooldown(Duration::from_secs(settings.auth.reset_cooldown_seconds));

    start_server(manager, settings).await
}

/// Start the gateway server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(manager: SessionManager, settings: GradpassSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let manager = web::Data::new(manager);
    let cors_origins = settings.get_cors_origins();
    let settings = web::Data::new(settings);

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(manager.clone())
            .app_data(settings.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg
        // Credential flows
        .route("/auth/signup", web::post().to(sign_up))
        .route("/auth/signin", web::post().to(sign_in))
        .route("/auth/signout", web::post().to(sign_out))
        .route("/auth/reset_password", web::post().to(reset_password))
        // Phone OTP flow
        .route("/auth/phone/send", web::post().to(phone_send))
        .route("/auth/phone/verify", web::post().to(phone_verify))
        // OAuth flow
        .route("/auth/oauth/sign_in", web::get().to(oauth_sign_in))
        .route(CALLBACK_PATH, web::get().to(oauth_callback_get))
        .route(CALLBACK_PATH, web::post().to(oauth_callback_post))
        // Session introspection
        .route("/auth/session", web::get().to(session_info))
        // Health endpoint
        .route("/ping", web::get().to(health));
}

fn print_startup_info(bind_address: &str, settings: &GradpassSettings) {
    println!("Starting Gradpass auth gateway on http://{bind_address}");
    println!();
    println!("Credential endpoints:");
    println!("  POST /auth/signup          - Create an email/password account");
    println!("  POST /auth/signin          - Sign in with email/password");
    println!("  POST /auth/signout         - Clear the session");
    println!("  POST /auth/reset_password  - Dispatch a password-reset email");
    println!();
    println!("Phone OTP endpoints:");
    println!("  POST /auth/phone/send      - Dispatch a one-time code");
    println!("  POST /auth/phone/verify    - Verify the code");
    println!();
    println!("OAuth endpoints:");
    println!("  GET  /auth/oauth/sign_in   - Redirect to the provider");
    println!("  GET|POST {CALLBACK_PATH}       - OAuth callback (POST for fragment URLs)");
    println!();
    println!("OAuth callback URL for identity providers:");
    println!(
        "  {}{CALLBACK_PATH}",
        settings.application.redirect_base_url
    );
    println!();
    println!("System endpoints:");
    println!("  GET  /auth/session         - Current session");
    println!("  GET  /ping                 - Health check");
}
