//! Layered configuration
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. `GRADPASS_*` environment variables
//! 2. `Settings.toml` in `GRADPASS_SECRETS_DIR` (if specified and exists)
//! 3. `Settings.toml` in the current directory (if exists)
//! 4. Defaults

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use thiserror::Error;

/// Settings loading failures
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] basic_toml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GradpassSettings {
    pub application: ApplicationSettings,
    pub identity: IdentitySettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Public origin of this gateway; the OAuth callback URL and reset link
    /// are derived from it
    pub redirect_base_url: String,
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySettings {
    /// Project URL of the hosted identity service
    pub base_url: String,
    /// Project API key (can be overridden by environment variable)
    pub api_key: String,
    /// Environment variable name to read the API key from instead
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Timeout for a single identity-service call, in seconds
    pub call_timeout_seconds: u64,
    /// Local cool-down between password-reset dispatches, in seconds
    pub reset_cooldown_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub name: String,
    pub scopes: Vec<String>,
    pub extra_auth_params: Option<HashMap<String, String>>,
    pub enabled: bool,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            redirect_base_url: "http://localhost:8080".to_string(),
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9999".to_string(),
            api_key: String::new(),
            api_key_env: Some("GRADPASS_IDENTITY_API_KEY".to_string()),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            call_timeout_seconds: 20,
            reset_cooldown_seconds: 15,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            scopes: Vec::new(),
            extra_auth_params: None,
            enabled: true,
        }
    }
}

impl GradpassSettings {
    /// Load settings from configuration files and environment variables.
    /// Also initializes the logger from the configured level.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or
    /// parsed as TOML.
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.init_logging();
        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    fn load_base_settings() -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
        }

        if let Ok(secrets_dir) = std::env::var("GRADPASS_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                let toml_content = fs::read_to_string(&secrets_path)?;
                settings = basic_toml::from_str(&toml_content)?;
            }
        }

        if settings.providers.is_empty() {
            settings.providers = Self::default_providers();
        }

        Ok(settings)
    }

    /// Apply `GRADPASS_*` environment variable overrides
    pub fn apply_env_overrides(settings: &mut Self) {
        if let Ok(host) = std::env::var("GRADPASS_HOST") {
            settings.application.host = host;
        }
        if let Ok(port) = std::env::var("GRADPASS_PORT") {
            if let Ok(port) = port.parse() {
                settings.application.port = port;
            }
        }
        if let Ok(url) = std::env::var("GRADPASS_REDIRECT_BASE_URL") {
            settings.application.redirect_base_url = url;
        }
        if let Ok(url) = std::env::var("GRADPASS_IDENTITY_URL") {
            settings.identity.base_url = url;
        }
        if let Ok(level) = std::env::var("GRADPASS_LOG_LEVEL") {
            settings.logging.level = level;
        }
    }

    fn init_logging(&self) {
        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.logging.level.clone()),
        );
        // Repeated init is fine in tests
        let _ = builder.try_init();
    }

    /// Resolve the identity API key, preferring the configured environment
    /// variable over the inline value
    #[must_use]
    pub fn resolve_api_key(&self) -> String {
        self.identity
            .api_key_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| self.identity.api_key.clone())
    }

    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    /// Providers the platform is registered with out of the box.
    /// `LinkedIn` needs the code response type and profile scopes.
    fn default_providers() -> Vec<ProviderSettings> {
        vec![
            ProviderSettings {
                name: "google".to_string(),
                scopes: Vec::new(),
                extra_auth_params: None,
                enabled: true,
            },
            ProviderSettings {
                name: "linkedin".to_string(),
                scopes: vec!["r_liteprofile".to_string(), "r_emailaddress".to_string()],
                extra_auth_params: Some(
                    [("response_type".to_string(), "code".to_string())].into(),
                ),
                enabled: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let settings = GradpassSettings::default();
        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.auth.call_timeout_seconds, 20);
        assert_eq!(settings.auth.reset_cooldown_seconds, 15);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_bind_address() {
        let settings = GradpassSettings::default();
        assert_eq!(settings.get_bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_cors_origins_split_and_trimmed() {
        let mut settings = GradpassSettings::default();
        settings.application.cors_origins =
            "https://a.example.com , https://b.example.com,".to_string();
        assert_eq!(
            settings.get_cors_origins(),
            vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ]
        );
    }

    #[test]
    #[serial]
    fn test_env_override_priority() {
        std::env::set_var("GRADPASS_HOST", "127.0.0.1");
        std::env::set_var("GRADPASS_PORT", "9000");
        std::env::set_var("GRADPASS_IDENTITY_URL", "https://id.example.com");

        let mut settings = GradpassSettings::default();
        GradpassSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.host, "127.0.0.1");
        assert_eq!(settings.application.port, 9000);
        assert_eq!(settings.identity.base_url, "https://id.example.com");

        std::env::remove_var("GRADPASS_HOST");
        std::env::remove_var("GRADPASS_PORT");
        std::env::remove_var("GRADPASS_IDENTITY_URL");
    }

    #[test]
    #[serial]
    fn test_env_override_ignores_bad_port() {
        std::env::set_var("GRADPASS_PORT", "not-a-port");
        let mut settings = GradpassSettings::default();
        GradpassSettings::apply_env_overrides(&mut settings);
        assert_eq!(settings.application.port, 8080);
        std::env::remove_var("GRADPASS_PORT");
    }

    #[test]
    #[serial]
    fn test_load_from_secrets_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Settings.toml"),
            r#"
[application]
host = "10.0.0.1"
port = 8443
redirect_base_url = "https://auth.gradpass.io"
cors_origins = "https://gradpass.io"

[identity]
base_url = "https://project.supabase.co"
api_key = "anon-key"

[auth]
call_timeout_seconds = 10
reset_cooldown_seconds = 15

[logging]
level = "debug"
"#,
        )
        .unwrap();
        std::env::set_var("GRADPASS_SECRETS_DIR", dir.path());

        let settings = GradpassSettings::load_base_settings().unwrap();
        assert_eq!(settings.application.host, "10.0.0.1");
        assert_eq!(settings.application.port, 8443);
        assert_eq!(settings.identity.api_key, "anon-key");
        assert_eq!(settings.auth.call_timeout_seconds, 10);
        // Empty provider table falls back to the registered defaults
        assert_eq!(settings.providers.len(), 2);

        std::env::remove_var("GRADPASS_SECRETS_DIR");
    }

    #[test]
    #[serial]
    fn test_api_key_env_resolution() {
        let mut settings = GradpassSettings::default();
        settings.identity.api_key = "inline-key".to_string();
        settings.identity.api_key_env = Some("GRADPASS_TEST_API_KEY".to_string());

        std::env::remove_var("GRADPASS_TEST_API_KEY");
        assert_eq!(settings.resolve_api_key(), "inline-key");

        std::env::set_var("GRADPASS_TEST_API_KEY", "env-key");
        assert_eq!(settings.resolve_api_key(), "env-key");
        std::env::remove_var("GRADPASS_TEST_API_KEY");
    }
}
