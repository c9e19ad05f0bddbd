/// Configuration Module
///
/// Provides configuration management for the Securinets registration portal.
/// Handles loading and parsing of YAML configuration files and environment variables.
/// Environment variables use the `APP` prefix with `__` separating nested keys,
/// e.g. `APP_BACKEND__ANON_KEY`.
///
/// # License
/// Licensed under the AGPLv3 license.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use config::{Config as ConfigFile, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/application.yml";

/// Application metadata configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Application {
    /// Name of the application
    pub name: String,
    /// Event name shown on pages
    #[serde(default = "default_event_name")]
    pub event_name: String,
}

fn default_event_name() -> String {
    "Securinets ENIT".to_string()
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub endpoint: String,
    /// Server port
    pub port: u16,
}

/// Hosted backend (auth + table API) configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Public anon key
    pub anon_key: String,
    /// Service-role key, needed to roll back a half-finished sign-up
    #[serde(default)]
    pub service_role_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

/// Public registration configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistrationConfig {
    /// Registration closes at this instant; open forever when unset
    #[serde(default)]
    pub closes_at: Option<DateTime<Utc>>,
    /// Prefix of the exported CSV filename
    #[serde(default = "default_export_prefix")]
    pub export_prefix: String,
}

fn default_export_prefix() -> String {
    "securinets-registrations".to_string()
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            closes_at: None,
            export_prefix: default_export_prefix(),
        }
    }
}

/// Admin dashboard configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdminConfig {
    /// Name of the session cookie
    pub session_cookie: String,
    /// Session lifetime in seconds
    pub session_ttl_secs: u64,
    /// Minimum admin password length accepted by the login form
    pub min_password_length: usize,
    /// How often expired sessions are purged, in seconds
    pub cleanup_interval_secs: u64,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            session_cookie: "securinets_admin".to_string(),
            session_ttl_secs: 3600,
            min_password_length: 8,
            cleanup_interval_secs: 300,
            secure_cookie: false,
        }
    }
}

impl AdminConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Fixed-window rate limit
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WindowLimit {
    /// Attempts allowed per window
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

/// Rate limiting configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimits {
    /// Registration attempts per email
    pub registration: WindowLimit,
    /// Admin login attempts per email
    pub admin_login: WindowLimit,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            registration: WindowLimit {
                max_attempts: 5,
                window_secs: 600,
            },
            admin_login: WindowLimit {
                max_attempts: 5,
                window_secs: 300,
            },
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Application configuration settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Application metadata
    pub application: Application,
    /// HTTP server
    pub server: ServerConfig,
    /// Hosted backend
    pub backend: BackendConfig,
    /// Public registration
    #[serde(default)]
    pub registration: RegistrationConfig,
    /// Admin dashboard
    #[serde(default)]
    pub admin: AdminConfig,
    /// Rate limiting
    #[serde(default)]
    pub rate_limits: RateLimits,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Missing required config value: {0}")]
    MissingConfig(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl Config {
    /// Creates a new Config instance from the default location.
    ///
    /// # Configuration Sources
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Base configuration (`config/application.yml`)
    /// 2. Environment variables (prefixed with `APP_`)
    ///
    /// # Errors
    /// Returns a `ConfigError` if:
    /// - Required configuration files cannot be read
    /// - Configuration values cannot be parsed
    /// - The hosted backend URL or anon key is missing
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from `path`, then applies `APP_` environment overrides.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let builder = ConfigFile::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config: Config = builder
            .build()?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from an in-memory YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = ConfigFile::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::MissingConfig("backend.url".to_string()));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::MissingConfig("backend.anon_key".to_string()));
        }
        Ok(())
    }

    /// `endpoint:port` the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.endpoint, self.server.port)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_yaml_str(
        r#"
application:
  name: securinets-registration
server:
  endpoint: 127.0.0.1
  port: 8080
backend:
  url: http://backend.test
  anon_key: anon
"#,
    )
    .expect("test config parses")
}
