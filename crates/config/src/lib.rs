use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// `AppConfig` holds all configuration parameters required by the application.
///
/// The configuration is loaded from environment variables (optionally via a
/// `.env` file) or uses default values if the variable is not set. Fields
/// include database, HTTP server, auth and upload settings. This struct is
/// deserializable via Serde.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    // --- Database settings ---
    /// Database hostname or service name (e.g. "postgres" in Docker Compose, "localhost" for local runs).
    pub db_host: String,
    /// Database port (default: 5432).
    pub db_port: u16,
    /// Database user.
    pub db_user: String,
    /// Database password.
    pub db_password: String,
    /// Database name.
    pub db_name: String,

    // --- HTTP server ---
    /// The port on which the HTTP server will listen.
    pub http_port: u16,
    /// Public base URL the API is reachable under; image URLs derive from it.
    pub api_base_url: String,

    // --- Shutdown timeout ---
    /// Graceful shutdown timeout (human-friendly format, e.g. "5s", "1m").
    #[serde(deserialize_with = "deserialize_duration")]
    pub shutdown_timeout: Duration,

    // --- Auth ---
    /// HMAC secret for signing JWT tokens.
    pub jwt_secret: String,
    /// Access token lifetime (human-friendly format, e.g. "1d").
    #[serde(deserialize_with = "deserialize_duration")]
    pub access_token_ttl: Duration,
    /// Refresh token lifetime (human-friendly format, e.g. "7d").
    #[serde(deserialize_with = "deserialize_duration")]
    pub refresh_token_ttl: Duration,
}

/// Custom deserializer for durations.
/// Accepts human-readable formats like "5s", "1m", "7d", etc.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let val = String::deserialize(deserializer)?;
    humantime::parse_duration(&val)
        .map_err(|e| D::Error::custom(format!("Invalid duration '{val}': {e}")))
}

impl AppConfig {
    /// Loads configuration from environment variables (and optionally from `.env` file).
    ///
    /// Fields not set via env will be filled with default values.
    ///
    /// # Errors
    /// Returns an error if environment variables are invalid or missing required values.
    pub fn load() -> Result<Self> {
        // Load from .env file (for Docker environment)
        dotenvy::dotenv().ok();

        // Note: These default values are for local development. Production
        // deployments must override them, jwt_secret in particular.
        let settings = config::Config::builder()
            // Database
            .set_default("db_host", "localhost")?
            .set_default("db_port", 5432)?
            .set_default("db_user", "storefront_user")?
            .set_default("db_password", "securepassword")?
            .set_default("db_name", "storefront_db")?
            // HTTP
            .set_default("http_port", 8000)?
            .set_default("api_base_url", "http://localhost:8000/api")?
            // Shutdown
            .set_default("shutdown_timeout", "5s")?
            // Auth
            .set_default("jwt_secret", "development-secret-change-me")?
            .set_default("access_token_ttl", "1d")?
            .set_default("refresh_token_ttl", "7d")?
            .add_source(config::Environment::default())
            .build()?;

        settings
            .try_deserialize()
            .context("Failed to load configuration")
    }
}
