// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets that only one endpoint needs (app password, cron secret) are
//! optional here; the endpoint reports a configuration error when called
//! without them instead of refusing to start.

use std::env;

/// Default Whoop REST API origin.
pub const DEFAULT_WHOOP_API_URL: &str = "https://api.prod.whoop.com";
/// Default Whoop OAuth origin.
pub const DEFAULT_WHOOP_OAUTH_URL: &str = "https://api.prod.whoop.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Whoop OAuth client ID (public)
    pub whoop_client_id: String,
    /// Callback URL registered with Whoop
    pub whoop_redirect_uri: String,
    /// Whoop REST API origin (overridable for tests)
    pub whoop_api_url: String,
    /// Whoop OAuth origin (overridable for tests)
    pub whoop_oauth_url: String,
    /// Supabase project URL
    pub supabase_url: String,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// User whose wearable data is copied into daily summaries
    pub owner_user_id: Option<String>,
    /// Seconds before real expiry at which an access token is refreshed
    pub token_refresh_skew_secs: i64,
    /// Timeout for outbound HTTP calls
    pub http_timeout_secs: u64,

    // --- Secrets ---
    /// Whoop OAuth client secret
    pub whoop_client_secret: String,
    /// Supabase service-role key
    pub supabase_service_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for OAuth state parameters
    pub oauth_state_key: Vec<u8>,
    /// Password for the login endpoint
    pub app_password: Option<String>,
    /// Bearer secret for the cron endpoint
    pub cron_secret: Option<String>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            whoop_client_id: "test_client_id".to_string(),
            whoop_redirect_uri: "http://localhost:8080/auth/whoop/callback".to_string(),
            whoop_api_url: DEFAULT_WHOOP_API_URL.to_string(),
            whoop_oauth_url: DEFAULT_WHOOP_OAUTH_URL.to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            owner_user_id: Some("test-user".to_string()),
            token_refresh_skew_secs: crate::services::whoop::TOKEN_REFRESH_MARGIN_SECS,
            http_timeout_secs: 5,
            whoop_client_secret: "test_secret".to_string(),
            supabase_service_key: "test_service_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            app_password: Some("test_password".to_string()),
            cron_secret: Some("test_cron_secret".to_string()),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            whoop_client_id: required("WHOOP_CLIENT_ID")?,
            whoop_redirect_uri: required("WHOOP_REDIRECT_URI")?,
            whoop_api_url: env::var("WHOOP_API_URL")
                .unwrap_or_else(|_| DEFAULT_WHOOP_API_URL.to_string()),
            whoop_oauth_url: env::var("WHOOP_OAUTH_URL")
                .unwrap_or_else(|_| DEFAULT_WHOOP_OAUTH_URL.to_string()),
            supabase_url: required("SUPABASE_URL")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_or("PORT", 8080)?,
            owner_user_id: optional("OWNER_USER_ID"),
            token_refresh_skew_secs: parse_or(
                "WHOOP_REFRESH_SKEW_SECS",
                crate::services::whoop::TOKEN_REFRESH_MARGIN_SECS,
            )?,
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", 30)?,

            whoop_client_secret: required("WHOOP_CLIENT_SECRET")?,
            supabase_service_key: required("SUPABASE_SERVICE_KEY")?,
            jwt_signing_key: required("JWT_SIGNING_KEY")?.into_bytes(),
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
            app_password: optional("APP_PASSWORD"),
            cron_secret: optional("CRON_SECRET"),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name, raw)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
