// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables, so everything is read
//! once at startup and kept in memory.

use std::env;

/// Default interval between notification cron runs.
pub const DEFAULT_CRON_INTERVAL_SECS: u64 = 300;

/// Default offset of the wall-clock `scheduled_time` of processes (UTC-5).
pub const DEFAULT_SCHEDULE_UTC_OFFSET_MINUTES: i32 = -300;

/// Minimum accepted length of the JWT signing key.
const MIN_JWT_KEY_LEN: usize = 32;

/// Service account used to mint Google API access tokens.
#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Firebase / GCP project ID
    pub firebase_project_id: String,
    /// Firebase Web API key (used for the Auth REST API)
    pub firebase_api_key: String,
    /// Email of the single administrator account
    pub admin_email: String,
    /// Drive folder receiving exercise videos
    pub drive_folder_id: Option<String>,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// UTC offset (minutes) of process `scheduled_time` values
    pub schedule_utc_offset_minutes: i32,
    /// Seconds between in-process cron runs; 0 disables the loop
    pub notification_cron_interval_secs: u64,

    // --- Secrets ---
    /// Service account for Google APIs; metadata server is used when absent
    pub service_account: Option<ServiceAccount>,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Shared secret presented by the external scheduler
    pub cron_secret: String,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: "test-project".to_string(),
            firebase_api_key: "test_api_key".to_string(),
            admin_email: "admin@ecobreak.test".to_string(),
            drive_folder_id: None,
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            schedule_utc_offset_minutes: 0,
            notification_cron_interval_secs: 0,
            service_account: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            cron_secret: "test_cron_secret".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = required("JWT_SIGNING_KEY")?.into_bytes();
        if jwt_signing_key.len() < MIN_JWT_KEY_LEN {
            return Err(ConfigError::Invalid(
                "JWT_SIGNING_KEY",
                format!("must be at least {} bytes", MIN_JWT_KEY_LEN),
            ));
        }

        let service_account = match (
            env::var("FIREBASE_CLIENT_EMAIL").ok(),
            env::var("FIREBASE_PRIVATE_KEY").ok(),
        ) {
            (Some(client_email), Some(private_key)) => Some(ServiceAccount {
                client_email: client_email.trim().to_string(),
                private_key: unescape_private_key(&private_key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(
                    "FIREBASE_PRIVATE_KEY",
                    "FIREBASE_CLIENT_EMAIL and FIREBASE_PRIVATE_KEY must be set together"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            firebase_project_id: required("FIREBASE_PROJECT_ID")?,
            firebase_api_key: required("FIREBASE_API_KEY")?,
            admin_email: required("ADMIN_EMAIL")?.to_lowercase(),
            drive_folder_id: env::var("DRIVE_FOLDER_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_or("PORT", 8080)?,
            schedule_utc_offset_minutes: parse_or(
                "SCHEDULE_UTC_OFFSET_MINUTES",
                DEFAULT_SCHEDULE_UTC_OFFSET_MINUTES,
            )?,
            notification_cron_interval_secs: parse_or(
                "NOTIFICATION_CRON_INTERVAL_SECS",
                DEFAULT_CRON_INTERVAL_SECS,
            )?,
            service_account,
            jwt_signing_key,
            cron_secret: required("CRON_SECRET")?,
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

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("cannot parse '{}'", raw))),
        Err(_) => Ok(default),
    }
}

/// Private keys pasted into env files usually carry literal `\n` sequences.
fn unescape_private_key(raw: &str) -> String {
    raw.trim().trim_matches('"').replace("\\n", "\n")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
