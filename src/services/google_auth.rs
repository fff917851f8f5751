// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2 access tokens for Google APIs (Drive, Cloud Messaging).
//!
//! With a configured service account, tokens are minted through the
//! JWT-bearer grant (RS256 assertion signed with the account's key).
//! Otherwise the Cloud Run / GCE metadata server is asked for a token of the
//! attached service account.

use crate::config::ServiceAccount;
use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime requested for self-signed assertions (Google caps it at 1h).
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

pub const SCOPE_DRIVE: &str = "https://www.googleapis.com/auth/drive";
pub const SCOPE_FIREBASE_MESSAGING: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Cached access token with expiry information.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
enum Credentials {
    ServiceAccount(ServiceAccount),
    Metadata,
    /// Fixed token, used by tests and local tooling.
    Static(String),
}

/// Access-token provider shared by every Google API client.
#[derive(Clone)]
pub struct GoogleAuth {
    http: reqwest::Client,
    credentials: Credentials,
    /// Cached tokens keyed by scope.
    cache: Arc<DashMap<String, CachedToken>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl GoogleAuth {
    /// Use the service account if configured, the metadata server otherwise.
    pub fn new(service_account: Option<ServiceAccount>) -> Self {
        let credentials = match service_account {
            Some(account) => {
                tracing::info!(client_email = %account.client_email, "Using service account credentials");
                Credentials::ServiceAccount(account)
            }
            None => {
                tracing::info!("Using metadata server credentials");
                Credentials::Metadata
            }
        };

        Self {
            http: reqwest::Client::new(),
            credentials,
            cache: Arc::new(DashMap::new()),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Provider that always returns the same token.
    pub fn new_static(token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: Credentials::Static(token.to_string()),
            cache: Arc::new(DashMap::new()),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get a valid access token for `scope`, refreshing when close to expiry.
    pub async fn access_token(&self, scope: &str) -> Result<String, AppError> {
        if let Some(token) = self.cached(scope) {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we were waiting.
        if let Some(token) = self.cached(scope) {
            return Ok(token);
        }

        let response = match &self.credentials {
            Credentials::ServiceAccount(account) => self.exchange_assertion(account, scope).await?,
            Credentials::Metadata => self.fetch_from_metadata(scope).await?,
            Credentials::Static(token) => return Ok(token.clone()),
        };

        let expires_at = Utc::now() + Duration::seconds(response.expires_in);
        self.cache.insert(
            scope.to_string(),
            CachedToken {
                access_token: response.access_token.clone(),
                expires_at,
            },
        );
        tracing::debug!(scope, %expires_at, "Google access token refreshed");

        Ok(response.access_token)
    }

    fn cached(&self, scope: &str) -> Option<String> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        self.cache
            .get(scope)
            .filter(|cached| Utc::now() + margin < cached.expires_at)
            .map(|cached| cached.access_token.clone())
    }

    async fn exchange_assertion(
        &self,
        account: &ServiceAccount,
        scope: &str,
    ) -> Result<TokenResponse, AppError> {
        let assertion = sign_assertion(account, scope, Utc::now())?;

        let response = self
            .http
            .post(TOKEN_URI)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Token request failed: {}", e)))?;

        parse_token_response(response).await
    }

    async fn fetch_from_metadata(&self, scope: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .query(&[("scopes", scope)])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Metadata token request failed: {}", e)))?;

        parse_token_response(response).await
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!(
            "Token endpoint returned HTTP {}: {}",
            status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Invalid token response: {}", e)))
}

/// Build the RS256-signed assertion for the JWT-bearer grant.
fn sign_assertion(
    account: &ServiceAccount,
    scope: &str,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &account.client_email,
        scope,
        aud: TOKEN_URI,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid service account key: {}", e)))?;

    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign assertion: {}", e)))
}
