// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication REST client.
//!
//! Handles:
//! - Email/password sign-in (credential check for `/auth/login`)
//! - Account creation for admin-provisioned users

use crate::error::AppError;
use serde::{Deserialize, Serialize};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity confirmed by Firebase Auth.
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseIdentity {
    /// Firebase UID
    #[serde(rename = "localId")]
    pub uid: String,
    pub email: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Auth client.
#[derive(Clone)]
pub struct IdentityService {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityService {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, IDENTITY_TOOLKIT_URL)
    }

    /// Point the client at another endpoint (Auth emulator).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Verify an email/password pair.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<FirebaseIdentity, AppError> {
        self.post_password("accounts:signInWithPassword", email, password)
            .await
    }

    /// Create a new email/password account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<FirebaseIdentity, AppError> {
        let identity = self.post_password("accounts:signUp", email, password).await?;
        tracing::info!(uid = %identity.uid, "Firebase account created");
        Ok(identity)
    }

    async fn post_password(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<FirebaseIdentity, AppError> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Firebase Auth request failed: {}", e)))?;

        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::Upstream(format!("Invalid Firebase Auth response: {}", e)));
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(map_identity_error(&envelope.error.message)),
            Err(_) => Err(AppError::Upstream(format!("HTTP {}: {}", status, body))),
        }
    }
}

/// Map a Firebase Auth error code to an application error.
///
/// Codes may carry a suffix, e.g. `WEAK_PASSWORD : Password should be ...`.
fn map_identity_error(message: &str) -> AppError {
    let code = message.split(':').next().unwrap_or(message).trim();
    match code {
        "INVALID_LOGIN_CREDENTIALS" | "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" => {
            AppError::Unauthorized
        }
        "USER_DISABLED" => AppError::Forbidden("Account disabled".to_string()),
        "EMAIL_EXISTS" => AppError::Conflict("Email already registered".to_string()),
        "WEAK_PASSWORD" | "INVALID_EMAIL" | "MISSING_PASSWORD" => {
            AppError::BadRequest(message.to_string())
        }
        _ => AppError::Upstream(format!("Firebase Auth error: {}", message)),
    }
}
