// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Cloud Messaging (HTTP v1) client.

use crate::services::google_auth::{GoogleAuth, SCOPE_FIREBASE_MESSAGING};
use serde::Serialize;
use std::collections::HashMap;

const FCM_BASE_URL: &str = "https://fcm.googleapis.com/v1";

/// A push notification addressed to one device.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Key/value payload delivered to the app
    pub data: HashMap<String, String>,
}

/// Push delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The device token is no longer valid and should be forgotten.
    #[error("Registration token is not registered")]
    Unregistered,

    /// Anything else; the send may succeed on a later attempt.
    #[error("Push send failed: {0}")]
    Transient(String),
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

/// Cloud Messaging client.
#[derive(Clone)]
pub struct PushService {
    http: reqwest::Client,
    auth: GoogleAuth,
    send_url: String,
}

impl PushService {
    pub fn new(project_id: &str, auth: GoogleAuth) -> Self {
        Self::with_base_url(project_id, auth, FCM_BASE_URL)
    }

    pub fn with_base_url(project_id: &str, auth: GoogleAuth, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            send_url: format!(
                "{}/projects/{}/messages:send",
                base_url.trim_end_matches('/'),
                project_id
            ),
        }
    }

    /// Send one notification to one device token.
    pub async fn send(&self, device_token: &str, message: &PushMessage) -> Result<(), PushError> {
        let access_token = self
            .auth
            .access_token(SCOPE_FIREBASE_MESSAGING)
            .await
            .map_err(|e| PushError::Transient(e.to_string()))?;

        let request = SendRequest {
            message: FcmMessage {
                token: device_token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
                data: &message.data,
            },
        };

        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::Transient(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body))
    }
}

/// Decide whether an FCM error means the token is dead.
fn classify_failure(status: u16, body: &str) -> PushError {
    let token_rejected = status == 404
        || body.contains("UNREGISTERED")
        || (status == 400 && body.contains("registration token"));

    if token_rejected {
        PushError::Unregistered
    } else {
        PushError::Transient(format!("HTTP {}: {}", status, body))
    }
}
