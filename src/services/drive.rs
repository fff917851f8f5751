// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Drive v3 client for exercise video hosting.
//!
//! Upload is done in three calls: a media upload, a metadata patch (name and
//! parent folder), and a public `anyone:reader` permission so the app can
//! play the video without user credentials.

use crate::error::AppError;
use crate::services::google_auth::{GoogleAuth, SCOPE_DRIVE};
use axum::body::Bytes;
use serde::Deserialize;

const DRIVE_BASE_URL: &str = "https://www.googleapis.com";

/// A file stored in Drive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

impl DriveFile {
    /// Link handed out to clients.
    pub fn public_url(&self) -> String {
        self.web_view_link
            .clone()
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", self.id))
    }
}

/// Drive client.
#[derive(Clone)]
pub struct DriveService {
    http: reqwest::Client,
    auth: GoogleAuth,
    base_url: String,
    folder_id: Option<String>,
}

impl DriveService {
    pub fn new(auth: GoogleAuth, folder_id: Option<String>) -> Self {
        Self::with_base_url(auth, folder_id, DRIVE_BASE_URL)
    }

    pub fn with_base_url(auth: GoogleAuth, folder_id: Option<String>, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
            folder_id,
        }
    }

    /// Upload a video and make it publicly readable.
    pub async fn upload_video(
        &self,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<DriveFile, AppError> {
        let token = self.auth.access_token(SCOPE_DRIVE).await?;
        let size = data.len();

        // 1. Media upload
        let response = self
            .http
            .post(format!("{}/upload/drive/v3/files", self.base_url))
            .query(&[("uploadType", "media")])
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Drive upload failed: {}", e)))?;
        let uploaded: DriveFile = check_json(response).await?;

        // 2. Name it and move it into the configured folder
        let mut patch = self
            .http
            .patch(format!("{}/drive/v3/files/{}", self.base_url, uploaded.id))
            .query(&[("fields", "id,webViewLink")])
            .bearer_auth(&token)
            .json(&serde_json::json!({ "name": name }));
        if let Some(folder) = &self.folder_id {
            patch = patch.query(&[("addParents", folder.as_str())]);
        }
        let response = patch
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Drive metadata update failed: {}", e)))?;
        let file: DriveFile = check_json(response).await?;

        // 3. Public read access
        let response = self
            .http
            .post(format!(
                "{}/drive/v3/files/{}/permissions",
                self.base_url, file.id
            ))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Drive permission update failed: {}", e)))?;
        check_status(response).await?;

        tracing::info!(file_id = %file.id, size, "Video uploaded to Drive");
        Ok(file)
    }

    /// Delete a file. A file that is already gone counts as deleted.
    pub async fn delete_file(&self, file_id: &str) -> Result<(), AppError> {
        let token = self.auth.access_token(SCOPE_DRIVE).await?;

        let response = self
            .http
            .delete(format!(
                "{}/drive/v3/files/{}",
                self.base_url,
                urlencoding::encode(file_id)
            ))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Drive delete failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(file_id, "Drive file already deleted");
            return Ok(());
        }
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Upstream(format!("Drive HTTP {}: {}", status, body)))
}

async fn check_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!("Drive HTTP {}: {}", status, body)));
    }
    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Invalid Drive response: {}", e)))
}
