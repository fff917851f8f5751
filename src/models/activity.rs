// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Exercise activity and category models.

use serde::{Deserialize, Serialize};

/// A micro-break exercise stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Document ID
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owning category (foreign key into `categories`)
    pub category_id: String,
    /// Expected duration of the exercise
    pub duration_seconds: u32,
    /// Step-by-step instructions
    #[serde(default)]
    pub instructions: Vec<String>,
    /// Public link to the hosted video
    #[serde(default)]
    pub video_url: Option<String>,
    /// Drive file ID of the hosted video
    #[serde(default)]
    pub video_file_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A category grouping activities (stretching, eyes, breathing, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
}
