// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Skipped-pause reasons and records.

use serde::{Deserialize, Serialize};

/// A reason an employee can give for skipping a pause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Motivo {
    pub id: String,
    pub description: String,
    /// Inactive reasons are hidden from users but kept for history
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: String,
}

fn default_active() -> bool {
    true
}

/// A skipped or postponed micro-break, with its reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pause {
    pub id: String,
    pub user_id: String,
    pub motivo_id: String,
    #[serde(default)]
    pub activity_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: String,
}
