// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

use serde::{Deserialize, Serialize};

/// A completed exercise, recorded by the user who did it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseHistory {
    pub id: String,
    pub user_id: String,
    pub activity_id: String,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub process_id: Option<String>,
    /// Actual time spent, if reported by the client
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    /// Completion timestamp (RFC3339, `Z` suffix)
    pub completed_at: String,
}
