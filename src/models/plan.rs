// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Exercise plan model.

use serde::{Deserialize, Serialize};

/// A named, ordered sequence of activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Activity IDs in execution order
    pub activity_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Plan {
    /// Remove every occurrence of an activity. Returns `true` if anything changed.
    pub fn remove_activity(&mut self, activity_id: &str) -> bool {
        let before = self.activity_ids.len();
        self.activity_ids.retain(|id| id != activity_id);
        self.activity_ids.len() != before
    }
}
