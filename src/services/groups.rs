// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process groups and membership synchronization.
//!
//! When a group's member list changes, assigned processes of that group get
//! notification plans for new members (future occurrences only) and lose the
//! future plans of removed members. Past plans stay as history.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{new_id, ProcessGroup, ProcessStatus};
use crate::services::processes::{build_notification_plans, ProcessService};
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

/// Create/update body for a group.
///
/// On update, an absent `user_ids` leaves the member list as it is.
#[derive(Debug, Deserialize, Validate)]
pub struct GroupInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub user_ids: Option<Vec<String>>,
}

/// Body of a membership replacement.
#[derive(Debug, Deserialize, Validate)]
pub struct MembersInput {
    #[validate(length(max = 1000))]
    pub user_ids: Vec<String>,
}

/// Difference between two member lists.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct MembershipDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipDiff {
    pub fn compute(old: &[String], new: &[String]) -> Self {
        let old_set: HashSet<&String> = old.iter().collect();
        let new_set: HashSet<&String> = new.iter().collect();

        Self {
            added: dedup(new.iter().filter(|id| !old_set.contains(id)).cloned()),
            removed: dedup(old.iter().filter(|id| !new_set.contains(id)).cloned()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Remove duplicates, keeping the first occurrence.
pub fn dedup(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub processes_synced: usize,
    pub notifications_created: usize,
    pub notifications_deleted: usize,
}

/// Group management service.
#[derive(Clone)]
pub struct GroupService {
    db: FirestoreDb,
    processes: ProcessService,
}

impl GroupService {
    pub fn new(db: FirestoreDb, processes: ProcessService) -> Self {
        Self { db, processes }
    }

    pub async fn create(&self, input: &GroupInput) -> Result<ProcessGroup> {
        let user_ids = dedup(input.user_ids.iter().flatten().cloned());
        self.ensure_users_exist(&user_ids).await?;

        let now = now_rfc3339();
        let group = ProcessGroup {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            user_ids,
            created_at: now.clone(),
            updated_at: now,
        };
        self.db.set_group(&group).await?;

        tracing::info!(group_id = %group.id, members = group.user_ids.len(), "Group created");
        Ok(group)
    }

    /// Update name/description and, when given, members.
    pub async fn update(&self, id: &str, input: &GroupInput) -> Result<(ProcessGroup, SyncReport)> {
        let mut group = self.get(id).await?;
        group.name = input.name.trim().to_string();
        group.description = input.description.clone();

        match &input.user_ids {
            Some(user_ids) => self.replace_members(group, user_ids).await,
            None => {
                group.updated_at = now_rfc3339();
                self.db.set_group(&group).await?;
                tracing::info!(group_id = %group.id, "Group renamed");
                Ok((group, SyncReport::default()))
            }
        }
    }

    /// Replace the member list, synchronizing notifications.
    pub async fn sync_members(
        &self,
        id: &str,
        user_ids: &[String],
    ) -> Result<(ProcessGroup, SyncReport)> {
        let group = self.get(id).await?;
        self.replace_members(group, user_ids).await
    }

    /// Delete a group with its processes and their notification plans.
    pub async fn delete(&self, id: &str) -> Result<usize> {
        self.get(id).await?;

        let processes = self.db.processes_for_group(id).await?;
        let deleted = self.processes.delete_all(&processes).await?;
        self.db.delete_group(id).await?;

        tracing::info!(group_id = id, processes = deleted, "Group deleted");
        Ok(deleted)
    }

    async fn get(&self, id: &str) -> Result<ProcessGroup> {
        self.db
            .get_group(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {}", id)))
    }

    async fn replace_members(
        &self,
        mut group: ProcessGroup,
        user_ids: &[String],
    ) -> Result<(ProcessGroup, SyncReport)> {
        let new_members = dedup(user_ids.iter().cloned());
        let diff = MembershipDiff::compute(&group.user_ids, &new_members);
        self.ensure_users_exist(&diff.added).await?;

        group.user_ids = new_members;
        group.updated_at = now_rfc3339();
        self.db.set_group(&group).await?;

        let report = if diff.is_empty() {
            SyncReport::default()
        } else {
            self.sync_notifications(&group.id, diff).await?
        };

        tracing::info!(
            group_id = %group.id,
            added = report.added.len(),
            removed = report.removed.len(),
            created = report.notifications_created,
            deleted = report.notifications_deleted,
            "Group membership synchronized"
        );

        Ok((group, report))
    }

    async fn sync_notifications(&self, group_id: &str, diff: MembershipDiff) -> Result<SyncReport> {
        let now = Utc::now();
        let now_str = format_utc_rfc3339(now);
        let removed: HashSet<&String> = diff.removed.iter().collect();

        let mut report = SyncReport::default();

        let processes = self.db.processes_for_group(group_id).await?;
        for process in processes
            .iter()
            .filter(|p| p.status == ProcessStatus::Assigned)
        {
            if !diff.added.is_empty() {
                let occurrences = process.future_occurrences(self.processes.offset(), now);
                let plans = build_notification_plans(process, &diff.added, &occurrences, &now_str);
                self.db.batch_set_notification_plans(&plans).await?;
                report.notifications_created += plans.len();
            }

            if !removed.is_empty() {
                let stale: Vec<String> = self
                    .db
                    .notification_plans_for_process(&process.id)
                    .await?
                    .into_iter()
                    .filter(|n| removed.contains(&n.user_id) && n.scheduled_at > now_str)
                    .map(|n| n.id)
                    .collect();
                self.db.delete_notification_plans(&stale).await?;
                report.notifications_deleted += stale.len();
            }

            report.processes_synced += 1;
        }

        report.added = diff.added;
        report.removed = diff.removed;
        Ok(report)
    }

    async fn ensure_users_exist(&self, user_ids: &[String]) -> Result<()> {
        let users = self.db.get_users(user_ids).await?;
        let missing: Vec<&str> = user_ids
            .iter()
            .zip(users.iter())
            .filter(|(_, user)| user.is_none())
            .map(|(id, _)| id.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Unknown users: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_added_and_removed() {
        let diff = MembershipDiff::compute(&ids(&["a", "b", "c"]), &ids(&["b", "d", "c", "e"]));
        assert_eq!(diff.added, ids(&["d", "e"]));
        assert_eq!(diff.removed, ids(&["a"]));
    }

    #[test]
    fn test_diff_same_members_is_empty() {
        let diff = MembershipDiff::compute(&ids(&["a", "b"]), &ids(&["b", "a"]));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_deduplicates_new_members() {
        let diff = MembershipDiff::compute(&ids(&[]), &ids(&["x", "x", "y"]));
        assert_eq!(diff.added, ids(&["x", "y"]));
    }

    #[test]
    fn test_group_input_without_members() {
        let input: GroupInput = serde_json::from_str(r#"{"name":"Renamed"}"#).unwrap();
        assert_eq!(input.user_ids, None);
        assert!(input.validate().is_ok());

        let input: GroupInput =
            serde_json::from_str(r#"{"name":"Renamed","user_ids":[]}"#).unwrap();
        assert_eq!(input.user_ids, Some(Vec::new()));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        assert_eq!(dedup(ids(&["c", "a", "c", "b", "a"])), ids(&["c", "a", "b"]));
    }
}
