// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process upload, assignment and revert.
//!
//! Handles the batch workflow:
//! 1. Upload: validate rows and store them as `uploaded` processes sharing a batch ID
//! 2. Assign: expand each process into per-user notification plans, mark `assigned`
//! 3. Revert: best-effort removal of everything a batch created
//!
//! None of these steps is transactional across collections. A failure part
//! way through leaves earlier writes in place; revert is the recovery path.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{new_id, NotificationPlan, Process, ProcessStatus};
use crate::time_utils::{format_utc_rfc3339, now_rfc3339, parse_date, parse_hhmm};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Longest allowed process, in calendar days counting both ends.
pub const MAX_PROCESS_SPAN_DAYS: i64 = 366;

/// One row of an upload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessRow {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 128))]
    pub plan_id: String,
    #[validate(length(min = 1, max = 128))]
    pub group_id: String,
    pub start_date: String,
    pub end_date: String,
    pub scheduled_time: String,
    #[serde(default)]
    pub include_weekends: bool,
}

impl ProcessRow {
    /// Check the fields a derive cannot express.
    pub fn check(&self) -> std::result::Result<(), String> {
        if let Err(errors) = self.validate() {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|f| f.to_string())
                .collect();
            fields.sort();
            return Err(format!("invalid {}", fields.join(", ")));
        }

        let start = parse_date(&self.start_date).ok_or("start_date must be YYYY-MM-DD")?;
        let end = parse_date(&self.end_date).ok_or("end_date must be YYYY-MM-DD")?;
        if end < start {
            return Err("end_date is before start_date".to_string());
        }
        if (end - start).num_days() + 1 > MAX_PROCESS_SPAN_DAYS {
            return Err(format!(
                "date range exceeds {} days",
                MAX_PROCESS_SPAN_DAYS
            ));
        }
        parse_hhmm(&self.scheduled_time).ok_or("scheduled_time must be HH:MM")?;
        Ok(())
    }
}

/// An upload request.
#[derive(Debug, Deserialize, Validate)]
pub struct UploadRequest {
    #[validate(length(min = 1, max = 500))]
    pub processes: Vec<ProcessRow>,
}

#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub batch_id: String,
    pub count: usize,
}

/// A process that could not be assigned.
#[derive(Debug, Serialize)]
pub struct AssignFailure {
    pub process_id: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct AssignReport {
    pub batch_id: String,
    pub assigned: u32,
    pub skipped: u32,
    pub failed: Vec<AssignFailure>,
    pub notifications_created: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct RevertReport {
    pub batch_id: String,
    pub processes_deleted: usize,
    pub notifications_deleted: usize,
    /// IDs of documents that could not be deleted
    pub failed: Vec<String>,
}

/// Expand occurrences into notification plans, one per (user, instant).
///
/// Document IDs are derived from process, user and instant, so writing the
/// same occurrence twice overwrites instead of duplicating.
pub fn build_notification_plans(
    process: &Process,
    user_ids: &[String],
    occurrences: &[DateTime<Utc>],
    created_at: &str,
) -> Vec<NotificationPlan> {
    user_ids
        .iter()
        .flat_map(|user_id| {
            occurrences.iter().map(move |at| NotificationPlan {
                id: format!("{}_{}_{}", process.id, user_id, at.timestamp()),
                process_id: process.id.clone(),
                batch_id: process.batch_id.clone(),
                plan_id: process.plan_id.clone(),
                user_id: user_id.clone(),
                scheduled_at: format_utc_rfc3339(*at),
                reminder_6h_sent: false,
                reminder_1h_sent: false,
                created_at: created_at.to_string(),
            })
        })
        .collect()
}

/// Process workflow service.
#[derive(Clone)]
pub struct ProcessService {
    db: FirestoreDb,
    offset: FixedOffset,
}

impl ProcessService {
    pub fn new(db: FirestoreDb, offset: FixedOffset) -> Self {
        Self { db, offset }
    }

    /// Offset applied to `scheduled_time` values.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Validate and store a batch. All rows must be valid.
    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadReport> {
        request.validate()?;

        let problems: Vec<String> = request
            .processes
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.check().err().map(|e| format!("row {}: {}", i, e)))
            .collect();
        if !problems.is_empty() {
            return Err(AppError::BadRequest(problems.join("; ")));
        }

        let batch_id = new_id();
        let now = now_rfc3339();
        let processes: Vec<Process> = request
            .processes
            .iter()
            .map(|row| Process {
                id: new_id(),
                batch_id: batch_id.clone(),
                name: row.name.trim().to_string(),
                plan_id: row.plan_id.clone(),
                group_id: row.group_id.clone(),
                start_date: row.start_date.clone(),
                end_date: row.end_date.clone(),
                scheduled_time: row.scheduled_time.clone(),
                include_weekends: row.include_weekends,
                status: ProcessStatus::Uploaded,
                created_at: now.clone(),
                assigned_at: None,
            })
            .collect();

        self.db.batch_set_processes(&processes).await?;

        tracing::info!(batch_id = %batch_id, count = processes.len(), "Process batch uploaded");

        Ok(UploadReport {
            batch_id,
            count: processes.len(),
        })
    }

    /// Generate notification plans for every uploaded process of a batch.
    pub async fn assign(&self, batch_id: &str) -> Result<AssignReport> {
        let processes = self.db.processes_in_batch(batch_id).await?;
        if processes.is_empty() {
            return Err(AppError::NotFound(format!("Batch {}", batch_id)));
        }

        let mut report = AssignReport {
            batch_id: batch_id.to_string(),
            ..Default::default()
        };

        for mut process in processes {
            if process.status == ProcessStatus::Assigned {
                report.skipped += 1;
                continue;
            }

            match self.assign_one(&mut process).await {
                Ok(created) => {
                    report.assigned += 1;
                    report.notifications_created += created;
                }
                Err(AppError::NotFound(reason)) | Err(AppError::BadRequest(reason)) => {
                    tracing::warn!(process_id = %process.id, reason = %reason, "Process not assigned");
                    report.failed.push(AssignFailure {
                        process_id: process.id.clone(),
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            batch_id,
            assigned = report.assigned,
            skipped = report.skipped,
            failed = report.failed.len(),
            notifications = report.notifications_created,
            "Process batch assigned"
        );

        Ok(report)
    }

    /// Assign one process. Returns the number of notification plans written.
    async fn assign_one(&self, process: &mut Process) -> Result<usize> {
        if self.db.get_plan(&process.plan_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Plan {}", process.plan_id)));
        }
        let group = self
            .db
            .get_group(&process.group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {}", process.group_id)))?;

        let occurrences = process.occurrences(self.offset);
        if occurrences.is_empty() {
            return Err(AppError::BadRequest(
                "Process has no occurrences".to_string(),
            ));
        }

        let now = now_rfc3339();
        let plans = build_notification_plans(process, &group.user_ids, &occurrences, &now);
        self.db.batch_set_notification_plans(&plans).await?;

        process.status = ProcessStatus::Assigned;
        process.assigned_at = Some(now);
        self.db.set_process(process).await?;

        Ok(plans.len())
    }

    /// Best-effort removal of a batch's notification plans and processes.
    pub async fn revert(&self, batch_id: &str) -> Result<RevertReport> {
        let processes = self.db.processes_in_batch(batch_id).await?;
        if processes.is_empty() {
            return Err(AppError::NotFound(format!("Batch {}", batch_id)));
        }

        let notification_ids: Vec<String> = self
            .db
            .notification_plans_for_batch(batch_id)
            .await?
            .into_iter()
            .map(|n| n.id)
            .collect();
        let process_ids: Vec<String> = processes.into_iter().map(|p| p.id).collect();

        // Notification plans go first: no plan may outlive its process.
        let failed_notifications = self
            .db
            .delete_notification_plans_each(&notification_ids)
            .await;
        let failed_processes = self.db.delete_processes_each(&process_ids).await;

        let report = RevertReport {
            batch_id: batch_id.to_string(),
            processes_deleted: process_ids.len() - failed_processes.len(),
            notifications_deleted: notification_ids.len() - failed_notifications.len(),
            failed: failed_notifications
                .into_iter()
                .chain(failed_processes)
                .collect(),
        };

        if report.failed.is_empty() {
            tracing::info!(
                batch_id,
                processes = report.processes_deleted,
                notifications = report.notifications_deleted,
                "Process batch reverted"
            );
        } else {
            tracing::warn!(
                batch_id,
                failed = report.failed.len(),
                "Process batch partially reverted"
            );
        }

        Ok(report)
    }

    /// Delete a process and its notification plans.
    pub async fn delete(&self, process_id: &str) -> Result<()> {
        if self.db.get_process(process_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Process {}", process_id)));
        }
        self.delete_cascade(process_id).await
    }

    /// Delete every process in `processes` with its notification plans.
    pub async fn delete_all(&self, processes: &[Process]) -> Result<usize> {
        for process in processes {
            self.delete_cascade(&process.id).await?;
        }
        Ok(processes.len())
    }

    async fn delete_cascade(&self, process_id: &str) -> Result<()> {
        let notification_ids: Vec<String> = self
            .db
            .notification_plans_for_process(process_id)
            .await?
            .into_iter()
            .map(|n| n.id)
            .collect();

        self.db.delete_notification_plans(&notification_ids).await?;
        self.db.delete_process(process_id).await?;

        tracing::debug!(
            process_id,
            notifications = notification_ids.len(),
            "Process deleted"
        );
        Ok(())
    }
}
