// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise catalog: categories, activities and plans.
//!
//! Deletes cascade downwards, sequentially and without rollback:
//! category → its activities → their entries in plans (and Drive videos);
//! plan → its processes → their notification plans.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{new_id, Activity, Category, Plan};
use crate::services::drive::DriveService;
use crate::services::processes::ProcessService;
use crate::time_utils::now_rfc3339;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Maximum number of activities in one plan.
pub const MAX_PLAN_ACTIVITIES: usize = 50;

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ActivityInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 128))]
    pub category_id: String,
    #[validate(range(min = 10, max = 3600))]
    pub duration_seconds: u32,
    #[validate(length(max = 30))]
    #[serde(default)]
    pub instructions: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlanInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub activity_ids: Vec<String>,
}

/// A plan with its activities resolved, in plan order.
#[derive(Debug, Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: Plan,
    pub activities: Vec<Activity>,
    /// Sum of the activities' durations
    pub total_duration_seconds: u32,
}

#[derive(Debug, Default, Serialize)]
pub struct CascadeReport {
    pub activities_deleted: usize,
    pub plans_updated: usize,
    pub processes_deleted: usize,
}

/// Catalog management service.
#[derive(Clone)]
pub struct CatalogService {
    db: FirestoreDb,
    drive: DriveService,
    processes: ProcessService,
}

impl CatalogService {
    pub fn new(db: FirestoreDb, drive: DriveService, processes: ProcessService) -> Self {
        Self {
            db,
            drive,
            processes,
        }
    }

    // ─── Categories ──────────────────────────────────────────────

    pub async fn get_category(&self, id: &str) -> Result<Category> {
        self.db
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {}", id)))
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category> {
        let category = Category {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            created_at: now_rfc3339(),
        };
        self.db.set_category(&category).await?;
        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    pub async fn update_category(&self, id: &str, input: &CategoryInput) -> Result<Category> {
        let mut category = self.get_category(id).await?;
        category.name = input.name.trim().to_string();
        category.description = input.description.clone();
        self.db.set_category(&category).await?;
        Ok(category)
    }

    /// Delete a category and every activity in it.
    pub async fn delete_category(&self, id: &str) -> Result<CascadeReport> {
        self.get_category(id).await?;

        let mut report = CascadeReport::default();
        for activity in self.db.list_activities(Some(id)).await? {
            report.plans_updated += self.remove_activity(&activity).await?;
            report.activities_deleted += 1;
        }
        self.db.delete_category(id).await?;

        tracing::info!(
            category_id = id,
            activities = report.activities_deleted,
            plans = report.plans_updated,
            "Category deleted"
        );
        Ok(report)
    }

    // ─── Activities ──────────────────────────────────────────────

    pub async fn get_activity(&self, id: &str) -> Result<Activity> {
        self.db
            .get_activity(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", id)))
    }

    pub async fn create_activity(&self, input: &ActivityInput) -> Result<Activity> {
        self.ensure_category(&input.category_id).await?;

        let now = now_rfc3339();
        let activity = Activity {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            category_id: input.category_id.clone(),
            duration_seconds: input.duration_seconds,
            instructions: input.instructions.clone(),
            video_url: None,
            video_file_id: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.db.set_activity(&activity).await?;
        tracing::info!(activity_id = %activity.id, "Activity created");
        Ok(activity)
    }

    pub async fn update_activity(&self, id: &str, input: &ActivityInput) -> Result<Activity> {
        let mut activity = self.get_activity(id).await?;
        if activity.category_id != input.category_id {
            self.ensure_category(&input.category_id).await?;
        }

        activity.name = input.name.trim().to_string();
        activity.description = input.description.clone();
        activity.category_id = input.category_id.clone();
        activity.duration_seconds = input.duration_seconds;
        activity.instructions = input.instructions.clone();
        activity.updated_at = now_rfc3339();
        self.db.set_activity(&activity).await?;
        Ok(activity)
    }

    /// Delete an activity, removing it from every plan.
    pub async fn delete_activity(&self, id: &str) -> Result<CascadeReport> {
        let activity = self.get_activity(id).await?;
        let plans_updated = self.remove_activity(&activity).await?;
        Ok(CascadeReport {
            activities_deleted: 1,
            plans_updated,
            processes_deleted: 0,
        })
    }

    /// Store a new video for an activity, replacing any previous one.
    pub async fn attach_video(
        &self,
        id: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<Activity> {
        let mut activity = self.get_activity(id).await?;

        let file_name = format!("{}-{}", activity.id, slug(&activity.name));
        let file = self.drive.upload_video(&file_name, content_type, data).await?;

        // The old file goes only once the activity points at the new one.
        let previous = activity.video_file_id.replace(file.id.clone());
        activity.video_url = Some(file.public_url());
        activity.updated_at = now_rfc3339();
        self.db.set_activity(&activity).await?;

        if let Some(previous) = previous {
            self.delete_video_best_effort(&activity.id, &previous).await;
        }

        Ok(activity)
    }

    /// Remove an activity's video.
    pub async fn detach_video(&self, id: &str) -> Result<Activity> {
        let mut activity = self.get_activity(id).await?;
        let file_id = activity
            .video_file_id
            .take()
            .ok_or_else(|| AppError::NotFound(format!("Video for activity {}", id)))?;

        self.drive.delete_file(&file_id).await?;

        activity.video_url = None;
        activity.updated_at = now_rfc3339();
        self.db.set_activity(&activity).await?;
        Ok(activity)
    }

    /// Remove `activity` from plans, drop its video, delete it.
    /// Returns the number of plans rewritten.
    async fn remove_activity(&self, activity: &Activity) -> Result<usize> {
        let mut plans = self.db.plans_containing_activity(&activity.id).await?;
        for plan in plans.iter_mut() {
            plan.remove_activity(&activity.id);
            plan.updated_at = now_rfc3339();
            self.db.set_plan(plan).await?;
        }

        if let Some(file_id) = &activity.video_file_id {
            self.delete_video_best_effort(&activity.id, file_id).await;
        }

        self.db.delete_activity(&activity.id).await?;
        tracing::info!(activity_id = %activity.id, plans = plans.len(), "Activity deleted");
        Ok(plans.len())
    }

    async fn delete_video_best_effort(&self, activity_id: &str, file_id: &str) {
        if let Err(e) = self.drive.delete_file(file_id).await {
            tracing::warn!(activity_id, file_id, error = %e, "Failed to delete video from Drive");
        }
    }

    async fn ensure_category(&self, category_id: &str) -> Result<()> {
        match self.db.get_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::BadRequest(format!(
                "Unknown category: {}",
                category_id
            ))),
        }
    }

    // ─── Plans ───────────────────────────────────────────────────

    pub async fn get_plan(&self, id: &str) -> Result<Plan> {
        self.db
            .get_plan(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {}", id)))
    }

    /// Resolve a plan's activities in order. Dangling IDs are skipped.
    pub async fn plan_detail(&self, plan: Plan) -> Result<PlanDetail> {
        let activities: Vec<Activity> = self
            .db
            .get_activities(&plan.activity_ids)
            .await?
            .into_iter()
            .flatten()
            .collect();
        let total_duration_seconds = activities.iter().map(|a| a.duration_seconds).sum();

        Ok(PlanDetail {
            plan,
            activities,
            total_duration_seconds,
        })
    }

    pub async fn create_plan(&self, input: &PlanInput) -> Result<Plan> {
        self.ensure_activities(&input.activity_ids).await?;

        let now = now_rfc3339();
        let plan = Plan {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            activity_ids: input.activity_ids.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.db.set_plan(&plan).await?;
        tracing::info!(plan_id = %plan.id, activities = plan.activity_ids.len(), "Plan created");
        Ok(plan)
    }

    pub async fn update_plan(&self, id: &str, input: &PlanInput) -> Result<Plan> {
        let mut plan = self.get_plan(id).await?;
        self.ensure_activities(&input.activity_ids).await?;

        plan.name = input.name.trim().to_string();
        plan.description = input.description.clone();
        plan.activity_ids = input.activity_ids.clone();
        plan.updated_at = now_rfc3339();
        self.db.set_plan(&plan).await?;
        Ok(plan)
    }

    /// Delete a plan with the processes scheduling it.
    pub async fn delete_plan(&self, id: &str) -> Result<CascadeReport> {
        self.get_plan(id).await?;

        let processes = self.db.processes_for_plan(id).await?;
        let processes_deleted = self.processes.delete_all(&processes).await?;
        self.db.delete_plan(id).await?;

        tracing::info!(plan_id = id, processes = processes_deleted, "Plan deleted");
        Ok(CascadeReport {
            processes_deleted,
            ..Default::default()
        })
    }

    async fn ensure_activities(&self, activity_ids: &[String]) -> Result<()> {
        if activity_ids.len() > MAX_PLAN_ACTIVITIES {
            return Err(AppError::BadRequest(format!(
                "A plan holds at most {} activities",
                MAX_PLAN_ACTIVITIES
            )));
        }

        let found = self.db.get_activities(activity_ids).await?;
        if let Some((missing, _)) = activity_ids
            .iter()
            .zip(found.iter())
            .find(|(_, activity)| activity.is_none())
        {
            return Err(AppError::BadRequest(format!("Unknown activity: {}", missing)));
        }
        Ok(())
    }
}

/// File-name friendly version of a display name.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Neck Stretch (Level 2)"), "neck-stretch-level-2");
        assert_eq!(slug("  Ojos  "), "ojos");
    }

    #[test]
    fn test_activity_input_validation() {
        let input = ActivityInput {
            name: "Wrist circles".to_string(),
            description: String::new(),
            category_id: "cat".to_string(),
            duration_seconds: 5,
            instructions: vec![],
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("duration_seconds"));
    }

    #[test]
    fn test_plan_input_requires_activities() {
        let input = PlanInput {
            name: "Empty".to_string(),
            description: String::new(),
            activity_ids: vec![],
        };
        assert!(input.validate().is_err());
    }
}
