// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routes for authenticated app users.

use crate::db::HistoryQuery;
use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthUser;
use crate::models::{
    new_id, Activity, Category, ExerciseHistory, Motivo, NotificationPlan, Pause, Process,
    ProcessStatus, User,
};
use crate::response::{ApiResponse, CreatedId};
use crate::routes::admin::history_bounds;
use crate::services::catalog::PlanDetail;
use crate::time_utils::{format_utc_rfc3339, now_rfc3339, parse_rfc3339, today_in};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

const USER_HISTORY_LIMIT: u32 = 200;

/// User routes. The auth middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/me", get(get_me))
        .route("/user/fcm-token", put(set_fcm_token))
        .route("/user/plans", get(get_plans))
        .route("/user/activities/{id}", get(get_activity))
        .route("/user/categories", get(list_categories))
        .route("/user/history", get(list_history).post(record_history))
        .route("/user/motivos", get(list_motivos))
        .route("/user/pauses", post(record_pause))
        .route("/user/notifications", get(list_notifications))
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<User>> {
    let profile = state.users.get(&user.user_id).await?;
    Ok(ApiResponse::ok("Profile", profile))
}

#[derive(Debug, Deserialize, Validate)]
pub struct FcmTokenRequest {
    /// `null` unregisters the device
    #[validate(length(min = 1, max = 4096))]
    pub fcm_token: Option<String>,
}

async fn set_fcm_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<FcmTokenRequest>,
) -> Result<ApiResponse<User>> {
    let profile = state
        .users
        .set_fcm_token(&user.user_id, body.fcm_token)
        .await?;
    tracing::debug!(uid = %user.user_id, registered = profile.fcm_token.is_some(), "FCM token updated");
    Ok(ApiResponse::ok("FCM token updated", profile))
}

// ─── Plans & catalog ─────────────────────────────────────────

/// A process active today, with its plan expanded.
#[derive(Serialize)]
pub struct UserAssignment {
    pub process: Process,
    pub plan: PlanDetail,
}

async fn get_plans(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<UserAssignment>>> {
    let today = today_in(state.processes.offset(), Utc::now());

    let mut active: Vec<Process> = Vec::new();
    for group in state.db.groups_for_user(&user.user_id).await? {
        active.extend(
            state
                .db
                .processes_for_group(&group.id)
                .await?
                .into_iter()
                .filter(|p| p.status == ProcessStatus::Assigned && p.is_active_on(today)),
        );
    }
    active.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));

    let mut assignments = Vec::with_capacity(active.len());
    for process in active {
        let Some(plan) = state.db.get_plan(&process.plan_id).await? else {
            tracing::warn!(process_id = %process.id, plan_id = %process.plan_id, "Assigned process references missing plan");
            continue;
        };
        let plan = state.catalog.plan_detail(plan).await?;
        assignments.push(UserAssignment { process, plan });
    }

    Ok(ApiResponse::ok("Active plans", assignments))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Activity>> {
    let activity = state.catalog.get_activity(&id).await?;
    Ok(ApiResponse::ok("Activity", activity))
}

async fn list_categories(State(state): State<Arc<AppState>>) -> Result<ApiResponse<Vec<Category>>> {
    let categories = state.db.list_categories().await?;
    Ok(ApiResponse::ok("Categories", categories))
}

// ─── History ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct HistoryRequest {
    #[validate(length(min = 1, max = 128))]
    pub activity_id: String,
    pub plan_id: Option<String>,
    pub process_id: Option<String>,
    #[validate(range(min = 1, max = 86400))]
    pub duration_seconds: Option<u32>,
    /// Defaults to now
    pub completed_at: Option<String>,
}

async fn record_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<HistoryRequest>,
) -> Result<ApiResponse<CreatedId>> {
    if state.db.get_activity(&body.activity_id).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "Unknown activity: {}",
            body.activity_id
        )));
    }

    let completed_at = match body.completed_at.as_deref() {
        Some(raw) => parse_rfc3339(raw)
            .map(format_utc_rfc3339)
            .ok_or_else(|| AppError::BadRequest("Invalid 'completed_at'".to_string()))?,
        None => now_rfc3339(),
    };

    let entry = ExerciseHistory {
        id: new_id(),
        user_id: user.user_id.clone(),
        activity_id: body.activity_id,
        plan_id: body.plan_id,
        process_id: body.process_id,
        duration_seconds: body.duration_seconds,
        completed_at,
    };
    state.db.add_history(&entry).await?;

    tracing::info!(uid = %user.user_id, activity_id = %entry.activity_id, "Exercise recorded");
    Ok(ApiResponse::created("Exercise recorded", CreatedId { id: entry.id }))
}

#[derive(Deserialize)]
struct HistoryParams {
    from: Option<String>,
    to: Option<String>,
}

async fn list_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<HistoryParams>,
) -> Result<ApiResponse<Vec<ExerciseHistory>>> {
    let (from, to) = history_bounds(params.from.as_deref(), params.to.as_deref())?;
    let items = state
        .db
        .query_history(&HistoryQuery {
            user_id: Some(user.user_id),
            from,
            to,
            limit: USER_HISTORY_LIMIT,
            offset: 0,
        })
        .await?;
    Ok(ApiResponse::ok("History", items))
}

// ─── Pauses ──────────────────────────────────────────────────

async fn list_motivos(State(state): State<Arc<AppState>>) -> Result<ApiResponse<Vec<Motivo>>> {
    let motivos = state
        .db
        .list_motivos()
        .await?
        .into_iter()
        .filter(|m| m.active)
        .collect();
    Ok(ApiResponse::ok("Motivos", motivos))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PauseRequest {
    #[validate(length(min = 1, max = 128))]
    pub motivo_id: String,
    pub activity_id: Option<String>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

async fn record_pause(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<PauseRequest>,
) -> Result<ApiResponse<CreatedId>> {
    match state.db.get_motivo(&body.motivo_id).await? {
        Some(motivo) if motivo.active => {}
        _ => {
            return Err(AppError::BadRequest(format!(
                "Unknown or inactive motivo: {}",
                body.motivo_id
            )))
        }
    }

    let pause = Pause {
        id: new_id(),
        user_id: user.user_id.clone(),
        motivo_id: body.motivo_id,
        activity_id: body.activity_id,
        note: body.note.filter(|n| !n.trim().is_empty()),
        created_at: now_rfc3339(),
    };
    state.db.add_pause(&pause).await?;

    tracing::info!(uid = %user.user_id, motivo_id = %pause.motivo_id, "Pause recorded");
    Ok(ApiResponse::created("Pause recorded", CreatedId { id: pause.id }))
}

// ─── Notifications ───────────────────────────────────────────

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<NotificationPlan>>> {
    let upcoming = state
        .db
        .upcoming_notification_plans(&user.user_id, &now_rfc3339())
        .await?;
    Ok(ApiResponse::ok("Upcoming notifications", upcoming))
}
