// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes: users, motivos and reporting.

use crate::db::HistoryQuery;
use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::models::{new_id, ExerciseHistory, Motivo, NotificationPlan, Pause, User};
use crate::response::{ApiResponse, CreatedId};
use crate::services::users::{NewUserInput, UserDeletionReport};
use crate::services::CronReport;
use crate::time_utils::{now_rfc3339, parse_bound};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

const DEFAULT_HISTORY_LIMIT: u32 = 50;
const MAX_HISTORY_LIMIT: u32 = 200;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/{id}", get(get_user).delete(delete_user))
        .route("/admin/motivos", get(list_motivos).post(create_motivo))
        .route(
            "/admin/motivos/{id}",
            get(get_motivo).put(update_motivo).delete(delete_motivo),
        )
        .route("/admin/history", get(list_history))
        .route("/admin/pauses", get(list_pauses))
        .route("/admin/notification-plans", get(list_notification_plans))
        .route("/admin/notifications/run", post(run_notifications))
}

// ─── Users ───────────────────────────────────────────────────

async fn list_users(State(state): State<Arc<AppState>>) -> Result<ApiResponse<Vec<User>>> {
    let users = state.db.list_users().await?;
    Ok(ApiResponse::ok("Users", users))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<User>> {
    let user = state.users.get(&id).await?;
    Ok(ApiResponse::ok("User", user))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<NewUserInput>,
) -> Result<ApiResponse<CreatedId>> {
    let user = state.users.create(&body).await?;
    tracing::info!(uid = %user.id, "User created by admin");
    Ok(ApiResponse::created("User created", CreatedId { id: user.id }))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserDeletionReport>> {
    let report = state.users.delete(&id).await?;
    Ok(ApiResponse::ok("User deleted", report))
}

// ─── Motivos ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct MotivoInput {
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    #[serde(default)]
    pub active: Option<bool>,
}

async fn list_motivos(State(state): State<Arc<AppState>>) -> Result<ApiResponse<Vec<Motivo>>> {
    let motivos = state.db.list_motivos().await?;
    Ok(ApiResponse::ok("Motivos", motivos))
}

async fn find_motivo(state: &AppState, id: &str) -> Result<Motivo> {
    state
        .db
        .get_motivo(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Motivo {}", id)))
}

async fn get_motivo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Motivo>> {
    let motivo = find_motivo(&state, &id).await?;
    Ok(ApiResponse::ok("Motivo", motivo))
}

async fn create_motivo(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<MotivoInput>,
) -> Result<ApiResponse<CreatedId>> {
    let motivo = Motivo {
        id: new_id(),
        description: body.description.trim().to_string(),
        active: body.active.unwrap_or(true),
        created_at: now_rfc3339(),
    };
    state.db.set_motivo(&motivo).await?;
    Ok(ApiResponse::created("Motivo created", CreatedId { id: motivo.id }))
}

async fn update_motivo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<MotivoInput>,
) -> Result<ApiResponse<Motivo>> {
    let mut motivo = find_motivo(&state, &id).await?;
    motivo.description = body.description.trim().to_string();
    if let Some(active) = body.active {
        motivo.active = active;
    }
    state.db.set_motivo(&motivo).await?;
    Ok(ApiResponse::ok("Motivo updated", motivo))
}

async fn delete_motivo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>> {
    find_motivo(&state, &id).await?;
    state.db.delete_motivo(&id).await?;
    Ok(ApiResponse::message("Motivo deleted"))
}

// ─── History ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct HistoryParams {
    user_id: Option<String>,
    from: Option<String>,
    to: Option<String>,
    /// Opaque token from a previous page
    cursor: Option<String>,
    limit: Option<u32>,
}

#[derive(Serialize)]
pub struct HistoryPage {
    pub items: Vec<ExerciseHistory>,
    pub next_cursor: Option<String>,
}

fn encode_cursor(offset: u32) -> String {
    URL_SAFE_NO_PAD.encode(format!("o:{}", offset))
}

fn parse_cursor(cursor: Option<&str>) -> Result<u32> {
    let Some(raw) = cursor else {
        return Ok(0);
    };
    let invalid_cursor = || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

    let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
    let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;
    decoded_str
        .strip_prefix("o:")
        .and_then(|n| n.parse().ok())
        .ok_or_else(invalid_cursor)
}

/// Parse `from`/`to` into stored-timestamp bounds.
pub(crate) fn history_bounds(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(Option<String>, Option<String>)> {
    let from = from
        .map(|raw| {
            parse_bound(raw, false)
                .ok_or_else(|| AppError::BadRequest("Invalid 'from' parameter".to_string()))
        })
        .transpose()?;
    let to = to
        .map(|raw| {
            parse_bound(raw, true)
                .ok_or_else(|| AppError::BadRequest("Invalid 'to' parameter".to_string()))
        })
        .transpose()?;
    Ok((from, to))
}

async fn list_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<ApiResponse<HistoryPage>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let offset = parse_cursor(params.cursor.as_deref())?;
    let (from, to) = history_bounds(params.from.as_deref(), params.to.as_deref())?;

    tracing::debug!(
        user_id = ?params.user_id,
        offset,
        limit,
        "Listing exercise history"
    );

    // One extra row tells us whether another page exists.
    let mut items = state
        .db
        .query_history(&HistoryQuery {
            user_id: params.user_id,
            from,
            to,
            limit: limit + 1,
            offset,
        })
        .await?;

    let has_more = items.len() > limit as usize;
    items.truncate(limit as usize);
    let next_cursor = has_more.then(|| encode_cursor(offset + limit));

    Ok(ApiResponse::ok("History", HistoryPage { items, next_cursor }))
}

// ─── Pauses & notifications ──────────────────────────────────

#[derive(Deserialize)]
struct PauseParams {
    user_id: Option<String>,
}

async fn list_pauses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PauseParams>,
) -> Result<ApiResponse<Vec<Pause>>> {
    let pauses = state.db.list_pauses(params.user_id.as_deref()).await?;
    Ok(ApiResponse::ok("Pauses", pauses))
}

#[derive(Deserialize)]
struct NotificationPlanParams {
    process_id: Option<String>,
    user_id: Option<String>,
}

async fn list_notification_plans(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotificationPlanParams>,
) -> Result<ApiResponse<Vec<NotificationPlan>>> {
    let mut plans = match (params.process_id, params.user_id) {
        (Some(process_id), user_id) => state
            .db
            .notification_plans_for_process(&process_id)
            .await?
            .into_iter()
            .filter(|n| user_id.as_ref().is_none_or(|u| &n.user_id == u))
            .collect(),
        (None, Some(user_id)) => state.db.notification_plans_for_user(&user_id).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "One of 'process_id' or 'user_id' is required".to_string(),
            ))
        }
    };
    plans.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
    Ok(ApiResponse::ok("Notification plans", plans))
}

async fn run_notifications(State(state): State<Arc<AppState>>) -> Result<ApiResponse<CronReport>> {
    let report = state.cron.run_once(chrono::Utc::now()).await?;
    Ok(ApiResponse::ok("Notification run complete", report))
}
