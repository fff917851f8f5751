// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin catalog routes: categories, activities, plans and videos.

use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::models::{Activity, Category, Plan};
use crate::response::{ApiResponse, CreatedId};
use crate::services::catalog::{
    ActivityInput, CascadeReport, CategoryInput, PlanDetail, PlanInput,
};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Largest accepted video upload.
pub const MAX_VIDEO_BYTES: usize = 200 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/admin/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route(
            "/admin/activities",
            get(list_activities).post(create_activity),
        )
        .route(
            "/admin/activities/{id}",
            get(get_activity)
                .put(update_activity)
                .delete(delete_activity),
        )
        .route(
            "/admin/activities/{id}/video",
            post(upload_video)
                .delete(delete_video)
                .layer(DefaultBodyLimit::max(MAX_VIDEO_BYTES)),
        )
        .route("/admin/plans", get(list_plans).post(create_plan))
        .route(
            "/admin/plans/{id}",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
}

// ─── Categories ──────────────────────────────────────────────

async fn list_categories(State(state): State<Arc<AppState>>) -> Result<ApiResponse<Vec<Category>>> {
    let categories = state.db.list_categories().await?;
    Ok(ApiResponse::ok("Categories", categories))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Category>> {
    let category = state.catalog.get_category(&id).await?;
    Ok(ApiResponse::ok("Category", category))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<CategoryInput>,
) -> Result<ApiResponse<CreatedId>> {
    let category = state.catalog.create_category(&body).await?;
    Ok(ApiResponse::created(
        "Category created",
        CreatedId { id: category.id },
    ))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<CategoryInput>,
) -> Result<ApiResponse<Category>> {
    let category = state.catalog.update_category(&id, &body).await?;
    Ok(ApiResponse::ok("Category updated", category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<CascadeReport>> {
    let report = state.catalog.delete_category(&id).await?;
    Ok(ApiResponse::ok("Category deleted", report))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivityFilter {
    category_id: Option<String>,
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ActivityFilter>,
) -> Result<ApiResponse<Vec<Activity>>> {
    let activities = state
        .db
        .list_activities(filter.category_id.as_deref())
        .await?;
    Ok(ApiResponse::ok("Activities", activities))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Activity>> {
    let activity = state.catalog.get_activity(&id).await?;
    Ok(ApiResponse::ok("Activity", activity))
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<ActivityInput>,
) -> Result<ApiResponse<CreatedId>> {
    let activity = state.catalog.create_activity(&body).await?;
    Ok(ApiResponse::created(
        "Activity created",
        CreatedId { id: activity.id },
    ))
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<ActivityInput>,
) -> Result<ApiResponse<Activity>> {
    let activity = state.catalog.update_activity(&id, &body).await?;
    Ok(ApiResponse::ok("Activity updated", activity))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<CascadeReport>> {
    let report = state.catalog.delete_activity(&id).await?;
    Ok(ApiResponse::ok("Activity deleted", report))
}

/// Raw request body is the video file.
async fn upload_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<Activity>> {
    let content_type = video_content_type(&headers)?;
    if body.is_empty() {
        return Err(AppError::BadRequest("Empty video body".to_string()));
    }

    tracing::info!(activity_id = %id, content_type, size = body.len(), "Uploading activity video");
    let activity = state.catalog.attach_video(&id, content_type, body).await?;
    Ok(ApiResponse::ok("Video uploaded", activity))
}

async fn delete_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Activity>> {
    let activity = state.catalog.detach_video(&id).await?;
    Ok(ApiResponse::ok("Video deleted", activity))
}

fn video_content_type(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.starts_with("video/"))
        .ok_or_else(|| AppError::BadRequest("Content-Type must be video/*".to_string()))
}

// ─── Plans ───────────────────────────────────────────────────

async fn list_plans(State(state): State<Arc<AppState>>) -> Result<ApiResponse<Vec<Plan>>> {
    let plans = state.db.list_plans().await?;
    Ok(ApiResponse::ok("Plans", plans))
}

async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<PlanDetail>> {
    let plan = state.catalog.get_plan(&id).await?;
    let detail = state.catalog.plan_detail(plan).await?;
    Ok(ApiResponse::ok("Plan", detail))
}

async fn create_plan(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<PlanInput>,
) -> Result<ApiResponse<CreatedId>> {
    let plan = state.catalog.create_plan(&body).await?;
    Ok(ApiResponse::created("Plan created", CreatedId { id: plan.id }))
}

async fn update_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<PlanInput>,
) -> Result<ApiResponse<Plan>> {
    let plan = state.catalog.update_plan(&id, &body).await?;
    Ok(ApiResponse::ok("Plan updated", plan))
}

async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<CascadeReport>> {
    let report = state.catalog.delete_plan(&id).await?;
    Ok(ApiResponse::ok("Plan deleted", report))
}
