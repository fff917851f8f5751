// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes for process groups and process batches.

use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::models::{Process, ProcessGroup};
use crate::response::{ApiResponse, CreatedId};
use crate::services::groups::{GroupInput, MembersInput, SyncReport};
use crate::services::processes::{AssignReport, RevertReport, UploadReport, UploadRequest};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/process-groups", get(list_groups).post(create_group))
        .route(
            "/admin/process-groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/admin/process-groups/{id}/members", put(replace_members))
        .route("/admin/processes", get(list_processes))
        .route("/admin/processes/upload", post(upload_processes))
        .route(
            "/admin/processes/{id}",
            get(get_process).delete(delete_process),
        )
        .route(
            "/admin/processes/batches/{batch_id}/assign",
            post(assign_batch),
        )
        .route(
            "/admin/processes/batches/{batch_id}/revert",
            post(revert_batch),
        )
}

// ─── Groups ──────────────────────────────────────────────────

/// A group after a membership change, with what the change did.
#[derive(Serialize)]
pub struct GroupSyncResponse {
    pub group: ProcessGroup,
    pub sync: SyncReport,
}

async fn list_groups(State(state): State<Arc<AppState>>) -> Result<ApiResponse<Vec<ProcessGroup>>> {
    let groups = state.db.list_groups().await?;
    Ok(ApiResponse::ok("Process groups", groups))
}

async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ProcessGroup>> {
    let group = state
        .db
        .get_group(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {}", id)))?;
    Ok(ApiResponse::ok("Process group", group))
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<GroupInput>,
) -> Result<ApiResponse<CreatedId>> {
    let group = state.groups.create(&body).await?;
    Ok(ApiResponse::created(
        "Process group created",
        CreatedId { id: group.id },
    ))
}

async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<GroupInput>,
) -> Result<ApiResponse<GroupSyncResponse>> {
    let (group, sync) = state.groups.update(&id, &body).await?;
    Ok(ApiResponse::ok(
        "Process group updated",
        GroupSyncResponse { group, sync },
    ))
}

async fn replace_members(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<MembersInput>,
) -> Result<ApiResponse<GroupSyncResponse>> {
    let (group, sync) = state.groups.sync_members(&id, &body.user_ids).await?;
    Ok(ApiResponse::ok(
        "Members synchronized",
        GroupSyncResponse { group, sync },
    ))
}

#[derive(Serialize)]
struct DeletedProcesses {
    processes_deleted: usize,
}

async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<DeletedProcesses>> {
    let processes_deleted = state.groups.delete(&id).await?;
    Ok(ApiResponse::ok(
        "Process group deleted",
        DeletedProcesses { processes_deleted },
    ))
}

// ─── Processes ───────────────────────────────────────────────

#[derive(Deserialize)]
struct ProcessFilter {
    batch_id: Option<String>,
    group_id: Option<String>,
}

async fn list_processes(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProcessFilter>,
) -> Result<ApiResponse<Vec<Process>>> {
    let processes = match (filter.batch_id, filter.group_id) {
        (Some(batch_id), group_id) => state
            .db
            .processes_in_batch(&batch_id)
            .await?
            .into_iter()
            .filter(|p| group_id.as_ref().is_none_or(|g| &p.group_id == g))
            .collect(),
        (None, Some(group_id)) => state.db.processes_for_group(&group_id).await?,
        (None, None) => state.db.list_processes().await?,
    };
    Ok(ApiResponse::ok("Processes", processes))
}

async fn get_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Process>> {
    let process = state
        .db
        .get_process(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Process {}", id)))?;
    Ok(ApiResponse::ok("Process", process))
}

async fn delete_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>> {
    state.processes.delete(&id).await?;
    Ok(ApiResponse::message("Process deleted"))
}

async fn upload_processes(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<UploadRequest>,
) -> Result<ApiResponse<UploadReport>> {
    let report = state.processes.upload(&body).await?;
    Ok(ApiResponse::created("Processes uploaded", report))
}

async fn assign_batch(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> Result<ApiResponse<AssignReport>> {
    let report = state.processes.assign(&batch_id).await?;
    Ok(ApiResponse::ok("Batch assigned", report))
}

async fn revert_batch(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> Result<ApiResponse<RevertReport>> {
    let report = state.processes.revert(&batch_id).await?;
    Ok(ApiResponse::ok("Batch reverted", report))
}
