// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scheduler callback routes.
//!
//! These endpoints are called by an external scheduler, not by users.
//! They are protected by the shared cron secret (see `middleware::cron_auth`).

use crate::error::Result;
use crate::response::ApiResponse;
use crate::services::CronReport;
use crate::AppState;
use axum::{extract::State, routing::post, Router};
use std::sync::Arc;

/// Task handler routes (called by the scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/notifications/run", post(run_notifications))
}

/// Run one notification pass.
async fn run_notifications(State(state): State<Arc<AppState>>) -> Result<ApiResponse<CronReport>> {
    let report = state.cron.run_once(chrono::Utc::now()).await?;
    if report.already_running {
        tracing::info!("Scheduler trigger ignored, run in progress");
    }
    Ok(ApiResponse::ok("Notification run complete", report))
}
