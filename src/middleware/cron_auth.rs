// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduler authentication for `/tasks/*` routes.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the shared scheduler secret.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Require the `X-Cron-Secret` header to match the configured secret.
pub async fn require_cron_secret(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get(CRON_SECRET_HEADER)
        .map(|h| h.as_bytes())
        .unwrap_or_default();

    if !secret_matches(provided, state.config.cron_secret.as_bytes()) {
        tracing::warn!(
            path = %request.uri().path(),
            present = !provided.is_empty(),
            "Blocked tasks request with invalid cron secret"
        );
        return Err(AppError::Forbidden("Invalid cron secret".to_string()));
    }

    Ok(next.run(request).await)
}

fn secret_matches(provided: &[u8], expected: &[u8]) -> bool {
    !expected.is_empty() && bool::from(provided.ct_eq(expected))
}
