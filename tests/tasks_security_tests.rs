// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduler endpoint security tests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use ecobreak_api::models::Role;
use tower::ServiceExt;

mod common;

fn run_request(secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/tasks/notifications/run");
    if let Some(secret) = secret {
        builder = builder.header("X-Cron-Secret", secret);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_tasks_requires_cron_secret() {
    let (app, _) = common::create_test_app();

    let response = app.oneshot(run_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::body_json(response).await;
    assert_eq!(body["status"], 403);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_tasks_rejects_wrong_secret() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(run_request(Some("test_cron_secreT")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tasks_ignores_session_tokens() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("admin-1", Role::Admin, &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tasks/notifications/run")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tasks_accepts_correct_secret() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(run_request(Some(&state.config.cron_secret)))
        .await
        .unwrap();

    // Past the secret check; the offline database then fails the run.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Database error");
}

#[tokio::test]
async fn test_admin_trigger_requires_admin() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-1", Role::User, &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/notifications/run")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
