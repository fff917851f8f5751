// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST`). Every test creates its own documents with
//! unique IDs so tests can share one emulator instance.

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, Request, StatusCode},
    routing::{patch, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use ecobreak_api::config::Config;
use ecobreak_api::db::{collections, FirestoreDb};
use ecobreak_api::error::AppError;
use ecobreak_api::models::{
    ExerciseHistory, NotificationPlan, Pause, ProcessStatus, Role, User,
};
use ecobreak_api::routes::create_router;
use ecobreak_api::services::catalog::{ActivityInput, CategoryInput, PlanInput};
use ecobreak_api::services::groups::GroupInput;
use ecobreak_api::services::processes::{ProcessRow, UploadRequest};
use ecobreak_api::services::{
    CatalogService, DriveService, GoogleAuth, NotificationCron, ProcessService, PushService,
};
use ecobreak_api::time_utils::{format_utc_rfc3339, now_rfc3339, offset_from_minutes};
use ecobreak_api::AppState;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

mod common;

async fn state() -> Arc<AppState> {
    common::test_state(Config::test_default(), common::test_db().await)
}

async fn create_user(state: &AppState, fcm_token: Option<&str>) -> User {
    let id = format!("user-{}", common::unique_suffix());
    let user = User {
        email: format!("{}@ecobreak.test", id),
        name: "Test User".to_string(),
        role: Role::User,
        fcm_token: fcm_token.map(String::from),
        created_at: now_rfc3339(),
        last_login: None,
        id,
    };
    state.db.upsert_user(&user).await.unwrap();
    user
}

/// A category with one activity and a plan containing it.
async fn create_catalog(state: &AppState) -> (String, String, String) {
    let category = state
        .catalog
        .create_category(&CategoryInput {
            name: format!("Stretching {}", common::unique_suffix()),
            description: String::new(),
        })
        .await
        .unwrap();

    let activity = state
        .catalog
        .create_activity(&ActivityInput {
            name: "Neck roll".to_string(),
            description: String::new(),
            category_id: category.id.clone(),
            duration_seconds: 60,
            instructions: vec!["Roll slowly".to_string()],
        })
        .await
        .unwrap();

    let plan = state
        .catalog
        .create_plan(&PlanInput {
            name: "Morning break".to_string(),
            description: String::new(),
            activity_ids: vec![activity.id.clone()],
        })
        .await
        .unwrap();

    (category.id, activity.id, plan.id)
}

/// A 10:00 row from `first` to `last` days relative to today, weekends included.
fn row_between(plan_id: &str, group_id: &str, name: &str, first: i64, last: i64) -> ProcessRow {
    let today = Utc::now().date_naive();
    ProcessRow {
        name: name.to_string(),
        plan_id: plan_id.to_string(),
        group_id: group_id.to_string(),
        start_date: (today + Duration::days(first)).format("%Y-%m-%d").to_string(),
        end_date: (today + Duration::days(last)).format("%Y-%m-%d").to_string(),
        scheduled_time: "10:00".to_string(),
        include_weekends: true,
    }
}

/// A row spanning three future days, weekends included.
fn future_row(plan_id: &str, group_id: &str) -> ProcessRow {
    row_between(plan_id, group_id, "Daily stretch", 10, 12)
}

/// A notification plan for `user_id` due in `minutes`.
async fn schedule_reminder(state: &AppState, user_id: &str, minutes: i64) -> NotificationPlan {
    let now = Utc::now();
    let notification = NotificationPlan {
        id: format!("n-{}", common::unique_suffix()),
        process_id: "proc-x".to_string(),
        batch_id: "batch-x".to_string(),
        plan_id: "plan-x".to_string(),
        user_id: user_id.to_string(),
        scheduled_at: format_utc_rfc3339(now + Duration::minutes(minutes)),
        reminder_6h_sent: false,
        reminder_1h_sent: false,
        created_at: format_utc_rfc3339(now),
    };
    state.db.set_notification_plan(&notification).await.unwrap();
    notification
}

async fn stored_reminder(db: &FirestoreDb, user_id: &str) -> NotificationPlan {
    let mut stored = db.notification_plans_for_user(user_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    stored.remove(0)
}

// ═══════════════════════════════════════════════════════════════════════════
// CATALOG
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_category_crud_contract() {
    require_emulator!();
    let state = state().await;

    let created = state
        .catalog
        .create_category(&CategoryInput {
            name: "Breathing".to_string(),
            description: "Calm down".to_string(),
        })
        .await
        .unwrap();
    assert!(!created.id.is_empty());

    let listed = state.db.list_categories().await.unwrap();
    assert!(listed.iter().any(|c| c.id == created.id));

    state.catalog.delete_category(&created.id).await.unwrap();
    let err = state.catalog.delete_category(&created.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_activity_requires_existing_category() {
    require_emulator!();
    let state = state().await;

    let err = state
        .catalog
        .create_activity(&ActivityInput {
            name: "Orphan".to_string(),
            description: String::new(),
            category_id: format!("missing-{}", common::unique_suffix()),
            duration_seconds: 30,
            instructions: vec![],
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_plan_rejects_unknown_activity() {
    require_emulator!();
    let state = state().await;

    let missing = format!("missing-{}", common::unique_suffix());
    let err = state
        .catalog
        .create_plan(&PlanInput {
            name: "Broken".to_string(),
            description: String::new(),
            activity_ids: vec![missing.clone()],
        })
        .await
        .unwrap_err();

    match err {
        AppError::BadRequest(msg) => assert!(msg.contains(&missing)),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_activity_removes_it_from_plans() {
    require_emulator!();
    let state = state().await;
    let (_, activity_id, plan_id) = create_catalog(&state).await;

    let report = state.catalog.delete_activity(&activity_id).await.unwrap();
    assert_eq!(report.plans_updated, 1);

    let plan = state.db.get_plan(&plan_id).await.unwrap().unwrap();
    assert!(plan.activity_ids.is_empty());
    assert!(state.db.get_activity(&activity_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_category_cascades_to_activities() {
    require_emulator!();
    let state = state().await;
    let (category_id, activity_id, _) = create_catalog(&state).await;

    let report = state.catalog.delete_category(&category_id).await.unwrap();
    assert_eq!(report.activities_deleted, 1);
    assert!(state.db.get_activity(&activity_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_plan_cascades_to_processes_and_notifications() {
    require_emulator!();
    let state = state().await;
    let (_, _, plan_id) = create_catalog(&state).await;
    let alice = create_user(&state, None).await;

    let group = state
        .groups
        .create(&GroupInput {
            name: "Legal".to_string(),
            description: String::new(),
            user_ids: Some(vec![alice.id.clone()]),
        })
        .await
        .unwrap();
    let upload = state
        .processes
        .upload(&UploadRequest {
            processes: vec![future_row(&plan_id, &group.id)],
        })
        .await
        .unwrap();
    let assign = state.processes.assign(&upload.batch_id).await.unwrap();
    assert_eq!(assign.notifications_created, 3);

    let report = state.catalog.delete_plan(&plan_id).await.unwrap();
    assert_eq!(report.processes_deleted, 1);

    assert!(state.db.get_plan(&plan_id).await.unwrap().is_none());
    assert!(state
        .db
        .processes_for_plan(&plan_id)
        .await
        .unwrap()
        .is_empty());
    assert!(state
        .db
        .notification_plans_for_batch(&upload.batch_id)
        .await
        .unwrap()
        .is_empty());

    let err = state.catalog.delete_plan(&plan_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

/// Drive stand-in. On each delete it records the deleted file and the video
/// the activity pointed at in that moment.
#[derive(Clone)]
struct DriveStub {
    db: FirestoreDb,
    activity_id: String,
    deletions: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

async fn drive_upload() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "id": "new-file" }))
}

async fn drive_patch(Path(id): Path<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": id,
        "webViewLink": format!("https://drive.google.com/file/d/{}/view", id),
    }))
}

async fn drive_permission() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "id": "anyoneWithLink" }))
}

async fn drive_delete(State(stub): State<DriveStub>, Path(id): Path<String>) -> StatusCode {
    let current = stub
        .db
        .get_activity(&stub.activity_id)
        .await
        .ok()
        .flatten()
        .and_then(|a| a.video_file_id);
    stub.deletions.lock().unwrap().push((id, current));
    StatusCode::NO_CONTENT
}

#[tokio::test]
async fn test_replacing_video_deletes_old_file_after_saving_new_one() {
    require_emulator!();
    let state = state().await;
    let (_, activity_id, _) = create_catalog(&state).await;

    let mut activity = state.db.get_activity(&activity_id).await.unwrap().unwrap();
    activity.video_file_id = Some("old-file".to_string());
    activity.video_url = Some("https://drive.google.com/file/d/old-file/view".to_string());
    state.db.set_activity(&activity).await.unwrap();

    let stub = DriveStub {
        db: state.db.clone(),
        activity_id: activity_id.clone(),
        deletions: Arc::new(Mutex::new(Vec::new())),
    };
    let deletions = stub.deletions.clone();
    let base_url = common::spawn_stub(
        Router::new()
            .route("/upload/drive/v3/files", post(drive_upload))
            .route("/drive/v3/files/{id}", patch(drive_patch).delete(drive_delete))
            .route("/drive/v3/files/{id}/permissions", post(drive_permission))
            .with_state(stub),
    )
    .await;

    let offset = offset_from_minutes(-300).unwrap();
    let catalog = CatalogService::new(
        state.db.clone(),
        DriveService::with_base_url(GoogleAuth::new_static("test-token"), None, &base_url),
        ProcessService::new(state.db.clone(), offset),
    );

    let updated = catalog
        .attach_video(&activity_id, "video/mp4", Bytes::from_static(b"not really mp4"))
        .await
        .unwrap();
    assert_eq!(updated.video_file_id.as_deref(), Some("new-file"));

    let deletions = deletions.lock().unwrap().clone();
    assert_eq!(
        deletions,
        vec![("old-file".to_string(), Some("new-file".to_string()))]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// PROCESS WORKFLOW
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_upload_assign_revert() {
    require_emulator!();
    let state = state().await;
    let (_, _, plan_id) = create_catalog(&state).await;
    let alice = create_user(&state, None).await;
    let bob = create_user(&state, None).await;

    let group = state
        .groups
        .create(&GroupInput {
            name: "Ops".to_string(),
            description: String::new(),
            user_ids: Some(vec![alice.id.clone(), bob.id.clone()]),
        })
        .await
        .unwrap();

    let upload = state
        .processes
        .upload(&UploadRequest {
            processes: vec![future_row(&plan_id, &group.id)],
        })
        .await
        .unwrap();
    assert_eq!(upload.count, 1);

    let assign = state.processes.assign(&upload.batch_id).await.unwrap();
    assert_eq!(assign.assigned, 1);
    assert!(assign.failed.is_empty());
    // 2 members x 3 days
    assert_eq!(assign.notifications_created, 6);

    let processes = state.db.processes_in_batch(&upload.batch_id).await.unwrap();
    assert_eq!(processes[0].status, ProcessStatus::Assigned);

    // Second assign is a no-op
    let again = state.processes.assign(&upload.batch_id).await.unwrap();
    assert_eq!(again.assigned, 0);
    assert_eq!(again.skipped, 1);

    let revert = state.processes.revert(&upload.batch_id).await.unwrap();
    assert_eq!(revert.processes_deleted, 1);
    assert_eq!(revert.notifications_deleted, 6);
    assert!(revert.failed.is_empty());

    assert!(state
        .db
        .notification_plans_for_batch(&upload.batch_id)
        .await
        .unwrap()
        .is_empty());
    let err = state.processes.assign(&upload.batch_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_assign_reports_missing_plan() {
    require_emulator!();
    let state = state().await;
    let alice = create_user(&state, None).await;

    let group = state
        .groups
        .create(&GroupInput {
            name: "Sales".to_string(),
            description: String::new(),
            user_ids: Some(vec![alice.id.clone()]),
        })
        .await
        .unwrap();

    let upload = state
        .processes
        .upload(&UploadRequest {
            processes: vec![future_row("no-such-plan", &group.id)],
        })
        .await
        .unwrap();

    let report = state.processes.assign(&upload.batch_id).await.unwrap();
    assert_eq!(report.assigned, 0);
    assert_eq!(report.failed.len(), 1);

    state.processes.revert(&upload.batch_id).await.unwrap();
}

#[tokio::test]
async fn test_member_sync_moves_future_notifications() {
    require_emulator!();
    let state = state().await;
    let (_, _, plan_id) = create_catalog(&state).await;
    let alice = create_user(&state, None).await;
    let bob = create_user(&state, None).await;

    let group = state
        .groups
        .create(&GroupInput {
            name: "Finance".to_string(),
            description: String::new(),
            user_ids: Some(vec![alice.id.clone()]),
        })
        .await
        .unwrap();

    let upload = state
        .processes
        .upload(&UploadRequest {
            processes: vec![future_row(&plan_id, &group.id)],
        })
        .await
        .unwrap();
    state.processes.assign(&upload.batch_id).await.unwrap();

    let (updated, report) = state
        .groups
        .sync_members(&group.id, &[bob.id.clone()])
        .await
        .unwrap();
    assert_eq!(updated.user_ids, vec![bob.id.clone()]);
    assert_eq!(report.added, vec![bob.id.clone()]);
    assert_eq!(report.removed, vec![alice.id.clone()]);
    assert_eq!(report.notifications_created, 3);
    assert_eq!(report.notifications_deleted, 3);

    assert!(state
        .db
        .notification_plans_for_user(&alice.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        state
            .db
            .notification_plans_for_user(&bob.id)
            .await
            .unwrap()
            .len(),
        3
    );

    let deleted = state.groups.delete(&group.id).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(state
        .db
        .notification_plans_for_user(&bob.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_member_removal_keeps_past_notifications() {
    require_emulator!();
    let state = state().await;
    let (_, _, plan_id) = create_catalog(&state).await;
    let alice = create_user(&state, None).await;
    let bob = create_user(&state, None).await;

    let group = state
        .groups
        .create(&GroupInput {
            name: "Support".to_string(),
            description: String::new(),
            user_ids: Some(vec![alice.id.clone()]),
        })
        .await
        .unwrap();
    let upload = state
        .processes
        .upload(&UploadRequest {
            processes: vec![row_between(&plan_id, &group.id, "Week around today", -3, 3)],
        })
        .await
        .unwrap();
    let assign = state.processes.assign(&upload.batch_id).await.unwrap();
    assert_eq!(assign.notifications_created, 7);

    let (_, report) = state
        .groups
        .sync_members(&group.id, &[bob.id.clone()])
        .await
        .unwrap();
    let now = format_utc_rfc3339(Utc::now());

    let kept = state.db.notification_plans_for_user(&alice.id).await.unwrap();
    // At least the three days before today are in the past.
    assert!(kept.len() >= 3, "kept {}", kept.len());
    assert!(kept.iter().all(|n| n.scheduled_at <= now));
    assert_eq!(kept.len() + report.notifications_deleted, 7);

    let added = state.db.notification_plans_for_user(&bob.id).await.unwrap();
    assert_eq!(added.len(), report.notifications_created);
    assert!(added.iter().all(|n| n.scheduled_at > now));

    state.processes.revert(&upload.batch_id).await.unwrap();
}

#[tokio::test]
async fn test_group_rename_keeps_members() {
    require_emulator!();
    let state = state().await;
    let (_, _, plan_id) = create_catalog(&state).await;
    let alice = create_user(&state, None).await;

    let group = state
        .groups
        .create(&GroupInput {
            name: "HR".to_string(),
            description: String::new(),
            user_ids: Some(vec![alice.id.clone()]),
        })
        .await
        .unwrap();
    let upload = state
        .processes
        .upload(&UploadRequest {
            processes: vec![future_row(&plan_id, &group.id)],
        })
        .await
        .unwrap();
    state.processes.assign(&upload.batch_id).await.unwrap();

    let (renamed, report) = state
        .groups
        .update(
            &group.id,
            &GroupInput {
                name: "People".to_string(),
                description: "Renamed".to_string(),
                user_ids: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "People");
    assert_eq!(renamed.user_ids, vec![alice.id.clone()]);
    assert_eq!(report.notifications_deleted, 0);

    let stored = state.db.get_group(&group.id).await.unwrap().unwrap();
    assert_eq!(stored.user_ids, vec![alice.id.clone()]);
    assert_eq!(
        state
            .db
            .notification_plans_for_user(&alice.id)
            .await
            .unwrap()
            .len(),
        3
    );

    state.groups.delete(&group.id).await.unwrap();
}

#[tokio::test]
async fn test_group_rejects_unknown_members() {
    require_emulator!();
    let state = state().await;

    let err = state
        .groups
        .create(&GroupInput {
            name: "Ghosts".to_string(),
            description: String::new(),
            user_ids: Some(vec![format!("ghost-{}", common::unique_suffix())]),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// USERS & REMINDERS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_deletion_cascade() {
    require_emulator!();
    let state = state().await;
    let user = create_user(&state, None).await;
    let other = create_user(&state, None).await;

    let group = state
        .groups
        .create(&GroupInput {
            name: "Mixed".to_string(),
            description: String::new(),
            user_ids: Some(vec![user.id.clone(), other.id.clone()]),
        })
        .await
        .unwrap();

    state
        .db
        .add_history(&ExerciseHistory {
            id: format!("h-{}", common::unique_suffix()),
            user_id: user.id.clone(),
            activity_id: "a1".to_string(),
            plan_id: None,
            process_id: None,
            duration_seconds: Some(60),
            completed_at: now_rfc3339(),
        })
        .await
        .unwrap();
    state
        .db
        .add_pause(&Pause {
            id: format!("p-{}", common::unique_suffix()),
            user_id: user.id.clone(),
            motivo_id: "m1".to_string(),
            activity_id: None,
            note: None,
            created_at: now_rfc3339(),
        })
        .await
        .unwrap();

    let report = state.users.delete(&user.id).await.unwrap();
    assert_eq!(report.groups_updated, 1);
    assert_eq!(report.history_deleted, 1);
    assert_eq!(report.pauses_deleted, 1);

    assert!(state.db.get_user(&user.id).await.unwrap().is_none());
    let group = state.db.get_group(&group.id).await.unwrap().unwrap();
    assert_eq!(group.user_ids, vec![other.id.clone()]);

    let err = state.users.delete(&user.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_cron_skips_users_without_token() {
    require_emulator!();
    let state = state().await;
    let user = create_user(&state, None).await;

    let now = Utc::now();
    let notification = NotificationPlan {
        id: format!("n-{}", common::unique_suffix()),
        process_id: "proc-x".to_string(),
        batch_id: "batch-x".to_string(),
        plan_id: "plan-x".to_string(),
        user_id: user.id.clone(),
        scheduled_at: format_utc_rfc3339(now + Duration::minutes(30)),
        reminder_6h_sent: false,
        reminder_1h_sent: false,
        created_at: format_utc_rfc3339(now),
    };
    state.db.set_notification_plan(&notification).await.unwrap();

    // Another test's run may get to the reminder first; the stored flags
    // are what count.
    state.cron.run_once(now).await.unwrap();

    let stored: Vec<NotificationPlan> = state
        .db
        .notification_plans_for_user(&user.id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].reminder_1h_sent);
    assert!(stored[0].reminder_6h_sent);

    state
        .db
        .delete_notification_plans(&[notification.id])
        .await
        .unwrap();
}

/// Cloud Messaging stand-in keyed on the device token: `dead-` tokens are
/// unregistered, `flaky-` tokens hit a server error, the rest are accepted.
async fn fcm_send(Json(body): Json<serde_json::Value>) -> (StatusCode, String) {
    let token = body["message"]["token"].as_str().unwrap_or_default();
    if token.starts_with("dead-") {
        (
            StatusCode::NOT_FOUND,
            r#"{"error":{"code":404,"status":"NOT_FOUND","details":[{"errorCode":"UNREGISTERED"}]}}"#
                .to_string(),
        )
    } else if token.starts_with("flaky-") {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable".to_string())
    } else {
        (
            StatusCode::OK,
            r#"{"name":"projects/test-project/messages/1"}"#.to_string(),
        )
    }
}

async fn cron_with_fcm_stub(db: &FirestoreDb) -> NotificationCron {
    let base_url = common::spawn_stub(Router::new().fallback(fcm_send)).await;
    let push = PushService::with_base_url(
        "test-project",
        GoogleAuth::new_static("test-token"),
        &base_url,
    );
    NotificationCron::new(db.clone(), push)
}

#[tokio::test]
async fn test_cron_push_outcomes() {
    require_emulator!();
    let state = state().await;
    let cron = cron_with_fcm_stub(&state.db).await;
    let suffix = common::unique_suffix();

    let live = create_user(&state, Some(&format!("live-{}", suffix))).await;
    let dead = create_user(&state, Some(&format!("dead-{}", suffix))).await;
    let flaky = create_user(&state, Some(&format!("flaky-{}", suffix))).await;
    let live_n = schedule_reminder(&state, &live.id, 30).await;
    let dead_n = schedule_reminder(&state, &dead.id, 30).await;
    let flaky_n = schedule_reminder(&state, &flaky.id, 30).await;

    let report = cron.run_once(Utc::now()).await.unwrap();
    assert!(report.sent >= 1);
    assert!(report.failed >= 1);

    let delivered = stored_reminder(&state.db, &live.id).await;
    assert!(delivered.reminder_1h_sent);

    // Unregistered token is forgotten and the reminder counts as handled.
    let handled = stored_reminder(&state.db, &dead.id).await;
    assert!(handled.reminder_1h_sent);
    let dead_profile = state.db.get_user(&dead.id).await.unwrap().unwrap();
    assert_eq!(dead_profile.fcm_token, None);

    // Transient failure leaves the flags and the token for the next run.
    let pending = stored_reminder(&state.db, &flaky.id).await;
    assert!(!pending.reminder_1h_sent);
    assert!(!pending.reminder_6h_sent);
    let flaky_profile = state.db.get_user(&flaky.id).await.unwrap().unwrap();
    assert!(flaky_profile.fcm_token.is_some());

    state
        .db
        .delete_notification_plans(&[live_n.id, dead_n.id, flaky_n.id])
        .await
        .unwrap();
}

/// Profile document in a shape `User` cannot be read from.
#[derive(serde::Serialize, serde::Deserialize)]
struct MalformedProfile {
    id: String,
    email: String,
    role: String,
}

#[tokio::test]
async fn test_cron_continues_past_unreadable_user() {
    require_emulator!();
    let state = state().await;

    let broken_id = format!("broken-{}", common::unique_suffix());
    let raw = common::raw_emulator_client().await;
    let _: () = raw
        .fluent()
        .update()
        .in_col(collections::USERS)
        .document_id(&broken_id)
        .object(&MalformedProfile {
            id: broken_id.clone(),
            email: format!("{}@ecobreak.test", broken_id),
            role: "superuser".to_string(),
        })
        .execute()
        .await
        .unwrap();
    assert!(state.db.get_user(&broken_id).await.is_err());

    let healthy = create_user(&state, None).await;
    // The unreadable one sorts first in the window.
    let broken_n = schedule_reminder(&state, &broken_id, 20).await;
    let healthy_n = schedule_reminder(&state, &healthy.id, 40).await;

    let report = state.cron.run_once(Utc::now()).await.unwrap();
    assert!(report.failed >= 1);

    let stuck = stored_reminder(&state.db, &broken_id).await;
    assert!(!stuck.reminder_1h_sent);
    let handled = stored_reminder(&state.db, &healthy.id).await;
    assert!(handled.reminder_1h_sent);

    state
        .db
        .delete_notification_plans(&[broken_n.id, healthy_n.id])
        .await
        .unwrap();
    state.db.delete_user(&broken_id).await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// USER API
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_plans_lists_assigned_processes_active_today() {
    require_emulator!();
    let state = state().await;
    let app = create_router(state.clone());
    let (_, _, plan_id) = create_catalog(&state).await;
    let alice = create_user(&state, None).await;

    let group = state
        .groups
        .create(&GroupInput {
            name: "Warehouse".to_string(),
            description: String::new(),
            user_ids: Some(vec![alice.id.clone()]),
        })
        .await
        .unwrap();

    let assigned = state
        .processes
        .upload(&UploadRequest {
            processes: vec![
                row_between(&plan_id, &group.id, "Running now", -1, 1),
                row_between(&plan_id, &group.id, "Starts later", 10, 12),
                row_between(&plan_id, &group.id, "Already over", -12, -10),
            ],
        })
        .await
        .unwrap();
    state.processes.assign(&assigned.batch_id).await.unwrap();
    let unassigned = state
        .processes
        .upload(&UploadRequest {
            processes: vec![row_between(&plan_id, &group.id, "Not assigned", -1, 1)],
        })
        .await
        .unwrap();

    let token = common::create_test_jwt(&alice.id, Role::User, &state.config.jwt_signing_key);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/user/plans")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    let plans = body["data"].as_array().unwrap();
    assert_eq!(plans.len(), 1, "{}", body);
    assert_eq!(plans[0]["process"]["name"], "Running now");
    assert_eq!(plans[0]["plan"]["id"], plan_id.as_str());

    state.processes.revert(&assigned.batch_id).await.unwrap();
    state.processes.revert(&unassigned.batch_id).await.unwrap();
}
