// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic reminder delivery.
//!
//! Each run examines notification plans scheduled within the next six hours,
//! pushes the reminder that is due for each one and records it on the plan.

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::notification::REMINDER_HORIZON_HOURS;
use crate::models::{NotificationPlan, ReminderKind, User};
use crate::services::push::{PushError, PushMessage, PushService};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of one cron run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CronReport {
    pub examined: usize,
    pub sent: usize,
    pub skipped_no_token: usize,
    pub failed: usize,
    /// Set when another run was in progress and this one did nothing
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_running: bool,
}

/// What happened to one due reminder.
#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// No usable device token; the reminder is recorded as handled
    NoToken,
    /// Push failed transiently; flags untouched
    Retry,
}

/// Reminder scheduler.
#[derive(Clone)]
pub struct NotificationCron {
    db: FirestoreDb,
    push: PushService,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when a run ends, including on error.
struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl NotificationCron {
    pub fn new(db: FirestoreDb, push: PushService) -> Self {
        Self {
            db,
            push,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the job every `interval` until the process exits.
    pub fn spawn(self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once(Utc::now()).await {
                    tracing::error!(error = %e, "Notification cron run failed");
                }
            }
        })
    }

    /// Examine upcoming plans and push due reminders.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<CronReport> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            tracing::info!("Notification cron already running, skipping");
            return Ok(CronReport {
                already_running: true,
                ..Default::default()
            });
        };

        let after = format_utc_rfc3339(now);
        let until = format_utc_rfc3339(now + Duration::hours(REMINDER_HORIZON_HOURS));
        let candidates = self.db.notification_plans_in_window(&after, &until).await?;

        let mut report = CronReport {
            examined: candidates.len(),
            ..Default::default()
        };
        let mut users: HashMap<String, Option<User>> = HashMap::new();
        let mut plan_names: HashMap<String, String> = HashMap::new();

        for notification in candidates {
            let Some(kind) = notification.due_reminder(now) else {
                continue;
            };
            let notification_id = notification.id.clone();

            match self
                .deliver(notification, kind, &mut users, &mut plan_names)
                .await
            {
                Ok(Delivery::Sent) => report.sent += 1,
                Ok(Delivery::NoToken) => report.skipped_no_token += 1,
                Ok(Delivery::Retry) => report.failed += 1,
                Err(e) => {
                    tracing::error!(
                        notification_id = %notification_id,
                        error = %e,
                        "Reminder processing failed, will retry next run"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            examined = report.examined,
            sent = report.sent,
            skipped_no_token = report.skipped_no_token,
            failed = report.failed,
            "Notification cron run complete"
        );
        Ok(report)
    }

    /// Push one due reminder and record it on the plan.
    async fn deliver(
        &self,
        mut notification: NotificationPlan,
        kind: ReminderKind,
        users: &mut HashMap<String, Option<User>>,
        plan_names: &mut HashMap<String, String>,
    ) -> Result<Delivery> {
        if !users.contains_key(&notification.user_id) {
            let user = self.db.get_user(&notification.user_id).await?;
            users.insert(notification.user_id.clone(), user);
        }
        let token = users
            .get(&notification.user_id)
            .and_then(|u| u.as_ref())
            .and_then(|u| u.fcm_token.clone());

        let Some(token) = token else {
            tracing::debug!(
                notification_id = %notification.id,
                user_id = %notification.user_id,
                "No device token, skipping reminder"
            );
            notification.mark_sent(kind);
            self.db.set_notification_plan(&notification).await?;
            return Ok(Delivery::NoToken);
        };

        if !plan_names.contains_key(&notification.plan_id) {
            let name = self
                .db
                .get_plan(&notification.plan_id)
                .await?
                .map(|p| p.name)
                .unwrap_or_default();
            plan_names.insert(notification.plan_id.clone(), name);
        }
        let plan_name = plan_names
            .get(&notification.plan_id)
            .map(String::as_str)
            .unwrap_or_default();

        let message = reminder_message(&notification, plan_name, kind);
        match self.push.send(&token, &message).await {
            Ok(()) => {
                notification.mark_sent(kind);
                self.db.set_notification_plan(&notification).await?;
                Ok(Delivery::Sent)
            }
            Err(PushError::Unregistered) => {
                tracing::info!(
                    user_id = %notification.user_id,
                    "Device token unregistered, clearing"
                );
                self.clear_token(users, &notification.user_id).await?;
                notification.mark_sent(kind);
                self.db.set_notification_plan(&notification).await?;
                Ok(Delivery::NoToken)
            }
            Err(PushError::Transient(e)) => {
                tracing::warn!(
                    notification_id = %notification.id,
                    error = %e,
                    "Reminder push failed, will retry next run"
                );
                Ok(Delivery::Retry)
            }
        }
    }

    async fn clear_token(
        &self,
        users: &mut HashMap<String, Option<User>>,
        user_id: &str,
    ) -> Result<()> {
        if let Some(Some(user)) = users.get_mut(user_id) {
            user.fcm_token = None;
            self.db.upsert_user(user).await?;
        }
        Ok(())
    }
}

/// Push content for a reminder.
pub fn reminder_message(
    notification: &NotificationPlan,
    plan_name: &str,
    kind: ReminderKind,
) -> PushMessage {
    let title = if plan_name.is_empty() {
        "EcoBreak".to_string()
    } else {
        plan_name.to_string()
    };

    let data = HashMap::from([
        ("plan_id".to_string(), notification.plan_id.clone()),
        ("process_id".to_string(), notification.process_id.clone()),
        ("notification_plan_id".to_string(), notification.id.clone()),
        ("scheduled_at".to_string(), notification.scheduled_at.clone()),
    ]);

    PushMessage {
        title,
        body: format!("Your active break starts in {}", kind.lead_time()),
        data,
    }
}
