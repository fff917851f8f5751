// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Notification plans and reminder selection.
//!
//! A notification plan is one scheduled occurrence of a process for one
//! user. The cron job sends at most two reminders per plan: six hours and
//! one hour before `scheduled_at`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::parse_rfc3339;

/// Widest reminder offset; plans further away are not examined.
pub const REMINDER_HORIZON_HOURS: i64 = 6;

/// One scheduled occurrence of a process for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPlan {
    pub id: String,
    pub process_id: String,
    pub batch_id: String,
    pub plan_id: String,
    pub user_id: String,
    /// When the break happens (RFC3339, `Z` suffix)
    pub scheduled_at: String,
    #[serde(default)]
    pub reminder_6h_sent: bool,
    #[serde(default)]
    pub reminder_1h_sent: bool,
    pub created_at: String,
}

/// Which reminder is due for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    SixHours,
    OneHour,
}

impl ReminderKind {
    pub fn offset(self) -> Duration {
        match self {
            ReminderKind::SixHours => Duration::hours(6),
            ReminderKind::OneHour => Duration::hours(1),
        }
    }

    /// Human-readable lead time used in push bodies.
    pub fn lead_time(self) -> &'static str {
        match self {
            ReminderKind::SixHours => "6 hours",
            ReminderKind::OneHour => "1 hour",
        }
    }
}

impl NotificationPlan {
    /// Reminder that should be sent at `now`, if any.
    ///
    /// Plans already in the past or with an unparsable `scheduled_at` never
    /// produce a reminder.
    pub fn due_reminder(&self, now: DateTime<Utc>) -> Option<ReminderKind> {
        let scheduled = parse_rfc3339(&self.scheduled_at)?;
        let remaining = scheduled - now;

        if remaining <= Duration::zero() {
            return None;
        }
        if remaining <= ReminderKind::OneHour.offset() {
            return (!self.reminder_1h_sent).then_some(ReminderKind::OneHour);
        }
        if remaining <= ReminderKind::SixHours.offset() {
            return (!self.reminder_6h_sent).then_some(ReminderKind::SixHours);
        }
        None
    }

    /// Record that `kind` was delivered (or deliberately skipped).
    ///
    /// Sending the 1h reminder also retires a still-pending 6h reminder.
    pub fn mark_sent(&mut self, kind: ReminderKind) {
        match kind {
            ReminderKind::SixHours => self.reminder_6h_sent = true,
            ReminderKind::OneHour => {
                self.reminder_1h_sent = true;
                self.reminder_6h_sent = true;
            }
        }
    }
}
