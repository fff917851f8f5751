// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod history;
pub mod notification;
pub mod pause;
pub mod plan;
pub mod process;
pub mod user;

pub use activity::{Activity, Category};
pub use history::ExerciseHistory;
pub use notification::{NotificationPlan, ReminderKind};
pub use pause::{Motivo, Pause};
pub use plan::Plan;
pub use process::{Process, ProcessGroup, ProcessStatus};
pub use user::{Role, User};

/// Generate a new document ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
