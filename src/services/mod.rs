// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod catalog;
pub mod drive;
pub mod google_auth;
pub mod groups;
pub mod identity;
pub mod notification_cron;
pub mod processes;
pub mod push;
pub mod users;

pub use catalog::CatalogService;
pub use drive::DriveService;
pub use google_auth::GoogleAuth;
pub use groups::GroupService;
pub use identity::IdentityService;
pub use notification_cron::{CronReport, NotificationCron};
pub use processes::ProcessService;
pub use push::PushService;
pub use users::UserService;
