// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! EcoBreak: active-break scheduling for corporate wellness programs
//!
//! This crate provides the backend API: the exercise catalog, process
//! assignment to user groups, completion history, and push reminders.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{
    CatalogService, DriveService, GoogleAuth, GroupService, IdentityService, NotificationCron,
    ProcessService, PushService, UserService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub catalog: CatalogService,
    pub processes: ProcessService,
    pub groups: GroupService,
    pub users: UserService,
    pub cron: NotificationCron,
}

impl AppState {
    /// Wire services together from a config, a database and Google credentials.
    pub fn new(
        config: Config,
        db: FirestoreDb,
        google_auth: GoogleAuth,
        identity: IdentityService,
    ) -> anyhow::Result<Self> {
        let offset = time_utils::offset_from_minutes(config.schedule_utc_offset_minutes)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Schedule UTC offset out of range: {}",
                    config.schedule_utc_offset_minutes
                )
            })?;

        let processes = ProcessService::new(db.clone(), offset);
        let drive = DriveService::new(google_auth.clone(), config.drive_folder_id.clone());
        let push = PushService::new(&config.firebase_project_id, google_auth);

        Ok(Self {
            catalog: CatalogService::new(db.clone(), drive, processes.clone()),
            groups: GroupService::new(db.clone(), processes.clone()),
            users: UserService::new(db.clone(), identity, &config.admin_email),
            cron: NotificationCron::new(db.clone(), push),
            processes,
            db,
            config,
        })
    }
}
