// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User accounts: login, provisioning and deletion.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Role, User};
use crate::services::identity::{FirebaseIdentity, IdentityService};
use crate::time_utils::now_rfc3339;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct NewUserInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Documents removed with a user.
#[derive(Debug, Default, Serialize)]
pub struct UserDeletionReport {
    pub groups_updated: usize,
    pub notifications_deleted: usize,
    pub history_deleted: usize,
    pub pauses_deleted: usize,
}

/// User account service.
#[derive(Clone)]
pub struct UserService {
    db: FirestoreDb,
    identity: IdentityService,
    admin_email: String,
}

impl UserService {
    pub fn new(db: FirestoreDb, identity: IdentityService, admin_email: &str) -> Self {
        Self {
            db,
            identity,
            admin_email: admin_email.to_string(),
        }
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        self.db
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))
    }

    /// Check credentials with Firebase Auth and load (or create) the profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let identity = self.identity.sign_in(email, password).await?;
        let role = Role::for_email(&identity.email, &self.admin_email);
        let now = now_rfc3339();

        let user = match self.db.get_user(&identity.uid).await? {
            Some(mut user) => {
                user.role = role;
                user.last_login = Some(now);
                user
            }
            None => {
                tracing::info!(uid = %identity.uid, "Creating profile on first login");
                let mut user = profile_for(&identity, None, role, &now);
                user.last_login = Some(now);
                user
            }
        };
        self.db.upsert_user(&user).await?;

        tracing::info!(uid = %user.id, role = ?user.role, "User logged in");
        Ok(user)
    }

    /// Create a Firebase account and its profile.
    pub async fn create(&self, input: &NewUserInput) -> Result<User> {
        let identity = self.identity.sign_up(&input.email, &input.password).await?;
        let role = Role::for_email(&identity.email, &self.admin_email);
        let user = profile_for(&identity, Some(input.name.trim()), role, &now_rfc3339());
        self.db.upsert_user(&user).await?;
        Ok(user)
    }

    /// Register (or clear) the device token used for push reminders.
    pub async fn set_fcm_token(&self, id: &str, token: Option<String>) -> Result<User> {
        let mut user = self.get(id).await?;
        user.fcm_token = token.filter(|t| !t.trim().is_empty());
        self.db.upsert_user(&user).await?;
        Ok(user)
    }

    /// Delete a profile and everything that references it.
    ///
    /// The Firebase account itself is kept.
    pub async fn delete(&self, id: &str) -> Result<UserDeletionReport> {
        self.get(id).await?;
        let mut report = UserDeletionReport::default();

        // 1. Group memberships
        for mut group in self.db.groups_for_user(id).await? {
            group.user_ids.retain(|member| member != id);
            group.updated_at = now_rfc3339();
            self.db.set_group(&group).await?;
            report.groups_updated += 1;
        }

        // 2. Notification plans
        let ids: Vec<String> = self
            .db
            .notification_plans_for_user(id)
            .await?
            .into_iter()
            .map(|n| n.id)
            .collect();
        self.db.delete_notification_plans(&ids).await?;
        report.notifications_deleted = ids.len();

        // 3. Exercise history
        let ids: Vec<String> = self
            .db
            .history_for_user(id)
            .await?
            .into_iter()
            .map(|h| h.id)
            .collect();
        self.db.delete_history(&ids).await?;
        report.history_deleted = ids.len();

        // 4. Pauses
        let ids: Vec<String> = self
            .db
            .list_pauses(Some(id))
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        self.db.delete_pauses(&ids).await?;
        report.pauses_deleted = ids.len();

        // 5. Profile
        self.db.delete_user(id).await?;

        tracing::info!(
            uid = id,
            groups = report.groups_updated,
            notifications = report.notifications_deleted,
            history = report.history_deleted,
            pauses = report.pauses_deleted,
            "User deleted"
        );
        Ok(report)
    }
}

fn profile_for(identity: &FirebaseIdentity, name: Option<&str>, role: Role, now: &str) -> User {
    let name = name
        .map(str::to_string)
        .or_else(|| identity.display_name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        });

    User {
        id: identity.uid.clone(),
        email: identity.email.to_lowercase(),
        name,
        role,
        fcm_token: None,
        created_at: now.to_string(),
        last_login: None,
    }
}
