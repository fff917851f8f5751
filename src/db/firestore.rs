// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Foreign keys between collections are plain string fields and are joined
//! at query time. Nothing here enforces referential integrity; the services
//! layer performs the cascades.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Activity, Category, ExerciseHistory, Motivo, NotificationPlan, Pause, Plan, Process,
    ProcessGroup, User,
};
use futures_util::{stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;
/// Upper bound on upcoming notifications returned to a user.
const UPCOMING_LIMIT: u32 = 50;

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

/// Filters for exercise history listings.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    /// Inclusive lower bound on `completed_at`
    pub from: Option<String>,
    /// Exclusive upper bound on `completed_at`
    pub to: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Generic Document Helpers ────────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(db_err)
    }

    /// Fetch several documents by ID, preserving the order of `ids`.
    async fn get_many<T>(&self, collection: &str, ids: &[String]) -> Result<Vec<Option<T>>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        stream::iter(ids.iter().cloned())
            .map(|id| async move { self.get_doc::<T>(collection, &id).await })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<T>, AppError>>>()
            .await
            .into_iter()
            .collect()
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(db_err)
    }

    async fn list_all<T>(&self, collection: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn query_eq<T>(
        &self,
        collection: &str,
        field: &'static str,
        value: &str,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        let value = value.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.field(field).eq(value.clone()))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn query_array_contains<T>(
        &self,
        collection: &str,
        field: &'static str,
        value: &str,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        let value = value.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.field(field).array_contains(value.clone()))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Write many documents using transactions of at most `BATCH_SIZE` writes.
    async fn batch_set<T, F>(&self, collection: &str, docs: &[T], id_of: F) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
        F: Fn(&T) -> &str,
    {
        let client = self.get_client()?;

        for chunk in docs.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for doc in chunk {
                client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id_of(doc))
                    .object(doc)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add write to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to commit batch write: {}", e)))?;
        }

        Ok(())
    }

    /// Delete documents by ID using transactions of at most `BATCH_SIZE` deletes.
    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<(), AppError> {
        let client = self.get_client()?;

        for chunk in ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Delete documents one by one, returning the IDs that could not be deleted.
    async fn delete_each(&self, collection: &str, ids: &[String]) -> Vec<String> {
        stream::iter(ids.iter().cloned())
            .map(|id| async move {
                match self.delete_doc(collection, &id).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!(collection, id = %id, error = %e, "Delete failed");
                        Some(id)
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .filter_map(|failed| async move { failed })
            .collect()
            .await
    }

    // ─── Category Operations ─────────────────────────────────────

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        self.get_doc(collections::CATEGORIES, id).await
    }

    /// All categories, sorted by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let mut categories: Vec<Category> = self.list_all(collections::CATEGORIES).await?;
        categories.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(categories)
    }

    pub async fn set_category(&self, category: &Category) -> Result<(), AppError> {
        self.set_doc(collections::CATEGORIES, &category.id, category)
            .await
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::CATEGORIES, id).await
    }

    // ─── Activity Operations ─────────────────────────────────────

    pub async fn get_activity(&self, id: &str) -> Result<Option<Activity>, AppError> {
        self.get_doc(collections::ACTIVITIES, id).await
    }

    /// Fetch activities by ID in the given order; missing ones are `None`.
    pub async fn get_activities(&self, ids: &[String]) -> Result<Vec<Option<Activity>>, AppError> {
        self.get_many(collections::ACTIVITIES, ids).await
    }

    /// List activities, optionally restricted to one category, sorted by name.
    pub async fn list_activities(
        &self,
        category_id: Option<&str>,
    ) -> Result<Vec<Activity>, AppError> {
        let mut activities: Vec<Activity> = match category_id {
            Some(category_id) => {
                self.query_eq(collections::ACTIVITIES, "category_id", category_id)
                    .await?
            }
            None => self.list_all(collections::ACTIVITIES).await?,
        };
        activities.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(activities)
    }

    pub async fn set_activity(&self, activity: &Activity) -> Result<(), AppError> {
        self.set_doc(collections::ACTIVITIES, &activity.id, activity)
            .await
    }

    pub async fn delete_activity(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::ACTIVITIES, id).await
    }

    // ─── Plan Operations ─────────────────────────────────────────

    pub async fn get_plan(&self, id: &str) -> Result<Option<Plan>, AppError> {
        self.get_doc(collections::PLANS, id).await
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        let mut plans: Vec<Plan> = self.list_all(collections::PLANS).await?;
        plans.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(plans)
    }

    /// Plans whose sequence includes the given activity.
    pub async fn plans_containing_activity(&self, activity_id: &str) -> Result<Vec<Plan>, AppError> {
        self.query_array_contains(collections::PLANS, "activity_ids", activity_id)
            .await
    }

    pub async fn set_plan(&self, plan: &Plan) -> Result<(), AppError> {
        self.set_doc(collections::PLANS, &plan.id, plan).await
    }

    pub async fn delete_plan(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::PLANS, id).await
    }

    // ─── Process Group Operations ────────────────────────────────

    pub async fn get_group(&self, id: &str) -> Result<Option<ProcessGroup>, AppError> {
        self.get_doc(collections::PROCESS_GROUPS, id).await
    }

    pub async fn list_groups(&self) -> Result<Vec<ProcessGroup>, AppError> {
        let mut groups: Vec<ProcessGroup> = self.list_all(collections::PROCESS_GROUPS).await?;
        groups.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(groups)
    }

    /// Groups the user is a member of.
    pub async fn groups_for_user(&self, user_id: &str) -> Result<Vec<ProcessGroup>, AppError> {
        self.query_array_contains(collections::PROCESS_GROUPS, "user_ids", user_id)
            .await
    }

    pub async fn set_group(&self, group: &ProcessGroup) -> Result<(), AppError> {
        self.set_doc(collections::PROCESS_GROUPS, &group.id, group)
            .await
    }

    pub async fn delete_group(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::PROCESS_GROUPS, id).await
    }

    // ─── Process Operations ──────────────────────────────────────

    pub async fn get_process(&self, id: &str) -> Result<Option<Process>, AppError> {
        self.get_doc(collections::PROCESSES, id).await
    }

    pub async fn list_processes(&self) -> Result<Vec<Process>, AppError> {
        self.list_all(collections::PROCESSES).await
    }

    pub async fn processes_in_batch(&self, batch_id: &str) -> Result<Vec<Process>, AppError> {
        self.query_eq(collections::PROCESSES, "batch_id", batch_id)
            .await
    }

    pub async fn processes_for_plan(&self, plan_id: &str) -> Result<Vec<Process>, AppError> {
        self.query_eq(collections::PROCESSES, "plan_id", plan_id).await
    }

    pub async fn processes_for_group(&self, group_id: &str) -> Result<Vec<Process>, AppError> {
        self.query_eq(collections::PROCESSES, "group_id", group_id)
            .await
    }

    pub async fn set_process(&self, process: &Process) -> Result<(), AppError> {
        self.set_doc(collections::PROCESSES, &process.id, process)
            .await
    }

    /// Store an uploaded batch of processes.
    pub async fn batch_set_processes(&self, processes: &[Process]) -> Result<(), AppError> {
        self.batch_set(collections::PROCESSES, processes, |p| p.id.as_str())
            .await
    }

    pub async fn delete_process(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::PROCESSES, id).await
    }

    /// Best-effort deletion of processes; returns IDs that failed.
    pub async fn delete_processes_each(&self, ids: &[String]) -> Vec<String> {
        self.delete_each(collections::PROCESSES, ids).await
    }

    // ─── Notification Plan Operations ────────────────────────────

    pub async fn batch_set_notification_plans(
        &self,
        plans: &[NotificationPlan],
    ) -> Result<(), AppError> {
        self.batch_set(collections::NOTIFICATION_PLANS, plans, |n| n.id.as_str())
            .await
    }

    pub async fn set_notification_plan(&self, plan: &NotificationPlan) -> Result<(), AppError> {
        self.set_doc(collections::NOTIFICATION_PLANS, &plan.id, plan)
            .await
    }

    pub async fn notification_plans_for_process(
        &self,
        process_id: &str,
    ) -> Result<Vec<NotificationPlan>, AppError> {
        self.query_eq(collections::NOTIFICATION_PLANS, "process_id", process_id)
            .await
    }

    pub async fn notification_plans_for_batch(
        &self,
        batch_id: &str,
    ) -> Result<Vec<NotificationPlan>, AppError> {
        self.query_eq(collections::NOTIFICATION_PLANS, "batch_id", batch_id)
            .await
    }

    pub async fn notification_plans_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<NotificationPlan>, AppError> {
        self.query_eq(collections::NOTIFICATION_PLANS, "user_id", user_id)
            .await
    }

    /// Upcoming notification plans of one user, soonest first.
    pub async fn upcoming_notification_plans(
        &self,
        user_id: &str,
        after: &str,
    ) -> Result<Vec<NotificationPlan>, AppError> {
        let user_id = user_id.to_string();
        let after = after.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATION_PLANS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("scheduled_at").greater_than(after.clone()),
                ])
            })
            .order_by([(
                "scheduled_at",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .limit(UPCOMING_LIMIT)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Notification plans scheduled in `(after, until]`, soonest first.
    ///
    /// Relies on timestamps being stored in the same fixed-width UTC format,
    /// so string comparison is chronological.
    pub async fn notification_plans_in_window(
        &self,
        after: &str,
        until: &str,
    ) -> Result<Vec<NotificationPlan>, AppError> {
        let after = after.to_string();
        let until = until.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATION_PLANS)
            .filter(move |q| {
                q.for_all([
                    q.field("scheduled_at").greater_than(after.clone()),
                    q.field("scheduled_at").less_than_or_equal(until.clone()),
                ])
            })
            .order_by([(
                "scheduled_at",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    pub async fn delete_notification_plans(&self, ids: &[String]) -> Result<(), AppError> {
        self.batch_delete(collections::NOTIFICATION_PLANS, ids)
            .await
    }

    /// Best-effort deletion of notification plans; returns IDs that failed.
    pub async fn delete_notification_plans_each(&self, ids: &[String]) -> Vec<String> {
        self.delete_each(collections::NOTIFICATION_PLANS, ids).await
    }

    // ─── Exercise History Operations ─────────────────────────────

    pub async fn add_history(&self, entry: &ExerciseHistory) -> Result<(), AppError> {
        self.set_doc(collections::EXERCISES_HISTORY, &entry.id, entry)
            .await
    }

    /// History entries matching the query, newest first.
    pub async fn query_history(&self, query: &HistoryQuery) -> Result<Vec<ExerciseHistory>, AppError> {
        let HistoryQuery {
            user_id,
            from,
            to,
            limit,
            offset,
        } = query.clone();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::EXERCISES_HISTORY)
            .filter(move |q| {
                q.for_all([
                    user_id
                        .as_ref()
                        .and_then(|u| q.field("user_id").eq(u.clone())),
                    from.as_ref()
                        .and_then(|f| q.field("completed_at").greater_than_or_equal(f.clone())),
                    to.as_ref()
                        .and_then(|t| q.field("completed_at").less_than(t.clone())),
                ])
            })
            .order_by([(
                "completed_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    pub async fn history_for_user(&self, user_id: &str) -> Result<Vec<ExerciseHistory>, AppError> {
        self.query_eq(collections::EXERCISES_HISTORY, "user_id", user_id)
            .await
    }

    pub async fn delete_history(&self, ids: &[String]) -> Result<(), AppError> {
        self.batch_delete(collections::EXERCISES_HISTORY, ids).await
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, id).await
    }

    /// Fetch users by ID in the given order; missing ones are `None`.
    pub async fn get_users(&self, ids: &[String]) -> Result<Vec<Option<User>>, AppError> {
        self.get_many(collections::USERS, ids).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.list_all(collections::USERS).await?;
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &user.id, user).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::USERS, id).await
    }

    // ─── Motivo Operations ───────────────────────────────────────

    pub async fn get_motivo(&self, id: &str) -> Result<Option<Motivo>, AppError> {
        self.get_doc(collections::MOTIVOS, id).await
    }

    pub async fn list_motivos(&self) -> Result<Vec<Motivo>, AppError> {
        let mut motivos: Vec<Motivo> = self.list_all(collections::MOTIVOS).await?;
        motivos.sort_by(|a, b| a.description.cmp(&b.description));
        Ok(motivos)
    }

    pub async fn set_motivo(&self, motivo: &Motivo) -> Result<(), AppError> {
        self.set_doc(collections::MOTIVOS, &motivo.id, motivo).await
    }

    pub async fn delete_motivo(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::MOTIVOS, id).await
    }

    // ─── Pause Operations ────────────────────────────────────────

    pub async fn add_pause(&self, pause: &Pause) -> Result<(), AppError> {
        self.set_doc(collections::PAUSES, &pause.id, pause).await
    }

    /// Pauses, optionally for one user, newest first.
    pub async fn list_pauses(&self, user_id: Option<&str>) -> Result<Vec<Pause>, AppError> {
        let mut pauses: Vec<Pause> = match user_id {
            Some(user_id) => self.query_eq(collections::PAUSES, "user_id", user_id).await?,
            None => self.list_all(collections::PAUSES).await?,
        };
        pauses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pauses)
    }

    pub async fn delete_pauses(&self, ids: &[String]) -> Result<(), AppError> {
        self.batch_delete(collections::PAUSES, ids).await
    }
}
