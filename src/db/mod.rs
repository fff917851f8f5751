//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, HistoryQuery};

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    pub const CATEGORIES: &str = "categories";
    pub const PLANS: &str = "plans";
    pub const PROCESS_GROUPS: &str = "process_groups";
    pub const PROCESSES: &str = "processes";
    /// One document per (process occurrence, user)
    pub const NOTIFICATION_PLANS: &str = "notification_plans";
    pub const EXERCISES_HISTORY: &str = "exercises_history";
    pub const USERS: &str = "users";
    pub const MOTIVOS: &str = "motivos";
    pub const PAUSES: &str = "pauses";
}
