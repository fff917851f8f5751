//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Access level of an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Resolve the role for an email address.
    pub fn for_email(email: &str, admin_email: &str) -> Self {
        if email.trim().eq_ignore_ascii_case(admin_email.trim()) {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Firebase Auth UID (also used as document ID)
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Cloud Messaging registration token of the user's device
    #[serde(default)]
    pub fcm_token: Option<String>,
    /// When the profile was created
    pub created_at: String,
    /// Last successful login
    #[serde(default)]
    pub last_login: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_for_email_is_case_insensitive() {
        assert_eq!(
            Role::for_email("Admin@EcoBreak.test ", "admin@ecobreak.test"),
            Role::Admin
        );
        assert_eq!(
            Role::for_email("someone@ecobreak.test", "admin@ecobreak.test"),
            Role::User
        );
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
