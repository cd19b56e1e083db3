use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dates;
use super::product::null_as_default;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// A `users/{uid}` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "dates::instant")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for updating a profile.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub role: Option<Role>,
}

impl UserProfile {
    /// Creates a profile for a freshly registered account.
    ///
    /// # Notes
    /// New accounts always start with the `user` role; promotion to admin
    /// happens outside the running application.
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            role: Role::User,
            created_at: Some(Utc::now()),
        }
    }
}

/// The signed-in user as seen by the workflows.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name shown on orders when the account has none.
    pub fn order_name(&self) -> &str {
        self.display_name.as_deref().filter(|n| !n.is_empty()).unwrap_or("User")
    }
}
