//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.
//! The password hash never lives on [`User`]; it is only read through the
//! repository for verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authentic_core::{Email, UserId, UserRole};

/// A storefront account (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email (unique, case-insensitive).
    pub email: Email,
    /// Profile picture URL, usually from Google.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Google account subject id, when linked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    /// Account role.
    pub role: UserRole,
    /// Contact phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Saved delivery address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<UserAddress>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the account holds the admin role right now.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A saved address on a user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Data needed to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub google_id: Option<String>,
    pub image: Option<String>,
}

impl NewUser {
    /// Materialise the account with a fresh id.
    #[must_use]
    pub fn into_user(self, now: DateTime<Utc>) -> (User, String) {
        let user = User {
            id: UserId::generate(),
            name: self.name,
            email: self.email,
            image: self.image,
            google_id: self.google_id,
            role: self.role,
            phone: self.phone,
            address: None,
            created_at: now,
            updated_at: now,
        };
        (user, self.password_hash)
    }
}

/// Account summary returned alongside a fresh bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}
