//! Admin account management.
//!
//! # Usage
//!
//! ```bash
//! # Show who holds the admin role
//! authentic-cli admin list
//!
//! # Grant the admin role to an existing account
//! authentic-cli admin promote -e owner@authentic-ctg.com
//!
//! # Remove every admin account (e.g. before re-seeding a new owner)
//! authentic-cli admin purge --yes
//! ```
//!
//! A role change only reaches the API once the user signs in again: tokens
//! carry the role they were issued with.

use authentic_core::{Email, UserRole};
use thiserror::Error;

use authentic_api::db::RepositoryError;

use super::ConnectError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account with that email.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    /// Purge was not confirmed.
    #[error("Refusing to delete admin accounts without --yes")]
    NotConfirmed,
}

/// List every admin account.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), AdminError> {
    let store = super::connect_store().await?;
    let admins = store.users.list_by_role(UserRole::Admin).await?;

    if admins.is_empty() {
        tracing::warn!("No admin accounts found");
    }
    for admin in &admins {
        tracing::info!(
            id = %admin.id,
            email = %admin.email,
            name = %admin.name,
            created_at = %admin.created_at,
            "Admin account"
        );
    }
    tracing::info!(count = admins.len(), "Admin accounts listed");

    store.close().await;
    Ok(())
}

/// Grant the admin role to the account with `email`.
///
/// # Errors
///
/// Returns an error for a malformed email or an unknown account.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let store = super::connect_store().await?;
    let user = store
        .users
        .set_role(&email, UserRole::Admin)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;
    tracing::info!(id = %user.id, email = %user.email, "Account promoted to admin");

    store.close().await;
    Ok(())
}

/// Delete every admin account.
///
/// # Errors
///
/// Returns `AdminError::NotConfirmed` unless `confirmed` is set.
pub async fn purge(confirmed: bool) -> Result<(), AdminError> {
    if !confirmed {
        return Err(AdminError::NotConfirmed);
    }

    let store = super::connect_store().await?;
    let deleted = store.users.delete_by_role(UserRole::Admin).await?;
    tracing::warn!(count = deleted, "Deleted admin accounts");

    store.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_purge_requires_confirmation() {
        assert!(matches!(purge(false).await, Err(AdminError::NotConfirmed)));
    }

    #[tokio::test]
    async fn test_promote_rejects_bad_email() {
        assert!(matches!(
            promote("not-an-email").await,
            Err(AdminError::InvalidEmail(_))
        ));
    }
}
