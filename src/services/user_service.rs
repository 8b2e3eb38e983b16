//! Domain service for browsing and managing accounts.

use crate::domain::UserId;
use crate::models::{ProfileUpdate, User};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(UserId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository errors carrying a `DbErr` become `Database`, the rest `Internal`.
impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sea_orm::DbErr>().is_some() {
            Self::Database(format!("{err:#}"))
        } else {
            Self::Internal(err.to_string())
        }
    }
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, UserError>;

    /// # Errors
    ///
    /// Returns [`UserError::NotFound`] if no such user exists.
    async fn get_user(&self, id: UserId) -> Result<User, UserError>;

    /// Changes first and last name. The username is immutable.
    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<User, UserError>;

    /// Deletes the account together with its messages.
    async fn delete_user(&self, id: UserId) -> Result<(), UserError>;
}
