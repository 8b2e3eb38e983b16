//! Domain service for signup and login.

use crate::models::{NewUser, User};
use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username taken: {0}")]
    UsernameTaken(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository errors carrying a `DbErr` become `Database`, the rest `Internal`.
impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sea_orm::DbErr>().is_some() {
            Self::Database(format!("{err:#}"))
        } else {
            Self::Internal(err.to_string())
        }
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] if the username already exists;
    /// nothing is persisted in that case.
    async fn signup(&self, new_user: NewUser) -> Result<User, AuthError>;

    /// Verifies credentials and returns the account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown username or a
    /// wrong password.
    async fn login(&self, username: &str, password: &str) -> Result<User, AuthError>;
}
