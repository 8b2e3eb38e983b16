//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::SecurityConfig;
use crate::db::{Store, is_unique_violation};
use crate::models::{NewUser, User};
use crate::services::auth_service::{AuthError, AuthService};
use async_trait::async_trait;

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(&self, new_user: NewUser) -> Result<User, AuthError> {
        // skips the hash for the common case; the unique index settles races
        if self
            .store
            .get_user_by_username(&new_user.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken(new_user.username));
        }

        match self.store.create_user(&new_user, &self.security).await {
            Ok(user) => {
                metrics::counter!("postboard_signups_total").increment(1);
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(AuthError::UsernameTaken(new_user.username)),
            Err(e) => Err(e.into()),
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self.store.verify_user_password(username, password).await?;

        let outcome = if user.is_some() { "success" } else { "failure" };
        metrics::counter!("postboard_logins_total", "outcome" => outcome).increment(1);

        user.ok_or(AuthError::InvalidCredentials)
    }
}
