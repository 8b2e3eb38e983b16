//! `SeaORM` implementation of the `UserService` trait.

use crate::db::Store;
use crate::domain::UserId;
use crate::models::{ProfileUpdate, User};
use crate::services::user_service::{UserError, UserService};
use async_trait::async_trait;

pub struct SeaOrmUserService {
    store: Store,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list_users(&self) -> Result<Vec<User>, UserError> {
        Ok(self.store.list_users().await?)
    }

    async fn get_user(&self, id: UserId) -> Result<User, UserError> {
        self.store
            .get_user(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<User, UserError> {
        self.store
            .update_user_profile(id, &update)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    async fn delete_user(&self, id: UserId) -> Result<(), UserError> {
        if self.store.delete_user(id).await? {
            Ok(())
        } else {
            Err(UserError::NotFound(id))
        }
    }
}
