use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tokio::task;
use tracing::info;

use crate::config::SecurityConfig;
use crate::domain::UserId;
use crate::entities::{messages, prelude::*, users};
use crate::models::{NewUser, ProfileUpdate, User};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Hashes the password and inserts the account.
    ///
    /// A taken username surfaces as a unique-constraint error; check it with
    /// [`is_unique_violation`].
    pub async fn create(&self, new_user: &NewUser, security: &SecurityConfig) -> Result<User> {
        let password = new_user.password.clone();
        let security = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            first_name: Set(new_user.first_name.clone()),
            last_name: Set(new_user.last_name.clone()),
            username: Set(new_user.username.clone()),
            password_hash: Set(password_hash),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        info!("Created user {} ({})", model.username, model.id);
        Ok(User::from(model))
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        Users::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    /// Checks a username/password pair and returns the account on success.
    /// Argon2 verification runs on the blocking pool.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid.then(|| User::from(user)))
    }

    pub async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<Option<User>> {
        let Some(user) = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user for profile update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        active.first_name = Set(update.first_name.clone());
        active.last_name = Set(update.last_name.clone());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        Ok(Some(User::from(model)))
    }

    /// Deletes the account and every message it owns in one transaction.
    pub async fn delete(&self, id: UserId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let removed_messages = Messages::delete_many()
            .filter(messages::Column::UserId.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to delete user messages")?
            .rows_affected;

        let removed = Users::delete_by_id(id.value())
            .exec(&txn)
            .await
            .context("Failed to delete user")?
            .rows_affected;

        txn.commit().await?;

        if removed > 0 {
            info!("Deleted user {} and {} message(s)", id, removed_messages);
        }
        Ok(removed > 0)
    }
}

/// True when the error chain carries a unique-constraint violation.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>()
        .and_then(DbErr::sql_err)
        .is_some_and(|e| matches!(e, SqlErr::UniqueConstraintViolation(_)))
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, the crate's default params are used.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
