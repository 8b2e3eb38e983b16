use crate::config::SecurityConfig;
use crate::domain::{MessageId, UserId};
use crate::models::{Message, MessageDraft, NewUser, ProfileUpdate, User};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::user::is_unique_violation;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn message_repo(&self) -> repositories::message::MessageRepository {
        repositories::message::MessageRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(&self, new_user: &NewUser, security: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new_user, security).await
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn user_count(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>> {
        self.user_repo().update_profile(id, update).await
    }

    pub async fn delete_user(&self, id: UserId) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // Messages

    pub async fn create_message(&self, user_id: UserId, draft: &MessageDraft) -> Result<Message> {
        self.message_repo().create(user_id, draft).await
    }

    pub async fn list_messages(&self, user_id: UserId) -> Result<Vec<Message>> {
        self.message_repo().list_for_user(user_id).await
    }

    pub async fn message_count(&self, user_id: UserId) -> Result<u64> {
        self.message_repo().count_for_user(user_id).await
    }

    pub async fn get_message(&self, user_id: UserId, id: MessageId) -> Result<Option<Message>> {
        self.message_repo().get_owned(user_id, id).await
    }

    pub async fn update_message(
        &self,
        user_id: UserId,
        id: MessageId,
        draft: &MessageDraft,
    ) -> Result<Option<Message>> {
        self.message_repo().update_owned(user_id, id, draft).await
    }

    pub async fn delete_message(&self, user_id: UserId, id: MessageId) -> Result<bool> {
        self.message_repo().delete_owned(user_id, id).await
    }
}
