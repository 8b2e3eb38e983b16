use crate::domain::{MessageId, UserId};
use crate::entities::{messages, prelude::*};
use crate::models::{Message, MessageDraft};
use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

/// Repository for message operations.
///
/// Every lookup and mutation is scoped by owner, so a message id that belongs
/// to someone else is indistinguishable from a missing one.
pub struct MessageRepository {
    conn: DatabaseConnection,
}

impl MessageRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, user_id: UserId, draft: &MessageDraft) -> Result<Message> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = messages::ActiveModel {
            text: Set(draft.text.clone()),
            img: Set(draft.img.clone()),
            user_id: Set(user_id.value()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert message")?;

        info!("User {} created message {}", user_id, model.id);
        Ok(Message::from(model))
    }

    /// Newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Message>> {
        let rows = Messages::find()
            .filter(messages::Column::UserId.eq(user_id.value()))
            .order_by_desc(messages::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list messages")?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    pub async fn count_for_user(&self, user_id: UserId) -> Result<u64> {
        Messages::find()
            .filter(messages::Column::UserId.eq(user_id.value()))
            .count(&self.conn)
            .await
            .context("Failed to count messages")
    }

    pub async fn get_owned(&self, user_id: UserId, id: MessageId) -> Result<Option<Message>> {
        let row = self.find_owned(user_id, id).await?;
        Ok(row.map(Message::from))
    }

    pub async fn update_owned(
        &self,
        user_id: UserId,
        id: MessageId,
        draft: &MessageDraft,
    ) -> Result<Option<Message>> {
        let Some(row) = self.find_owned(user_id, id).await? else {
            return Ok(None);
        };

        let mut active: messages::ActiveModel = row.into();
        active.text = Set(draft.text.clone());
        active.img = Set(draft.img.clone());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update message")?;

        Ok(Some(Message::from(model)))
    }

    pub async fn delete_owned(&self, user_id: UserId, id: MessageId) -> Result<bool> {
        let result = Messages::delete_many()
            .filter(messages::Column::Id.eq(id.value()))
            .filter(messages::Column::UserId.eq(user_id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to delete message")?;

        if result.rows_affected > 0 {
            info!("User {} deleted message {}", user_id, id);
        }
        Ok(result.rows_affected > 0)
    }

    async fn find_owned(&self, user_id: UserId, id: MessageId) -> Result<Option<messages::Model>> {
        Messages::find_by_id(id.value())
            .filter(messages::Column::UserId.eq(user_id.value()))
            .one(&self.conn)
            .await
            .context("Failed to query message")
    }
}
