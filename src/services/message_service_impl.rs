//! `SeaORM` implementation of the `MessageService` trait.

use crate::db::Store;
use crate::domain::{MessageId, UserId};
use crate::models::{Message, MessageDraft};
use crate::services::message_service::{MessageError, MessageService};
use async_trait::async_trait;

pub struct SeaOrmMessageService {
    store: Store,
}

impl SeaOrmMessageService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageService for SeaOrmMessageService {
    async fn list_messages(&self, owner: UserId) -> Result<Vec<Message>, MessageError> {
        Ok(self.store.list_messages(owner).await?)
    }

    async fn get_message(&self, owner: UserId, id: MessageId) -> Result<Message, MessageError> {
        self.store
            .get_message(owner, id)
            .await?
            .ok_or(MessageError::NotFound(id))
    }

    async fn create_message(
        &self,
        owner: UserId,
        draft: MessageDraft,
    ) -> Result<Message, MessageError> {
        Ok(self.store.create_message(owner, &draft).await?)
    }

    async fn update_message(
        &self,
        owner: UserId,
        id: MessageId,
        draft: MessageDraft,
    ) -> Result<Message, MessageError> {
        self.store
            .update_message(owner, id, &draft)
            .await?
            .ok_or(MessageError::NotFound(id))
    }

    async fn delete_message(&self, owner: UserId, id: MessageId) -> Result<(), MessageError> {
        if self.store.delete_message(owner, id).await? {
            Ok(())
        } else {
            Err(MessageError::NotFound(id))
        }
    }
}
