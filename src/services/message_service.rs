//! Domain service for a user's own messages.
//!
//! Every operation takes the owning [`UserId`]; a message owned by someone
//! else is reported as [`MessageError::NotFound`].

use crate::domain::{MessageId, UserId};
use crate::models::{Message, MessageDraft};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Message not found: {0}")]
    NotFound(MessageId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository errors carrying a `DbErr` become `Database`, the rest `Internal`.
impl From<anyhow::Error> for MessageError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sea_orm::DbErr>().is_some() {
            Self::Database(format!("{err:#}"))
        } else {
            Self::Internal(err.to_string())
        }
    }
}

#[async_trait::async_trait]
pub trait MessageService: Send + Sync {
    async fn list_messages(&self, owner: UserId) -> Result<Vec<Message>, MessageError>;

    async fn get_message(&self, owner: UserId, id: MessageId) -> Result<Message, MessageError>;

    async fn create_message(
        &self,
        owner: UserId,
        draft: MessageDraft,
    ) -> Result<Message, MessageError>;

    async fn update_message(
        &self,
        owner: UserId,
        id: MessageId,
        draft: MessageDraft,
    ) -> Result<Message, MessageError>;

    async fn delete_message(&self, owner: UserId, id: MessageId) -> Result<(), MessageError>;
}
