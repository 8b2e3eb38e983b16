use crate::domain::{MessageId, UserId};
use crate::entities::messages;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub user_id: UserId,
    pub text: String,
    pub img: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<messages::Model> for Message {
    fn from(model: messages::Model) -> Self {
        Self {
            id: MessageId::new(model.id),
            user_id: UserId::new(model.user_id),
            text: model.text,
            img: model.img,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Validated text and image for a new or edited message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub text: String,
    pub img: Option<String>,
}
