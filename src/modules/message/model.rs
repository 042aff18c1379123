use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error;
use crate::constants::MAX_MESSAGE_LEN;
use crate::modules::message::schema::MessageEntity;

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub content: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, async_graphql::SimpleObject)]
#[graphql(name = "Message")]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_edited: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<MessageEntity> for MessageResponse {
    fn from(entity: MessageEntity) -> Self {
        MessageResponse {
            id: entity.id,
            conversation_id: entity.conversation_id,
            sender_id: entity.sender_id,
            receiver_id: entity.receiver_id,
            content: entity.content,
            file_url: entity.file_url,
            is_read: entity.read_at.is_some(),
            read_at: entity.read_at,
            is_edited: entity.is_edited,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, async_graphql::SimpleObject)]
pub struct UnreadCount {
    pub user_id: Uuid,
    pub unread_count: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendDirectMessage {
    pub receiver_id: Uuid,
    #[validate(length(max = 4000, message = "Message is too long"))]
    pub content: Option<String>,
    #[validate(length(max = 2048, message = "File URL is too long"))]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendConversationMessage {
    #[validate(length(max = 4000, message = "Message is too long"))]
    pub content: Option<String>,
    #[validate(length(max = 2048, message = "File URL is too long"))]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EditMessage {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1 to 4000 characters"))]
    pub content: String,
}

/// Trims the body and rejects messages that carry neither text nor a file.
pub fn normalize_body(
    content: Option<String>,
    file_url: Option<String>,
) -> Result<(Option<String>, Option<String>), error::SystemError> {
    let content = content.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    let file_url = file_url.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());

    if content.is_none() && file_url.is_none() {
        return Err(error::SystemError::bad_request("Message content cannot be empty"));
    }

    if content.as_ref().is_some_and(|c| c.chars().count() > MAX_MESSAGE_LEN) {
        return Err(error::SystemError::bad_request("Message is too long"));
    }

    Ok((content, file_url))
}

/// Short text used in notification bodies.
pub fn preview(content: Option<&str>, file_url: Option<&str>) -> String {
    match (content, file_url) {
        (Some(text), _) if text.chars().count() > 80 => {
            format!("{}...", text.chars().take(80).collect::<String>())
        }
        (Some(text), _) => text.to_string(),
        (None, Some(_)) => "Sent an attachment".to_string(),
        (None, None) => String::new(),
    }
}
