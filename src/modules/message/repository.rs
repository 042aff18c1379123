use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{model::InsertMessage, schema::MessageEntity},
    utils::Cursor,
};

#[async_trait::async_trait]
pub trait MessageRepository {
    /// Inserts the message, bumps the unread counter of every other
    /// participant and moves the conversation's last-message pointer, as
    /// one unit.
    async fn create(&self, message: &InsertMessage) -> Result<MessageEntity, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError>;

    /// Live messages strictly before the cursor in `(created_at, id)` order,
    /// newest first.
    async fn find_page(
        &self,
        conversation_id: &Uuid,
        before: Option<Cursor>,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError>;

    async fn edit(
        &self,
        id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, error::SystemError>;

    /// Soft deletes the message, then recounts unread counters and the
    /// last-message pointer of its conversation. Returns false when nothing
    /// was deleted.
    async fn soft_delete(&self, id: &Uuid, sender_id: &Uuid) -> Result<bool, error::SystemError>;
}
