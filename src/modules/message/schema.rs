use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageEntity {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    /// Set for direct conversations only.
    pub receiver_id: Option<Uuid>,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_edited: bool,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl MessageEntity {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
