use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::notification::schema::{NotificationEntity, NotificationKind};

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub actor_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub call_id: Option<Uuid>,
    pub body: Option<String>,
}

impl NewNotification {
    pub fn new(recipient_id: Uuid, kind: NotificationKind) -> Self {
        NewNotification {
            recipient_id,
            kind,
            actor_id: None,
            message_id: None,
            conversation_id: None,
            call_id: None,
            body: None,
        }
    }

    pub fn actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn message(mut self, message_id: Uuid) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn call(mut self, call_id: Uuid) -> Self {
        self.call_id = Some(call_id);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, async_graphql::SimpleObject)]
#[graphql(name = "Notification")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub actor_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub call_id: Option<Uuid>,
    pub body: Option<String>,
    pub is_read: bool,
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<NotificationEntity> for NotificationResponse {
    fn from(entity: NotificationEntity) -> Self {
        NotificationResponse {
            id: entity.id,
            recipient_id: entity.recipient_id,
            kind: entity.kind,
            actor_id: entity.actor_id,
            message_id: entity.message_id,
            conversation_id: entity.conversation_id,
            call_id: entity.call_id,
            body: entity.body,
            is_read: entity.read_at.is_some(),
            read_at: entity.read_at,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadNotificationCount {
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, async_graphql::SimpleObject)]
pub struct MarkAllReadResult {
    pub updated: u64,
    pub unread_count: i64,
}
