/// Realtime wire protocol
///
/// JSON frames exchanged over `/ws`. Server frames are the same `ServerEvent`
/// values the hub fans out to GraphQL subscriptions.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::call::model::CallResponse;
use crate::modules::conversation::model::ConversationDetail;
use crate::modules::message::model::{MessageResponse, UnreadCount};
use crate::modules::notification::model::NotificationResponse;

/// Frames sent by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Authenticate the socket with an access token
    #[serde(rename_all = "camelCase")]
    Auth { token: String },

    #[serde(rename_all = "camelCase")]
    SendMessage { conversation_id: Uuid, content: String, file_url: Option<String> },

    /// Join a conversation room to receive typing indicators
    #[serde(rename_all = "camelCase")]
    JoinConversation { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    LeaveConversation { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    TypingStart { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    TypingStop { conversation_id: Uuid },

    /// Mark everything in the conversation as read
    #[serde(rename_all = "camelCase")]
    MarkRead { conversation_id: Uuid },

    Ping,
}

/// Events delivered to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    AuthSuccess { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    AuthFailed { reason: String },

    /// A message was persisted; carries every participant's unread count
    #[serde(rename_all = "camelCase")]
    NewMessage { conversation_id: Uuid, message: MessageResponse, unread_counts: Vec<UnreadCount> },

    #[serde(rename_all = "camelCase")]
    MessageEdited { conversation_id: Uuid, message: MessageResponse },

    #[serde(rename_all = "camelCase")]
    MessageDeleted { conversation_id: Uuid, message_id: Uuid },

    /// Another participant moved their read marker
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        conversation_id: Uuid,
        user_id: Uuid,
        last_read_at: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// The receiving user's own unread counter for a conversation
    #[serde(rename_all = "camelCase")]
    UnreadCountChanged { conversation_id: Uuid, unread_count: i32 },

    #[serde(rename_all = "camelCase")]
    ConversationCreated { conversation: ConversationDetail },

    #[serde(rename_all = "camelCase")]
    NotificationAdded { notification: NotificationResponse },

    #[serde(rename_all = "camelCase")]
    NotificationCountChanged { unread_count: i64 },

    #[serde(rename_all = "camelCase")]
    CallIncoming { call: CallResponse },

    #[serde(rename_all = "camelCase")]
    CallUpdated { call: CallResponse },

    /// Opaque WebRTC payload (SDP offer/answer or ICE candidate)
    #[serde(rename_all = "camelCase")]
    CallSignal { call_id: Uuid, from_user_id: Uuid, payload: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    PresenceChanged {
        user_id: Uuid,
        is_online: bool,
        last_seen: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// Peers online at the time the subscriber connected
    #[serde(rename_all = "camelCase")]
    OnlineUsers { user_ids: Vec<Uuid> },

    #[serde(rename_all = "camelCase")]
    UserTyping { conversation_id: Uuid, user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    UserStoppedTyping { conversation_id: Uuid, user_id: Uuid },

    Pong,

    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

impl ServerEvent {
    /// Conversation the event belongs to, if any.
    pub fn conversation_id(&self) -> Option<Uuid> {
        match self {
            ServerEvent::NewMessage { conversation_id, .. }
            | ServerEvent::MessageEdited { conversation_id, .. }
            | ServerEvent::MessageDeleted { conversation_id, .. }
            | ServerEvent::MessagesRead { conversation_id, .. }
            | ServerEvent::UnreadCountChanged { conversation_id, .. }
            | ServerEvent::UserTyping { conversation_id, .. }
            | ServerEvent::UserStoppedTyping { conversation_id, .. } => Some(*conversation_id),
            ServerEvent::ConversationCreated { conversation } => Some(conversation.id),
            _ => None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error { message: message.into() }
    }
}
