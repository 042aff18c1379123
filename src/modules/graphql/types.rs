use async_graphql::{Enum, Json, SimpleObject};
use uuid::Uuid;

use crate::modules::call::model::CallResponse;
use crate::modules::message::model::MessageResponse;
use crate::modules::realtime::message::ServerEvent;

/// Authenticated user of the current request or subscription connection.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Uuid);

#[derive(Debug, Clone, SimpleObject)]
pub struct MessageUpdate {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    /// Absent when the message was deleted.
    pub message: Option<MessageResponse>,
    pub deleted: bool,
}

impl MessageUpdate {
    pub fn from_event(event: &ServerEvent) -> Option<Self> {
        match event {
            ServerEvent::MessageEdited { conversation_id, message } => Some(MessageUpdate {
                conversation_id: *conversation_id,
                message_id: message.id,
                message: Some(message.clone()),
                deleted: false,
            }),
            ServerEvent::MessageDeleted { conversation_id, message_id } => Some(MessageUpdate {
                conversation_id: *conversation_id,
                message_id: *message_id,
                message: None,
                deleted: true,
            }),
            _ => None,
        }
    }
}

/// Either another participant's read marker or the viewer's own unread counter.
#[derive(Debug, Clone, SimpleObject)]
pub struct ReadStateChange {
    pub conversation_id: Uuid,
    pub user_id: Option<Uuid>,
    pub last_read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub unread_count: Option<i32>,
}

impl ReadStateChange {
    pub fn from_event(event: &ServerEvent) -> Option<Self> {
        match event {
            ServerEvent::MessagesRead { conversation_id, user_id, last_read_at } => {
                Some(ReadStateChange {
                    conversation_id: *conversation_id,
                    user_id: Some(*user_id),
                    last_read_at: *last_read_at,
                    unread_count: None,
                })
            }
            ServerEvent::UnreadCountChanged { conversation_id, unread_count } => {
                Some(ReadStateChange {
                    conversation_id: *conversation_id,
                    user_id: None,
                    last_read_at: None,
                    unread_count: Some(*unread_count),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum CallEventKind {
    Incoming,
    Updated,
    Signal,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct CallEvent {
    pub kind: CallEventKind,
    pub call_id: Uuid,
    pub call: Option<CallResponse>,
    pub from_user_id: Option<Uuid>,
    pub payload: Option<Json<serde_json::Value>>,
}

impl CallEvent {
    pub fn from_event(event: &ServerEvent) -> Option<Self> {
        let (kind, call) = match event {
            ServerEvent::CallIncoming { call } => (CallEventKind::Incoming, call),
            ServerEvent::CallUpdated { call } => (CallEventKind::Updated, call),
            ServerEvent::CallSignal { call_id, from_user_id, payload } => {
                return Some(CallEvent {
                    kind: CallEventKind::Signal,
                    call_id: *call_id,
                    call: None,
                    from_user_id: Some(*from_user_id),
                    payload: Some(Json(payload.clone())),
                });
            }
            _ => return None,
        };

        Some(CallEvent {
            kind,
            call_id: call.id,
            call: Some(call.clone()),
            from_user_id: None,
            payload: None,
        })
    }
}

/// Any hub event in its `/ws` JSON shape.
#[derive(Debug, Clone, SimpleObject)]
pub struct EventEnvelope {
    #[graphql(name = "type")]
    pub event_type: String,
    pub payload: Json<serde_json::Value>,
}

impl EventEnvelope {
    pub fn from_event(event: &ServerEvent) -> Option<Self> {
        let payload = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to encode event for GraphQL: {e}");
                return None;
            }
        };
        let event_type = payload.get("type")?.as_str()?.to_string();

        Some(EventEnvelope { event_type, payload: Json(payload) })
    }
}
