/// Hub actor messages
use actix::prelude::*;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::message::ServerEvent;

/// Outbound channel of one subscriber (a `/ws` session or a GraphQL subscription).
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tx: EventSender,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct JoinRoom {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct LeaveRoom {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
}

/// Deliver an event to every subscriber of every listed user
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Publish {
    pub user_ids: Vec<Uuid>,
    pub event: ServerEvent,
    /// Subscriber that should not receive its own echo
    pub skip_subscriber: Option<Uuid>,
}

impl Publish {
    pub fn to(user_ids: Vec<Uuid>, event: ServerEvent) -> Self {
        Publish { user_ids, event, skip_subscriber: None }
    }

    pub fn to_user(user_id: Uuid, event: ServerEvent) -> Self {
        Self::to(vec![user_id], event)
    }
}

/// Broadcast to users that joined the conversation room. Ignored when the
/// sender is not in the room.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct BroadcastToRoom {
    pub conversation_id: Uuid,
    pub event: ServerEvent,
    pub skip_user_id: Option<Uuid>,
}

#[derive(Message)]
#[rtype(result = "Vec<Uuid>")]
pub struct GetOnlineUsers;

#[derive(Message)]
#[rtype(result = "bool")]
pub struct IsOnline {
    pub user_id: Uuid,
}
