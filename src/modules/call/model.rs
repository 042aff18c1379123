use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::call::schema::{CallEntity, CallKind, CallStatus};

#[derive(Debug, Clone)]
pub struct InsertCall {
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub kind: CallKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, async_graphql::SimpleObject)]
#[graphql(name = "Call")]
pub struct CallResponse {
    pub id: Uuid,
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub kind: CallKind,
    pub status: CallStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub answered_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<CallEntity> for CallResponse {
    fn from(entity: CallEntity) -> Self {
        CallResponse {
            id: entity.id,
            caller_id: entity.caller_id,
            callee_id: entity.callee_id,
            conversation_id: entity.conversation_id,
            kind: entity.kind,
            status: entity.status,
            started_at: entity.started_at,
            answered_at: entity.answered_at,
            ended_at: entity.ended_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartCall {
    pub callee_id: Uuid,
    pub kind: CallKind,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallSignal {
    pub payload: serde_json::Value,
}
