use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize, async_graphql::Enum)]
#[sqlx(type_name = "call_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize, async_graphql::Enum)]
#[sqlx(type_name = "call_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ringing,
    Accepted,
    Rejected,
    Missed,
    Ended,
}

impl CallStatus {
    /// `ringing -> accepted | rejected | missed`, `accepted -> ended`.
    pub fn can_transition_to(self, next: CallStatus) -> bool {
        matches!(
            (self, next),
            (CallStatus::Ringing, CallStatus::Accepted)
                | (CallStatus::Ringing, CallStatus::Rejected)
                | (CallStatus::Ringing, CallStatus::Missed)
                | (CallStatus::Accepted, CallStatus::Ended)
        )
    }

    /// Ringing or in progress; a user with a live call is busy.
    pub fn is_live(self) -> bool {
        matches!(self, CallStatus::Ringing | CallStatus::Accepted)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CallEntity {
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

impl CallEntity {
    pub fn involves(&self, user_id: &Uuid) -> bool {
        &self.caller_id == user_id || &self.callee_id == user_id
    }

    pub fn other_party(&self, user_id: &Uuid) -> Uuid {
        if &self.caller_id == user_id { self.callee_id } else { self.caller_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(CallStatus::Ringing.can_transition_to(CallStatus::Accepted));
        assert!(CallStatus::Ringing.can_transition_to(CallStatus::Rejected));
        assert!(CallStatus::Ringing.can_transition_to(CallStatus::Missed));
        assert!(CallStatus::Accepted.can_transition_to(CallStatus::Ended));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!CallStatus::Ringing.can_transition_to(CallStatus::Ended));
        assert!(!CallStatus::Accepted.can_transition_to(CallStatus::Rejected));
        assert!(!CallStatus::Accepted.can_transition_to(CallStatus::Missed));
        for terminal in [CallStatus::Rejected, CallStatus::Missed, CallStatus::Ended] {
            assert!(!terminal.is_live());
            assert!(!terminal.can_transition_to(CallStatus::Accepted));
            assert!(!terminal.can_transition_to(CallStatus::Ended));
        }
    }
}
