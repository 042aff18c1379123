use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::constants::MAX_GROUP_NAME_LEN;
use crate::modules::conversation::schema::ConversationType;
use crate::modules::message::model::MessageResponse;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, async_graphql::SimpleObject)]
#[graphql(name = "Participant")]
pub struct ParticipantRow {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub unread_count: i32,
    pub last_read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParticipantDetailWithConversation {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub unread_count: i32,
    pub last_read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl From<ParticipantDetailWithConversation> for ParticipantRow {
    fn from(p: ParticipantDetailWithConversation) -> Self {
        ParticipantRow {
            user_id: p.user_id,
            display_name: p.display_name,
            avatar_url: p.avatar_url,
            is_active: p.is_active,
            unread_count: p.unread_count,
            last_read_at: p.last_read_at,
            joined_at: p.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, async_graphql::SimpleObject)]
#[graphql(name = "Conversation")]
pub struct ConversationDetail {
    pub id: Uuid,
    #[serde(rename = "type")]
    #[graphql(name = "type")]
    pub _type: ConversationType,
    pub name: Option<String>,
    pub created_by: Uuid,
    pub last_message: Option<MessageResponse>,
    pub participants: Vec<ParticipantRow>,
    /// Unread count of the user the detail was loaded for.
    pub unread_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationDetail {
    pub fn for_viewer(mut self, viewer: &Uuid) -> Self {
        self.unread_count = self
            .participants
            .iter()
            .find(|p| &p.user_id == viewer)
            .map_or(0, |p| p.unread_count);
        self
    }

    pub fn participant_ids(&self) -> Vec<Uuid> {
        self.participants.iter().map(|p| p.user_id).collect()
    }
}

/// Result of advancing a participant's read marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub last_read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub unread_count: i32,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, async_graphql::SimpleObject)]
pub struct ReadReceipt {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub last_read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub unread_count: i32,
    /// False when the call did not move the read marker (already read).
    pub changed: bool,
}

impl ReadReceipt {
    pub fn new(conversation_id: Uuid, user_id: Uuid, outcome: ReadOutcome) -> Self {
        ReadReceipt {
            conversation_id,
            user_id,
            last_read_at: outcome.last_read_at,
            unread_count: outcome.unread_count,
            changed: outcome.changed,
        }
    }
}

/// Read markers only move forward.
pub fn advance_read_marker(
    current: Option<chrono::DateTime<chrono::Utc>>,
    until: chrono::DateTime<chrono::Utc>,
) -> chrono::DateTime<chrono::Utc> {
    match current {
        Some(current) if current >= until => current,
        _ => until,
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDirectConversation {
    pub peer_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGroupConversation {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "At least one member is required"))]
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageQueryRequest {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, async_graphql::SimpleObject)]
pub struct MessagePage {
    pub messages: Vec<MessageResponse>,
    /// Opaque position to pass as `cursor` for the next (older) page.
    pub next_cursor: Option<String>,
}

pub fn normalize_group_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_GROUP_NAME_LEN {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_read_marker_never_moves_backwards() {
        let now = Utc::now();
        let earlier = now - Duration::minutes(5);

        assert_eq!(advance_read_marker(None, earlier), earlier);
        assert_eq!(advance_read_marker(Some(earlier), now), now);
        assert_eq!(advance_read_marker(Some(now), earlier), now);
        assert_eq!(advance_read_marker(Some(now), now), now);
    }

    #[test]
    fn test_normalize_group_name() {
        assert_eq!(normalize_group_name("  Core team "), Some("Core team".to_string()));
        assert_eq!(normalize_group_name("   "), None);
        assert_eq!(normalize_group_name(&"x".repeat(MAX_GROUP_NAME_LEN + 1)), None);
    }

    #[test]
    fn test_detail_for_viewer_picks_own_unread_count() {
        let me = Uuid::now_v7();
        let other = Uuid::now_v7();
        let participant = |user_id, unread_count| ParticipantRow {
            user_id,
            display_name: "someone".into(),
            avatar_url: None,
            is_active: false,
            unread_count,
            last_read_at: None,
            joined_at: Utc::now(),
        };
        let detail = ConversationDetail {
            id: Uuid::now_v7(),
            _type: ConversationType::Direct,
            name: None,
            created_by: me,
            last_message: None,
            participants: vec![participant(me, 3), participant(other, 0)],
            unread_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(detail.clone().for_viewer(&me).unread_count, 3);
        assert_eq!(detail.for_viewer(&other).unread_count, 0);
    }
}
