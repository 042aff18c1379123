use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{
        model::{ConversationDetail, ReadOutcome},
        schema::{ConversationEntity, ParticipantEntity},
    },
};

#[async_trait::async_trait]
pub trait ConversationRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Returns the direct conversation of the pair, creating it with both
    /// participants when absent. Safe under concurrent calls for the same pair.
    async fn find_or_create_direct(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError>;

    async fn create_group(
        &self,
        name: &str,
        owner_id: &Uuid,
        member_ids: &[Uuid],
    ) -> Result<ConversationEntity, error::SystemError>;

    async fn find_detail(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationDetail>, error::SystemError>;

    /// Conversations of the user, most recent activity first.
    async fn find_details_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationDetail>, error::SystemError>;
}

#[async_trait::async_trait]
pub trait ParticipantRepository {
    async fn find_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ParticipantEntity>, error::SystemError>;

    async fn find_participant_ids(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError>;

    async fn get_unread_counts(
        &self,
        conversation_id: &Uuid,
    ) -> Result<HashMap<Uuid, i32>, error::SystemError>;

    /// Users sharing at least one conversation with `user_id`.
    async fn find_peer_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError>;

    /// Advances the read marker to `until` (never backwards), stamps `read_at`
    /// on direct messages addressed to the user up to that point and recounts
    /// the unread counter from the message table. `None` reads up to the
    /// newest live message at the time the read is applied.
    async fn mark_read_until(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        until: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<ReadOutcome, error::SystemError>;
}
