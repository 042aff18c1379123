use std::collections::HashMap;
use uuid::Uuid;

use crate::modules::conversation::model::{
    advance_read_marker, ConversationDetail, ParticipantDetailWithConversation, ParticipantRow,
    ReadOutcome,
};
use crate::modules::conversation::repository::{ConversationRepository, ParticipantRepository};
use crate::modules::conversation::schema::{
    direct_key, ConversationEntity, ConversationType, ParticipantEntity,
};
use crate::modules::message::{model::MessageResponse, schema::MessageEntity};
use crate::api::error;

#[derive(Clone)]
pub struct ConversationRepositoryPg {
    pool: sqlx::PgPool,
}

impl ConversationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn add_participants<'e, E>(
        conversation_id: &Uuid,
        user_ids: &[Uuid],
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO participants (conversation_id, user_id, unread_count, joined_at)
            SELECT $1, unnest($2::uuid[]), 0, NOW()
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(conversation_id)
        .bind(user_ids)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// Loads last messages and participants for a batch of conversations,
    /// keeping the input order.
    async fn assemble(
        &self,
        conversations: Vec<ConversationEntity>,
    ) -> Result<Vec<ConversationDetail>, error::SystemError> {
        if conversations.is_empty() {
            return Ok(vec![]);
        }

        let conversation_ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
        let last_message_ids: Vec<Uuid> =
            conversations.iter().filter_map(|c| c.last_message_id).collect();

        let last_messages: HashMap<Uuid, MessageEntity> = sqlx::query_as::<_, MessageEntity>(
            "SELECT * FROM messages WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(&last_message_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

        let participants = sqlx::query_as::<_, ParticipantDetailWithConversation>(
            r#"
            SELECT
                p.conversation_id,
                p.user_id,
                u.display_name,
                u.avatar_url,
                u.is_active,
                p.unread_count,
                p.last_read_at,
                p.joined_at
            FROM participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.conversation_id = ANY($1)
            ORDER BY p.joined_at
            "#,
        )
        .bind(&conversation_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut participant_map = participants.into_iter().fold(
            HashMap::<Uuid, Vec<ParticipantRow>>::new(),
            |mut acc, participant| {
                acc.entry(participant.conversation_id).or_default().push(participant.into());
                acc
            },
        );

        let details = conversations
            .into_iter()
            .map(|c| ConversationDetail {
                id: c.id,
                _type: c._type,
                name: c.name,
                created_by: c.created_by,
                last_message: c
                    .last_message_id
                    .and_then(|id| last_messages.get(&id).cloned())
                    .map(MessageResponse::from),
                participants: participant_map.remove(&c.id).unwrap_or_default(),
                unread_count: 0,
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect();

        Ok(details)
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationRepositoryPg {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation =
            sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    async fn find_or_create_direct(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        let key = direct_key(user_a, user_b);
        let mut tx = self.pool.begin().await?;

        // A concurrent insert for the same pair waits on the unique index and
        // then falls through to the SELECT below.
        let inserted = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, type, direct_key, created_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (direct_key) WHERE direct_key IS NOT NULL DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(ConversationType::Direct)
        .bind(&key)
        .bind(user_a)
        .fetch_optional(tx.as_mut())
        .await?;

        let conversation = match inserted {
            Some(conversation) => {
                Self::add_participants(&conversation.id, &[*user_a, *user_b], tx.as_mut()).await?;
                conversation
            }
            None => {
                sqlx::query_as::<_, ConversationEntity>(
                    "SELECT * FROM conversations WHERE direct_key = $1",
                )
                .bind(&key)
                .fetch_one(tx.as_mut())
                .await?
            }
        };

        tx.commit().await?;
        Ok(conversation)
    }

    async fn create_group(
        &self,
        name: &str,
        owner_id: &Uuid,
        member_ids: &[Uuid],
    ) -> Result<ConversationEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let conversation = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, type, name, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(ConversationType::Group)
        .bind(name)
        .bind(owner_id)
        .fetch_one(tx.as_mut())
        .await?;

        let mut all_members = Vec::with_capacity(member_ids.len() + 1);
        all_members.push(*owner_id);
        all_members.extend(member_ids.iter().filter(|id| *id != owner_id));

        Self::add_participants(&conversation.id, &all_members, tx.as_mut()).await?;

        tx.commit().await?;
        Ok(conversation)
    }

    async fn find_detail(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationDetail>, error::SystemError> {
        let Some(conversation) = self.find_by_id(conversation_id).await? else {
            return Ok(None);
        };

        Ok(self.assemble(vec![conversation]).await?.pop())
    }

    async fn find_details_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationDetail>, error::SystemError> {
        let conversations = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT c.*
            FROM conversations c
            JOIN participants p
                ON p.conversation_id = c.id
                AND p.user_id = $1
            ORDER BY COALESCE(c.last_message_at, c.updated_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.assemble(conversations).await
    }
}

#[derive(Clone)]
pub struct ParticipantRepositoryPg {
    pool: sqlx::PgPool,
}

impl ParticipantRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ParticipantRepository for ParticipantRepositoryPg {
    async fn find_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ParticipantEntity>, error::SystemError> {
        let participant = sqlx::query_as::<_, ParticipantEntity>(
            "SELECT * FROM participants WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn find_participant_ids(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM participants WHERE conversation_id = $1",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn get_unread_counts(
        &self,
        conversation_id: &Uuid,
    ) -> Result<HashMap<Uuid, i32>, error::SystemError> {
        let rows = sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT user_id, unread_count FROM participants WHERE conversation_id = $1",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn find_peer_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT other.user_id
            FROM participants me
            JOIN participants other
                ON other.conversation_id = me.conversation_id
                AND other.user_id <> me.user_id
            WHERE me.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn mark_read_until(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        until: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<ReadOutcome, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        // Blocks while a send or delete in this conversation is in flight.
        sqlx::query("SELECT id FROM conversations WHERE id = $1 FOR SHARE")
            .bind(conversation_id)
            .fetch_optional(tx.as_mut())
            .await?;

        let participant = sqlx::query_as::<_, ParticipantEntity>(
            r#"
            SELECT * FROM participants
            WHERE conversation_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(tx.as_mut())
        .await?
        .ok_or_else(|| error::SystemError::forbidden("You are not a participant"))?;

        let target = match until {
            Some(until) => Some(until),
            None => {
                sqlx::query_scalar::<_, Option<chrono::DateTime<chrono::Utc>>>(
                    "SELECT MAX(created_at) FROM messages WHERE conversation_id = $1 AND deleted_at IS NULL",
                )
                .bind(conversation_id)
                .fetch_one(tx.as_mut())
                .await?
            }
        };

        let Some(marker) = target
            .map(|t| advance_read_marker(participant.last_read_at, t))
            .or(participant.last_read_at)
        else {
            tx.commit().await?;
            return Ok(ReadOutcome {
                last_read_at: None,
                unread_count: participant.unread_count,
                changed: false,
            });
        };

        let stamped = sqlx::query(
            r#"
            UPDATE messages
            SET read_at = NOW()
            WHERE conversation_id = $1
            AND receiver_id = $2
            AND read_at IS NULL
            AND deleted_at IS NULL
            AND created_at <= $3
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(marker)
        .execute(tx.as_mut())
        .await?
        .rows_affected();

        let unread_count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE participants
            SET last_read_at = $3,
                unread_count = (
                    SELECT COUNT(*)::int
                    FROM messages m
                    WHERE m.conversation_id = $1
                    AND m.sender_id <> $2
                    AND m.deleted_at IS NULL
                    AND m.created_at > $3
                )
            WHERE conversation_id = $1 AND user_id = $2
            RETURNING unread_count
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(marker)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;

        Ok(ReadOutcome {
            last_read_at: Some(marker),
            unread_count,
            changed: participant.last_read_at != Some(marker)
                || stamped > 0
                || participant.unread_count != unread_count,
        })
    }
}
