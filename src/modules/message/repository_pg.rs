use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{model::InsertMessage, repository::MessageRepository, schema::MessageEntity},
    utils::Cursor,
};

#[derive(Clone)]
pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn create(&self, message: &InsertMessage) -> Result<MessageEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        // Writers and readers of one conversation queue on its row, so
        // created_at is taken in commit order.
        lock_conversation(&mut tx, &message.conversation_id).await?;

        let entity = sqlx::query_as::<_, MessageEntity>(
            r#"
            INSERT INTO messages
                (id, conversation_id, sender_id, receiver_id, content, file_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, clock_timestamp(), clock_timestamp())
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.content)
        .bind(&message.file_url)
        .fetch_one(tx.as_mut())
        .await?;

        sqlx::query(
            r#"
            UPDATE participants
            SET unread_count = unread_count + 1
            WHERE conversation_id = $1 AND user_id <> $2
            "#,
        )
        .bind(entity.conversation_id)
        .bind(entity.sender_id)
        .execute(tx.as_mut())
        .await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_id = $2, last_message_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(entity.conversation_id)
        .bind(entity.id)
        .bind(entity.created_at)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    async fn find_page(
        &self,
        conversation_id: &Uuid,
        before: Option<Cursor>,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        // has index on (conversation_id, created_at DESC, id DESC) where deleted_at IS NULL
        let messages = sqlx::query_as::<_, MessageEntity>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            AND deleted_at IS NULL
            AND (
                $2::timestamptz IS NULL
                OR ($3::uuid IS NULL AND created_at < $2)
                OR (created_at, id) < ($2, $3)
            )
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(conversation_id)
        .bind(before.map(|c| c.created_at))
        .bind(before.and_then(|c| c.id))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn edit(
        &self,
        id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>(
            r#"
            UPDATE messages
            SET content = $3, is_edited = TRUE, updated_at = NOW()
            WHERE id = $1 AND sender_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(sender_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn soft_delete(&self, id: &Uuid, sender_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let conversation_id =
            sqlx::query_scalar::<_, Uuid>("SELECT conversation_id FROM messages WHERE id = $1")
                .bind(id)
                .fetch_optional(tx.as_mut())
                .await?;

        let Some(conversation_id) = conversation_id else {
            return Ok(false);
        };
        lock_conversation(&mut tx, &conversation_id).await?;

        let deleted = sqlx::query(
            r#"
            UPDATE messages
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND sender_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(sender_id)
        .execute(tx.as_mut())
        .await?
        .rows_affected();

        if deleted == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE participants p
            SET unread_count = (
                SELECT COUNT(*)::int
                FROM messages m
                WHERE m.conversation_id = p.conversation_id
                AND m.sender_id <> p.user_id
                AND m.deleted_at IS NULL
                AND (p.last_read_at IS NULL OR m.created_at > p.last_read_at)
            )
            WHERE p.conversation_id = $1
            "#,
        )
        .bind(conversation_id)
        .execute(tx.as_mut())
        .await?;

        sqlx::query(
            r#"
            UPDATE conversations c
            SET last_message_id = latest.id, last_message_at = latest.created_at
            FROM (
                SELECT
                    (SELECT id FROM messages
                     WHERE conversation_id = $1 AND deleted_at IS NULL
                     ORDER BY created_at DESC, id DESC LIMIT 1) AS id,
                    (SELECT MAX(created_at) FROM messages
                     WHERE conversation_id = $1 AND deleted_at IS NULL) AS created_at
            ) latest
            WHERE c.id = $1
            "#,
        )
        .bind(conversation_id)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

async fn lock_conversation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    conversation_id: &Uuid,
) -> Result<(), error::SystemError> {
    sqlx::query("SELECT id FROM conversations WHERE id = $1 FOR UPDATE")
        .bind(conversation_id)
        .fetch_optional(tx.as_mut())
        .await?;

    Ok(())
}
