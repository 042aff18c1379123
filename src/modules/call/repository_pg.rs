use uuid::Uuid;

use crate::{
    api::error,
    modules::call::{
        model::InsertCall,
        repository::CallRepository,
        schema::{CallEntity, CallStatus},
    },
};

#[derive(Clone)]
pub struct CallRepositoryPg {
    pool: sqlx::PgPool,
}

impl CallRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CallRepository for CallRepositoryPg {
    async fn create_if_idle(
        &self,
        call: &InsertCall,
    ) -> Result<Option<CallEntity>, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        // Row locks on both users serialize concurrent call attempts.
        sqlx::query("SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind([call.caller_id, call.callee_id].as_slice())
            .execute(tx.as_mut())
            .await?;

        let busy = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM calls
                WHERE status IN ('ringing', 'accepted')
                AND (caller_id = ANY($1) OR callee_id = ANY($1))
            )
            "#,
        )
        .bind([call.caller_id, call.callee_id].as_slice())
        .fetch_one(tx.as_mut())
        .await?;

        if busy {
            return Ok(None);
        }

        let entity = sqlx::query_as::<_, CallEntity>(
            r#"
            INSERT INTO calls (id, caller_id, callee_id, conversation_id, kind, status)
            VALUES ($1, $2, $3, $4, $5, 'ringing')
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(call.caller_id)
        .bind(call.callee_id)
        .bind(call.conversation_id)
        .bind(call.kind)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(Some(entity))
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CallEntity>, error::SystemError> {
        let call = sqlx::query_as::<_, CallEntity>("SELECT * FROM calls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(call)
    }

    async fn update_status(
        &self,
        id: &Uuid,
        from: CallStatus,
        to: CallStatus,
    ) -> Result<Option<CallEntity>, error::SystemError> {
        let call = sqlx::query_as::<_, CallEntity>(
            r#"
            UPDATE calls
            SET status = $3,
                answered_at = CASE WHEN $3 = 'accepted'::call_status THEN NOW() ELSE answered_at END,
                ended_at = CASE WHEN $3 = 'accepted'::call_status THEN ended_at ELSE NOW() END
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(call)
    }
}
