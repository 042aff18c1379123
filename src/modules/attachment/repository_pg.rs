use uuid::Uuid;

use crate::{
    api::error,
    modules::attachment::{
        model::NewAttachment, repository::AttachmentRepository, schema::AttachmentEntity,
    },
};

#[derive(Clone)]
pub struct AttachmentRepositoryPg {
    pool: sqlx::PgPool,
}

impl AttachmentRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AttachmentRepository for AttachmentRepositoryPg {
    async fn create(
        &self,
        attachment: &NewAttachment,
    ) -> Result<AttachmentEntity, error::SystemError> {
        let entity = sqlx::query_as::<_, AttachmentEntity>(
            r#"
            INSERT INTO attachments
                (id, uploader_id, filename, original_filename, mime_type, size_bytes, storage_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(attachment.uploader_id)
        .bind(&attachment.filename)
        .bind(&attachment.original_filename)
        .bind(&attachment.mime_type)
        .bind(attachment.size_bytes)
        .bind(&attachment.storage_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<AttachmentEntity>, error::SystemError> {
        let entity =
            sqlx::query_as::<_, AttachmentEntity>("SELECT * FROM attachments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), error::SystemError> {
        sqlx::query("DELETE FROM attachments WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }
}
