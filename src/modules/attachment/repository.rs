use uuid::Uuid;

use crate::{
    api::error,
    modules::attachment::{model::NewAttachment, schema::AttachmentEntity},
};

#[async_trait::async_trait]
pub trait AttachmentRepository {
    async fn create(&self, attachment: &NewAttachment)
        -> Result<AttachmentEntity, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<AttachmentEntity>, error::SystemError>;

    async fn delete(&self, id: &Uuid) -> Result<(), error::SystemError>;
}
