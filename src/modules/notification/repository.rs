use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{model::NewNotification, schema::NotificationEntity},
};

#[async_trait::async_trait]
pub trait NotificationRepository {
    async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<NotificationEntity>, error::SystemError>;

    /// Newest first.
    async fn list(
        &self,
        recipient_id: &Uuid,
        limit: i64,
        unread_only: bool,
    ) -> Result<Vec<NotificationEntity>, error::SystemError>;

    async fn unread_count(&self, recipient_id: &Uuid) -> Result<i64, error::SystemError>;

    /// Stamps `read_at` once. Returns the updated row, or `None` when it was
    /// already read.
    async fn mark_read(&self, id: &Uuid) -> Result<Option<NotificationEntity>, error::SystemError>;

    async fn mark_all_read(&self, recipient_id: &Uuid) -> Result<u64, error::SystemError>;
}
