use actix::Addr;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::notification::{
    model::{MarkAllReadResult, NewNotification, NotificationResponse},
    repository::NotificationRepository,
};
use crate::modules::realtime::{events::Publish, hub::RealtimeHub, message::ServerEvent};
use crate::utils::clamp_limit;

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository + Send + Sync>,
    hub: Addr<RealtimeHub>,
}

impl NotificationService {
    pub fn with_dependencies(
        repo: Arc<dyn NotificationRepository + Send + Sync>,
        hub: Addr<RealtimeHub>,
    ) -> Self {
        NotificationService { repo, hub }
    }

    /// Persists the notification, then pushes it and the new unread total
    /// to the recipient.
    pub async fn notify(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationResponse, error::SystemError> {
        let entity = self.repo.create(&notification).await?;
        let recipient_id = entity.recipient_id;
        let notification = NotificationResponse::from(entity);

        self.hub.do_send(Publish::to_user(
            recipient_id,
            ServerEvent::NotificationAdded { notification: notification.clone() },
        ));
        self.publish_count(recipient_id).await?;

        Ok(notification)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        unread_only: bool,
    ) -> Result<Vec<NotificationResponse>, error::SystemError> {
        let notifications = self.repo.list(&user_id, clamp_limit(limit), unread_only).await?;
        Ok(notifications.into_iter().map(NotificationResponse::from).collect())
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, error::SystemError> {
        self.repo.unread_count(&user_id).await
    }

    /// Idempotent: marking an already read notification returns it unchanged
    /// and publishes nothing.
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<NotificationResponse, error::SystemError> {
        let notification = self
            .repo
            .find_by_id(&notification_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Notification not found"))?;

        if notification.recipient_id != user_id {
            return Err(error::SystemError::forbidden("You can only read your own notifications"));
        }

        match self.repo.mark_read(&notification_id).await? {
            Some(updated) => {
                self.publish_count(user_id).await?;
                Ok(NotificationResponse::from(updated))
            }
            None => Ok(NotificationResponse::from(notification)),
        }
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<MarkAllReadResult, error::SystemError> {
        let updated = self.repo.mark_all_read(&user_id).await?;
        let unread_count = if updated > 0 {
            self.publish_count(user_id).await?
        } else {
            self.repo.unread_count(&user_id).await?
        };

        Ok(MarkAllReadResult { updated, unread_count })
    }

    async fn publish_count(&self, user_id: Uuid) -> Result<i64, error::SystemError> {
        let unread_count = self.repo.unread_count(&user_id).await?;
        self.hub.do_send(Publish::to_user(
            user_id,
            ServerEvent::NotificationCountChanged { unread_count },
        ));
        Ok(unread_count)
    }
}
