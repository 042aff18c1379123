/// Message Service
///
/// Sending, reading, editing and deleting messages. Every write is committed
/// before the matching realtime event is published.
use actix::Addr;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::{
    model::ReadReceipt,
    repository::{ConversationRepository, ParticipantRepository},
    schema::ConversationType,
    service::ConversationService,
};
use crate::modules::message::{
    model::{normalize_body, preview, InsertMessage, MessageResponse, UnreadCount},
    repository::MessageRepository,
    schema::MessageEntity,
};
use crate::modules::notification::{
    model::NewNotification, schema::NotificationKind, service::NotificationService,
};
use crate::modules::realtime::{events::Publish, hub::RealtimeHub, message::ServerEvent};
use crate::modules::user::repository::UserRepository;

#[derive(Clone)]
pub struct MessageService {
    message_repo: Arc<dyn MessageRepository + Send + Sync>,
    conversation_repo: Arc<dyn ConversationRepository + Send + Sync>,
    participant_repo: Arc<dyn ParticipantRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    conversations: ConversationService,
    notifications: NotificationService,
    hub: Addr<RealtimeHub>,
}

impl MessageService {
    pub fn with_dependencies(
        message_repo: Arc<dyn MessageRepository + Send + Sync>,
        conversation_repo: Arc<dyn ConversationRepository + Send + Sync>,
        participant_repo: Arc<dyn ParticipantRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        conversations: ConversationService,
        notifications: NotificationService,
        hub: Addr<RealtimeHub>,
    ) -> Self {
        MessageService {
            message_repo,
            conversation_repo,
            participant_repo,
            user_repo,
            conversations,
            notifications,
            hub,
        }
    }

    /// Sends a direct message, creating the pair's conversation on first use.
    pub async fn send_direct(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: Option<String>,
        file_url: Option<String>,
    ) -> Result<MessageResponse, error::SystemError> {
        let (content, file_url) = normalize_body(content, file_url)?;

        if sender_id == receiver_id {
            return Err(error::SystemError::bad_request("Cannot send a message to yourself"));
        }

        let known = self.user_repo.find_by_ids(&[sender_id, receiver_id]).await?;
        if !known.iter().any(|u| u.id == receiver_id) {
            return Err(error::SystemError::not_found("Receiver not found"));
        }
        if !known.iter().any(|u| u.id == sender_id) {
            return Err(error::SystemError::not_found("Sender not found"));
        }

        let conversation =
            self.conversation_repo.find_or_create_direct(&sender_id, &receiver_id).await?;

        self.deliver(InsertMessage {
            conversation_id: conversation.id,
            sender_id,
            receiver_id: Some(receiver_id),
            content,
            file_url,
        })
        .await
    }

    /// Sends to an existing conversation the sender belongs to.
    pub async fn send_to_conversation(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
        content: Option<String>,
        file_url: Option<String>,
    ) -> Result<MessageResponse, error::SystemError> {
        let (content, file_url) = normalize_body(content, file_url)?;

        let conversation = self
            .conversation_repo
            .find_by_id(&conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        let participant_ids = self.participant_repo.find_participant_ids(&conversation_id).await?;
        if !participant_ids.contains(&sender_id) {
            return Err(error::SystemError::forbidden("You are not a participant of this conversation"));
        }

        let receiver_id = match conversation._type {
            ConversationType::Direct => participant_ids.iter().copied().find(|id| *id != sender_id),
            ConversationType::Group => None,
        };

        self.deliver(InsertMessage { conversation_id, sender_id, receiver_id, content, file_url })
            .await
    }

    /// Persists, publishes `newMessage` to every participant, then notifies
    /// the direct receiver.
    async fn deliver(&self, insert: InsertMessage) -> Result<MessageResponse, error::SystemError> {
        let message = self.message_repo.create(&insert).await?;
        let unread_counts = self.participant_repo.get_unread_counts(&message.conversation_id).await?;

        let response = MessageResponse::from(message);
        self.hub.do_send(Publish::to(
            unread_counts.keys().copied().collect(),
            ServerEvent::NewMessage {
                conversation_id: response.conversation_id,
                message: response.clone(),
                unread_counts: to_unread_list(&unread_counts),
            },
        ));

        if let Some(receiver_id) = response.receiver_id {
            let notification = NewNotification::new(receiver_id, NotificationKind::NewMessage)
                .actor(response.sender_id)
                .message(response.id)
                .conversation(response.conversation_id)
                .body(preview(response.content.as_deref(), response.file_url.as_deref()));

            // The message is already committed; a failed notification must not fail the send.
            if let Err(e) = self.notifications.notify(notification).await {
                log::warn!("Failed to notify {receiver_id} about message {}: {e}", response.id);
            }
        }

        log::debug!(
            "Message {} stored in conversation {}",
            response.id,
            response.conversation_id
        );
        Ok(response)
    }

    /// Reads up to and including the message. Reading twice, or reading your
    /// own message, changes nothing.
    pub async fn mark_message_read(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<ReadReceipt, error::SystemError> {
        let message = self.find_live(message_id).await?;
        let participant = self.conversations.ensure_member(message.conversation_id, user_id).await?;

        if message.sender_id == user_id {
            return Ok(ReadReceipt {
                conversation_id: message.conversation_id,
                user_id,
                last_read_at: participant.last_read_at,
                unread_count: participant.unread_count,
                changed: false,
            });
        }

        self.conversations.read_until(message.conversation_id, user_id, message.created_at).await
    }

    pub async fn edit(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<MessageResponse, error::SystemError> {
        let (content, _) = normalize_body(Some(content.to_string()), None)?;
        let content = content
            .ok_or_else(|| error::SystemError::bad_request("Message content cannot be empty"))?;

        let message = self.find_live(message_id).await?;
        if message.sender_id != user_id {
            return Err(error::SystemError::forbidden("You can only edit your own messages"));
        }

        let edited = self
            .message_repo
            .edit(&message_id, &user_id, &content)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        let response = MessageResponse::from(edited);
        let participant_ids = self.participant_repo.find_participant_ids(&message.conversation_id).await?;
        self.hub.do_send(Publish::to(
            participant_ids,
            ServerEvent::MessageEdited {
                conversation_id: message.conversation_id,
                message: response.clone(),
            },
        ));

        Ok(response)
    }

    /// Soft delete. Participants whose unread counter dropped also get
    /// `unreadCountChanged`.
    pub async fn delete(&self, message_id: Uuid, user_id: Uuid) -> Result<(), error::SystemError> {
        let message = self.find_live(message_id).await?;
        if message.sender_id != user_id {
            return Err(error::SystemError::forbidden("You can only delete your own messages"));
        }

        let conversation_id = message.conversation_id;
        let before = self.participant_repo.get_unread_counts(&conversation_id).await?;

        if !self.message_repo.soft_delete(&message_id, &user_id).await? {
            return Err(error::SystemError::not_found("Message not found or already deleted"));
        }

        let after = self.participant_repo.get_unread_counts(&conversation_id).await?;

        self.hub.do_send(Publish::to(
            after.keys().copied().collect(),
            ServerEvent::MessageDeleted { conversation_id, message_id },
        ));

        for (participant_id, unread_count) in &after {
            if before.get(participant_id) != Some(unread_count) {
                self.hub.do_send(Publish::to_user(
                    *participant_id,
                    ServerEvent::UnreadCountChanged { conversation_id, unread_count: *unread_count },
                ));
            }
        }

        Ok(())
    }

    async fn find_live(&self, message_id: Uuid) -> Result<MessageEntity, error::SystemError> {
        self.message_repo
            .find_by_id(&message_id)
            .await?
            .filter(|m| !m.is_deleted())
            .ok_or_else(|| error::SystemError::not_found("Message not found"))
    }
}

fn to_unread_list(counts: &HashMap<Uuid, i32>) -> Vec<UnreadCount> {
    let mut list: Vec<UnreadCount> = counts
        .iter()
        .map(|(user_id, unread_count)| UnreadCount { user_id: *user_id, unread_count: *unread_count })
        .collect();
    list.sort_by_key(|c| c.user_id);
    list
}
