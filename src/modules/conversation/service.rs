use actix::Addr;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::{
    model::{normalize_group_name, ConversationDetail, MessagePage, ReadReceipt},
    repository::{ConversationRepository, ParticipantRepository},
    schema::ParticipantEntity,
};
use crate::modules::message::{model::MessageResponse, repository::MessageRepository};
use crate::modules::notification::{
    model::NewNotification, schema::NotificationKind, service::NotificationService,
};
use crate::modules::realtime::{events::Publish, hub::RealtimeHub, message::ServerEvent};
use crate::modules::user::repository::UserRepository;
use crate::utils::{clamp_limit, parse_cursor, Cursor};

#[derive(Clone)]
pub struct ConversationService {
    conversation_repo: Arc<dyn ConversationRepository + Send + Sync>,
    participant_repo: Arc<dyn ParticipantRepository + Send + Sync>,
    message_repo: Arc<dyn MessageRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    notifications: NotificationService,
    hub: Addr<RealtimeHub>,
}

impl ConversationService {
    pub fn with_dependencies(
        conversation_repo: Arc<dyn ConversationRepository + Send + Sync>,
        participant_repo: Arc<dyn ParticipantRepository + Send + Sync>,
        message_repo: Arc<dyn MessageRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        notifications: NotificationService,
        hub: Addr<RealtimeHub>,
    ) -> Self {
        ConversationService {
            conversation_repo,
            participant_repo,
            message_repo,
            user_repo,
            notifications,
            hub,
        }
    }

    /// NotFound for unknown conversations, Forbidden for non-participants.
    pub async fn ensure_member(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<ParticipantEntity, error::SystemError> {
        self.conversation_repo
            .find_by_id(&conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        self.participant_repo
            .find_participant(&conversation_id, &user_id)
            .await?
            .ok_or_else(|| error::SystemError::forbidden("You are not a participant of this conversation"))
    }

    pub async fn participant_ids(&self, conversation_id: Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        self.participant_repo.find_participant_ids(&conversation_id).await
    }

    pub async fn create_direct(
        &self,
        user_id: Uuid,
        peer_id: Uuid,
    ) -> Result<ConversationDetail, error::SystemError> {
        if user_id == peer_id {
            return Err(error::SystemError::bad_request("Cannot start a conversation with yourself"));
        }

        if !self.user_repo.exists(&peer_id).await? {
            return Err(error::SystemError::not_found("User not found"));
        }

        let conversation = self.conversation_repo.find_or_create_direct(&user_id, &peer_id).await?;
        self.load_detail(conversation.id, user_id).await
    }

    pub async fn create_group(
        &self,
        owner_id: Uuid,
        name: &str,
        member_ids: &[Uuid],
    ) -> Result<ConversationDetail, error::SystemError> {
        let name = normalize_group_name(name)
            .ok_or_else(|| error::SystemError::bad_request("Group name must be 1 to 100 characters"))?;

        let mut seen = HashSet::new();
        let members: Vec<Uuid> = member_ids
            .iter()
            .copied()
            .filter(|id| *id != owner_id && seen.insert(*id))
            .collect();

        if members.is_empty() {
            return Err(error::SystemError::bad_request("A group needs at least one other member"));
        }

        let existing = self.user_repo.find_by_ids(&members).await?;
        if existing.len() != members.len() {
            return Err(error::SystemError::not_found("One or more members do not exist"));
        }

        let conversation = self.conversation_repo.create_group(&name, &owner_id, &members).await?;
        let detail = self.load_detail(conversation.id, owner_id).await?;

        for member_id in &members {
            let invite = NewNotification::new(*member_id, NotificationKind::GroupInvite)
                .actor(owner_id)
                .conversation(conversation.id)
                .body(format!("You were added to {name}"));
            if let Err(e) = self.notifications.notify(invite).await {
                log::warn!("Failed to notify {member_id} about group {}: {e}", conversation.id);
            }
        }

        self.hub.do_send(Publish::to(
            members,
            ServerEvent::ConversationCreated { conversation: detail.clone() },
        ));

        Ok(detail)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ConversationDetail>, error::SystemError> {
        let conversations = self.conversation_repo.find_details_by_user(&user_id).await?;
        Ok(conversations.into_iter().map(|c| c.for_viewer(&user_id)).collect())
    }

    pub async fn get_detail(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<ConversationDetail, error::SystemError> {
        self.ensure_member(conversation_id, user_id).await?;
        self.load_detail(conversation_id, user_id).await
    }

    /// Newest-first cursor pagination; each page is returned oldest-first.
    pub async fn get_messages(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        limit: Option<i64>,
        cursor: Option<&str>,
    ) -> Result<MessagePage, error::SystemError> {
        let limit = clamp_limit(limit);
        let before = parse_cursor(cursor)?;
        self.ensure_member(conversation_id, user_id).await?;

        let mut messages = self.message_repo.find_page(&conversation_id, before, limit).await?;

        let next_cursor = if messages.len() as i64 == limit {
            messages.last().map(|m| Cursor::after(m.created_at, m.id).encode())
        } else {
            None
        };
        messages.reverse();

        Ok(MessagePage {
            messages: messages.into_iter().map(MessageResponse::from).collect(),
            next_cursor,
        })
    }

    /// Reads everything currently in the conversation.
    pub async fn mark_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<ReadReceipt, error::SystemError> {
        self.ensure_member(conversation_id, user_id).await?;
        self.apply_read(conversation_id, user_id, None).await
    }

    /// Advances the read marker and publishes only when it moved something:
    /// `messagesRead` to the other participants, `unreadCountChanged` to the
    /// reader's own subscribers.
    pub async fn read_until(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        until: chrono::DateTime<chrono::Utc>,
    ) -> Result<ReadReceipt, error::SystemError> {
        self.apply_read(conversation_id, user_id, Some(until)).await
    }

    async fn apply_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        until: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<ReadReceipt, error::SystemError> {
        let outcome = self.participant_repo.mark_read_until(&conversation_id, &user_id, until).await?;
        let receipt = ReadReceipt::new(conversation_id, user_id, outcome);

        if receipt.changed {
            let others: Vec<Uuid> = self
                .participant_repo
                .find_participant_ids(&conversation_id)
                .await?
                .into_iter()
                .filter(|id| *id != user_id)
                .collect();

            self.hub.do_send(Publish::to(
                others,
                ServerEvent::MessagesRead {
                    conversation_id,
                    user_id,
                    last_read_at: receipt.last_read_at,
                },
            ));
            self.hub.do_send(Publish::to_user(
                user_id,
                ServerEvent::UnreadCountChanged { conversation_id, unread_count: receipt.unread_count },
            ));
        }

        Ok(receipt)
    }

    async fn load_detail(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
    ) -> Result<ConversationDetail, error::SystemError> {
        let detail = self
            .conversation_repo
            .find_detail(&conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;
        Ok(detail.for_viewer(&viewer))
    }
}
