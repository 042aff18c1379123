//! In-memory repositories and a wired service graph for unit tests.
#![allow(dead_code)]

use actix::{Actor, Addr};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::{
    attachment::{model::NewAttachment, repository::AttachmentRepository, schema::AttachmentEntity},
    call::{
        model::InsertCall,
        repository::CallRepository,
        schema::{CallEntity, CallStatus},
        service::CallService,
    },
    conversation::{
        model::{advance_read_marker, ConversationDetail, ParticipantRow, ReadOutcome},
        repository::{ConversationRepository, ParticipantRepository},
        schema::{direct_key, ConversationEntity, ConversationType, ParticipantEntity},
        service::ConversationService,
    },
    graphql::schema::GraphQLContext,
    message::{
        model::{InsertMessage, MessageResponse},
        repository::MessageRepository,
        schema::MessageEntity,
        service::MessageService,
    },
    notification::{
        model::NewNotification, repository::NotificationRepository, schema::NotificationEntity,
        service::NotificationService,
    },
    realtime::{
        events::Subscribe, hub::RealtimeHub, message::ServerEvent, presence::PresenceService,
    },
    user::{
        model::UserResponse,
        repository::{UserCache, UserRepository},
        schema::{UserEntity, UserRole},
        service::UserService,
    },
};
use crate::utils::Cursor;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserEntity>,
    conversations: HashMap<Uuid, ConversationEntity>,
    participants: Vec<ParticipantEntity>,
    messages: Vec<MessageEntity>,
    notifications: Vec<NotificationEntity>,
    calls: HashMap<Uuid, CallEntity>,
    attachments: HashMap<Uuid, AttachmentEntity>,
    clock: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing timestamps at microsecond precision, like Postgres.
    fn tick(&mut self) -> DateTime<Utc> {
        let next = match self.clock {
            Some(last) => last + Duration::milliseconds(1),
            None => DateTime::from_timestamp_micros(Utc::now().timestamp_micros()).unwrap(),
        };
        self.clock = Some(next);
        next
    }

    fn participant_mut(
        &mut self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Option<&mut ParticipantEntity> {
        self.participants
            .iter_mut()
            .find(|p| &p.conversation_id == conversation_id && &p.user_id == user_id)
    }

    fn add_participants(&mut self, conversation_id: Uuid, user_ids: &[Uuid]) {
        let joined_at = self.tick();
        for user_id in user_ids {
            if self.participant_mut(&conversation_id, user_id).is_none() {
                self.participants.push(ParticipantEntity {
                    conversation_id,
                    user_id: *user_id,
                    unread_count: 0,
                    last_read_at: None,
                    joined_at,
                });
            }
        }
    }

    fn insert_conversation(
        &mut self,
        _type: ConversationType,
        direct_key: Option<String>,
        name: Option<String>,
        created_by: Uuid,
    ) -> ConversationEntity {
        let now = self.tick();
        let conversation = ConversationEntity {
            id: Uuid::now_v7(),
            _type,
            direct_key,
            name,
            created_by,
            last_message_id: None,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        };
        self.conversations.insert(conversation.id, conversation.clone());
        conversation
    }

    fn unread_for(&self, conversation_id: &Uuid, participant: &ParticipantEntity) -> i32 {
        self.messages
            .iter()
            .filter(|m| {
                &m.conversation_id == conversation_id
                    && m.sender_id != participant.user_id
                    && !m.is_deleted()
                    && participant.last_read_at.is_none_or(|read| m.created_at > read)
            })
            .count() as i32
    }

    fn detail(&self, conversation: &ConversationEntity) -> ConversationDetail {
        let last_message = conversation
            .last_message_id
            .and_then(|id| self.messages.iter().find(|m| m.id == id && !m.is_deleted()))
            .cloned()
            .map(MessageResponse::from);

        let participants = self
            .participants
            .iter()
            .filter(|p| p.conversation_id == conversation.id)
            .filter_map(|p| {
                self.users.get(&p.user_id).map(|u| ParticipantRow {
                    user_id: p.user_id,
                    display_name: u.display_name.clone(),
                    avatar_url: u.avatar_url.clone(),
                    is_active: u.is_active,
                    unread_count: p.unread_count,
                    last_read_at: p.last_read_at,
                    joined_at: p.joined_at,
                })
            })
            .collect();

        ConversationDetail {
            id: conversation.id,
            _type: conversation._type,
            name: conversation.name.clone(),
            created_by: conversation.created_by,
            last_message,
            participants,
            unread_count: 0,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

/// One store backing every repository trait, so services see a consistent
/// view the way they would through a single database.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_user(&self, name: &str) -> Uuid {
        let mut state = self.state();
        let now = state.tick();
        let user = UserEntity {
            id: Uuid::now_v7(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            role: UserRole::User,
            display_name: name.to_string(),
            avatar_url: None,
            is_active: false,
            last_seen_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        state.users.insert(id, user);
        id
    }

    pub fn soft_delete_user(&self, id: Uuid) {
        let mut state = self.state();
        let now = state.tick();
        if let Some(user) = state.users.get_mut(&id) {
            user.deleted_at = Some(now);
        }
    }

    pub fn message_count(&self) -> usize {
        self.state().messages.len()
    }

    /// Panics when the message was never stored.
    pub fn message(&self, id: Uuid) -> MessageEntity {
        self.state().messages.iter().find(|m| m.id == id).cloned().unwrap()
    }

    /// Rewrites a message timestamp so tests can line up equal `created_at` values.
    pub fn set_created_at(&self, id: Uuid, created_at: DateTime<Utc>) {
        if let Some(message) = self.state().messages.iter_mut().find(|m| m.id == id) {
            message.created_at = created_at;
        }
    }

    pub fn unread_count(&self, conversation_id: Uuid, user_id: Uuid) -> i32 {
        self.state()
            .participants
            .iter()
            .find(|p| p.conversation_id == conversation_id && p.user_id == user_id)
            .map(|p| p.unread_count)
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.state().users.get(id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        let state = self.state();
        Ok(ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| state.users.get(id))
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let query = query.to_lowercase();
        let mut users: Vec<UserEntity> = self
            .state()
            .users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .filter(|u| {
                u.username.to_lowercase().contains(&query)
                    || u.display_name.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        users.truncate(limit as usize);
        Ok(users)
    }

    async fn set_active(&self, id: &Uuid, is_active: bool) -> Result<(), error::SystemError> {
        let mut state = self.state();
        let now = state.tick();
        if let Some(user) = state.users.get_mut(id).filter(|u| u.deleted_at.is_none()) {
            user.is_active = is_active;
            if !is_active {
                user.last_seen_at = Some(now);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryStore {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        Ok(self.state().conversations.get(conversation_id).cloned())
    }

    async fn find_or_create_direct(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        let key = direct_key(user_a, user_b);
        let mut state = self.state();

        if let Some(existing) =
            state.conversations.values().find(|c| c.direct_key.as_deref() == Some(key.as_str()))
        {
            return Ok(existing.clone());
        }

        let conversation =
            state.insert_conversation(ConversationType::Direct, Some(key), None, *user_a);
        state.add_participants(conversation.id, &[*user_a, *user_b]);
        Ok(conversation)
    }

    async fn create_group(
        &self,
        name: &str,
        owner_id: &Uuid,
        member_ids: &[Uuid],
    ) -> Result<ConversationEntity, error::SystemError> {
        let mut state = self.state();
        let conversation = state.insert_conversation(
            ConversationType::Group,
            None,
            Some(name.to_string()),
            *owner_id,
        );

        let mut members = vec![*owner_id];
        members.extend(member_ids.iter().filter(|id| *id != owner_id));
        state.add_participants(conversation.id, &members);
        Ok(conversation)
    }

    async fn find_detail(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationDetail>, error::SystemError> {
        let state = self.state();
        Ok(state.conversations.get(conversation_id).map(|c| state.detail(c)))
    }

    async fn find_details_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationDetail>, error::SystemError> {
        let state = self.state();
        let mut conversations: Vec<&ConversationEntity> = state
            .participants
            .iter()
            .filter(|p| &p.user_id == user_id)
            .filter_map(|p| state.conversations.get(&p.conversation_id))
            .collect();
        conversations.sort_by_key(|c| std::cmp::Reverse(c.last_message_at.unwrap_or(c.updated_at)));

        Ok(conversations.into_iter().map(|c| state.detail(c)).collect())
    }
}

#[async_trait::async_trait]
impl ParticipantRepository for InMemoryStore {
    async fn find_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ParticipantEntity>, error::SystemError> {
        Ok(self.state().participant_mut(conversation_id, user_id).map(|p| p.clone()))
    }

    async fn find_participant_ids(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        Ok(self
            .state()
            .participants
            .iter()
            .filter(|p| &p.conversation_id == conversation_id)
            .map(|p| p.user_id)
            .collect())
    }

    async fn get_unread_counts(
        &self,
        conversation_id: &Uuid,
    ) -> Result<HashMap<Uuid, i32>, error::SystemError> {
        Ok(self
            .state()
            .participants
            .iter()
            .filter(|p| &p.conversation_id == conversation_id)
            .map(|p| (p.user_id, p.unread_count))
            .collect())
    }

    async fn find_peer_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        let state = self.state();
        let conversation_ids: HashSet<Uuid> = state
            .participants
            .iter()
            .filter(|p| &p.user_id == user_id)
            .map(|p| p.conversation_id)
            .collect();

        let peers: HashSet<Uuid> = state
            .participants
            .iter()
            .filter(|p| conversation_ids.contains(&p.conversation_id) && &p.user_id != user_id)
            .map(|p| p.user_id)
            .collect();
        Ok(peers.into_iter().collect())
    }

    async fn mark_read_until(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        until: Option<DateTime<Utc>>,
    ) -> Result<ReadOutcome, error::SystemError> {
        let mut state = self.state();
        let now = state.tick();

        let participant = state
            .participant_mut(conversation_id, user_id)
            .map(|p| p.clone())
            .ok_or_else(|| error::SystemError::forbidden("You are not a participant"))?;

        let target = until.or_else(|| {
            state
                .messages
                .iter()
                .filter(|m| &m.conversation_id == conversation_id && !m.is_deleted())
                .map(|m| m.created_at)
                .max()
        });
        let Some(marker) = target
            .map(|t| advance_read_marker(participant.last_read_at, t))
            .or(participant.last_read_at)
        else {
            return Ok(ReadOutcome {
                last_read_at: None,
                unread_count: participant.unread_count,
                changed: false,
            });
        };

        let mut stamped = 0;
        for message in state.messages.iter_mut().filter(|m| {
            &m.conversation_id == conversation_id
                && m.receiver_id.as_ref() == Some(user_id)
                && m.read_at.is_none()
                && !m.is_deleted()
                && m.created_at <= marker
        }) {
            message.read_at = Some(now);
            stamped += 1;
        }

        let advanced = ParticipantEntity { last_read_at: Some(marker), ..participant.clone() };
        let unread_count = state.unread_for(conversation_id, &advanced);

        if let Some(p) = state.participant_mut(conversation_id, user_id) {
            p.last_read_at = Some(marker);
            p.unread_count = unread_count;
        }

        Ok(ReadOutcome {
            last_read_at: Some(marker),
            unread_count,
            changed: participant.last_read_at != Some(marker)
                || stamped > 0
                || participant.unread_count != unread_count,
        })
    }
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryStore {
    async fn create(&self, insert: &InsertMessage) -> Result<MessageEntity, error::SystemError> {
        let mut state = self.state();
        let now = state.tick();

        let message = MessageEntity {
            id: Uuid::now_v7(),
            conversation_id: insert.conversation_id,
            sender_id: insert.sender_id,
            receiver_id: insert.receiver_id,
            content: insert.content.clone(),
            file_url: insert.file_url.clone(),
            read_at: None,
            is_edited: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.messages.push(message.clone());

        for participant in state
            .participants
            .iter_mut()
            .filter(|p| p.conversation_id == insert.conversation_id && p.user_id != insert.sender_id)
        {
            participant.unread_count += 1;
        }

        if let Some(conversation) = state.conversations.get_mut(&insert.conversation_id) {
            conversation.last_message_id = Some(message.id);
            conversation.last_message_at = Some(now);
            conversation.updated_at = now;
        }

        Ok(message)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError> {
        Ok(self.state().messages.iter().find(|m| &m.id == id).cloned())
    }

    async fn find_page(
        &self,
        conversation_id: &Uuid,
        before: Option<Cursor>,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        let mut page: Vec<MessageEntity> = self
            .state()
            .messages
            .iter()
            .filter(|m| &m.conversation_id == conversation_id && !m.is_deleted())
            .filter(|m| {
                before.is_none_or(|c| match c.id {
                    Some(id) => (m.created_at, m.id) < (c.created_at, id),
                    None => m.created_at < c.created_at,
                })
            })
            .cloned()
            .collect();
        page.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        page.truncate(limit as usize);
        Ok(page)
    }

    async fn edit(
        &self,
        id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let mut state = self.state();
        let now = state.tick();
        Ok(state
            .messages
            .iter_mut()
            .find(|m| &m.id == id && &m.sender_id == sender_id && !m.is_deleted())
            .map(|m| {
                m.content = Some(content.to_string());
                m.is_edited = true;
                m.updated_at = now;
                m.clone()
            }))
    }

    async fn soft_delete(&self, id: &Uuid, sender_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut state = self.state();
        let now = state.tick();

        let Some(message) = state
            .messages
            .iter_mut()
            .find(|m| &m.id == id && &m.sender_id == sender_id && !m.is_deleted())
        else {
            return Ok(false);
        };
        message.deleted_at = Some(now);
        let conversation_id = message.conversation_id;

        let recounted: Vec<(Uuid, i32)> = state
            .participants
            .iter()
            .filter(|p| p.conversation_id == conversation_id)
            .map(|p| (p.user_id, state.unread_for(&conversation_id, p)))
            .collect();
        for (user_id, unread_count) in recounted {
            if let Some(p) = state.participant_mut(&conversation_id, &user_id) {
                p.unread_count = unread_count;
            }
        }

        let latest = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && !m.is_deleted())
            .max_by_key(|m| m.created_at)
            .map(|m| (m.id, m.created_at));
        if let Some(conversation) = state.conversations.get_mut(&conversation_id) {
            conversation.last_message_id = latest.map(|(id, _)| id);
            conversation.last_message_at = latest.map(|(_, at)| at);
        }

        Ok(true)
    }
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, error::SystemError> {
        let mut state = self.state();
        let created_at = state.tick();
        let entity = NotificationEntity {
            id: Uuid::now_v7(),
            recipient_id: notification.recipient_id,
            kind: notification.kind,
            actor_id: notification.actor_id,
            message_id: notification.message_id,
            conversation_id: notification.conversation_id,
            call_id: notification.call_id,
            body: notification.body.clone(),
            read_at: None,
            created_at,
        };
        state.notifications.push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<NotificationEntity>, error::SystemError> {
        Ok(self.state().notifications.iter().find(|n| &n.id == id).cloned())
    }

    async fn list(
        &self,
        recipient_id: &Uuid,
        limit: i64,
        unread_only: bool,
    ) -> Result<Vec<NotificationEntity>, error::SystemError> {
        let mut notifications: Vec<NotificationEntity> = self
            .state()
            .notifications
            .iter()
            .filter(|n| &n.recipient_id == recipient_id)
            .filter(|n| !unread_only || n.read_at.is_none())
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit as usize);
        Ok(notifications)
    }

    async fn unread_count(&self, recipient_id: &Uuid) -> Result<i64, error::SystemError> {
        Ok(self
            .state()
            .notifications
            .iter()
            .filter(|n| &n.recipient_id == recipient_id && n.read_at.is_none())
            .count() as i64)
    }

    async fn mark_read(&self, id: &Uuid) -> Result<Option<NotificationEntity>, error::SystemError> {
        let mut state = self.state();
        let now = state.tick();
        Ok(state.notifications.iter_mut().find(|n| &n.id == id && n.read_at.is_none()).map(|n| {
            n.read_at = Some(now);
            n.clone()
        }))
    }

    async fn mark_all_read(&self, recipient_id: &Uuid) -> Result<u64, error::SystemError> {
        let mut state = self.state();
        let now = state.tick();
        let mut updated = 0;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| &n.recipient_id == recipient_id && n.read_at.is_none())
        {
            notification.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl CallRepository for InMemoryStore {
    async fn create_if_idle(
        &self,
        call: &InsertCall,
    ) -> Result<Option<CallEntity>, error::SystemError> {
        let mut state = self.state();
        let busy = state.calls.values().any(|c| {
            c.status.is_live() && (c.involves(&call.caller_id) || c.involves(&call.callee_id))
        });
        if busy {
            return Ok(None);
        }

        let started_at = state.tick();
        let entity = CallEntity {
            id: Uuid::now_v7(),
            caller_id: call.caller_id,
            callee_id: call.callee_id,
            conversation_id: call.conversation_id,
            kind: call.kind,
            status: CallStatus::Ringing,
            started_at,
            answered_at: None,
            ended_at: None,
        };
        state.calls.insert(entity.id, entity.clone());
        Ok(Some(entity))
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CallEntity>, error::SystemError> {
        Ok(self.state().calls.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &Uuid,
        from: CallStatus,
        to: CallStatus,
    ) -> Result<Option<CallEntity>, error::SystemError> {
        let mut state = self.state();
        let now = state.tick();
        Ok(state.calls.get_mut(id).filter(|c| c.status == from).map(|c| {
            c.status = to;
            if to == CallStatus::Accepted {
                c.answered_at = Some(now);
            } else {
                c.ended_at = Some(now);
            }
            c.clone()
        }))
    }
}

#[async_trait::async_trait]
impl AttachmentRepository for InMemoryStore {
    async fn create(
        &self,
        attachment: &NewAttachment,
    ) -> Result<AttachmentEntity, error::SystemError> {
        let mut state = self.state();
        let created_at = state.tick();
        let entity = AttachmentEntity {
            id: Uuid::now_v7(),
            uploader_id: attachment.uploader_id,
            filename: attachment.filename.clone(),
            original_filename: attachment.original_filename.clone(),
            mime_type: attachment.mime_type.clone(),
            size_bytes: attachment.size_bytes,
            storage_path: attachment.storage_path.clone(),
            created_at,
        };
        state.attachments.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<AttachmentEntity>, error::SystemError> {
        Ok(self.state().attachments.get(id).cloned())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), error::SystemError> {
        self.state().attachments.remove(id);
        Ok(())
    }
}

/// Process-local stand-in for the Redis user cache.
#[derive(Default)]
pub struct InMemoryCache {
    users: Mutex<HashMap<Uuid, UserResponse>>,
}

impl InMemoryCache {
    pub fn contains(&self, id: &Uuid) -> bool {
        self.users.lock().unwrap().contains_key(id)
    }
}

#[async_trait::async_trait]
impl UserCache for InMemoryCache {
    async fn get(&self, id: &Uuid) -> Result<Option<UserResponse>, error::SystemError> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn set(&self, user: &UserResponse) -> Result<(), error::SystemError> {
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(())
    }

    async fn invalidate(&self, id: &Uuid) -> Result<(), error::SystemError> {
        self.users.lock().unwrap().remove(id);
        Ok(())
    }
}

/// Services wired to one `InMemoryStore` and a hub without presence tracking.
pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub hub: Addr<RealtimeHub>,
    pub notifications: NotificationService,
    pub conversations: ConversationService,
    pub messages: MessageService,
    pub calls: CallService,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::default());
        let hub = RealtimeHub::new().start();

        let notifications = NotificationService::with_dependencies(store.clone(), hub.clone());
        let conversations = ConversationService::with_dependencies(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            notifications.clone(),
            hub.clone(),
        );
        let messages = MessageService::with_dependencies(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            conversations.clone(),
            notifications.clone(),
            hub.clone(),
        );
        let calls = CallService::with_dependencies(
            store.clone(),
            store.clone(),
            notifications.clone(),
            hub.clone(),
        );

        TestApp { store, hub, notifications, conversations, messages, calls }
    }

    /// GraphQL context with an in-memory user cache. Presence points at a
    /// closed Redis port, so presence lookups fail.
    pub fn graphql_context(&self) -> GraphQLContext {
        GraphQLContext {
            users: UserService::with_dependencies(
                self.store.clone(),
                Arc::new(InMemoryCache::default()),
            ),
            presence: PresenceService::new(unreachable_redis_pool()),
            conversations: self.conversations.clone(),
            messages: self.messages.clone(),
            notifications: self.notifications.clone(),
            calls: self.calls.clone(),
            hub: self.hub.clone(),
        }
    }
}

pub fn unreachable_redis_pool() -> deadpool_redis::Pool {
    deadpool_redis::Config::from_url("redis://127.0.0.1:1")
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .unwrap()
}

/// Attaches a raw subscriber for `user_id` and returns its receiving end.
pub fn subscribe(hub: &Addr<RealtimeHub>, user_id: Uuid) -> mpsc::UnboundedReceiver<ServerEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    hub.do_send(Subscribe { id: Uuid::now_v7(), user_id, tx });
    rx
}

/// Everything already queued on the receiver.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
