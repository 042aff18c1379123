/// Presence
///
/// Online state lives in Redis with a TTL so a server that dies without
/// closing its sockets cannot leave users online forever:
///
/// - `presence:{user_id}` -> "1" with a 60s TTL, refreshed by the hub heartbeat
/// - `last_seen:{user_id}` -> RFC 3339 timestamp written when the user goes offline
use deadpool_redis::redis::{self, AsyncCommands};
use std::sync::Arc;
use uuid::Uuid;

use super::hub::PresenceTracker;
use crate::api::error;
use crate::constants::PRESENCE_TTL;
use crate::modules::conversation::repository::ParticipantRepository;
use crate::modules::user::service::UserService;

const PRESENCE_PREFIX: &str = "presence:";
const LAST_SEEN_PREFIX: &str = "last_seen:";

#[derive(Clone)]
pub struct PresenceService {
    pool: deadpool_redis::Pool,
}

impl PresenceService {
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }

    pub async fn set_online(&self, user_id: Uuid) -> Result<(), error::SystemError> {
        let mut conn = self.pool.get().await?;
        let key = format!("{PRESENCE_PREFIX}{user_id}");
        conn.set_ex::<_, _, ()>(&key, "1", PRESENCE_TTL).await?;
        Ok(())
    }

    pub async fn set_offline(&self, user_id: Uuid) -> Result<(), error::SystemError> {
        let mut conn = self.pool.get().await?;
        let presence_key = format!("{PRESENCE_PREFIX}{user_id}");
        let last_seen_key = format!("{LAST_SEEN_PREFIX}{user_id}");
        let now = chrono::Utc::now().to_rfc3339();

        redis::pipe()
            .del(&presence_key)
            .set(&last_seen_key, &now)
            .query_async::<()>(&mut *conn)
            .await?;

        Ok(())
    }

    /// Re-arms the TTL of every listed user in one round-trip.
    pub async fn refresh_presence(&self, user_ids: &[Uuid]) -> Result<(), error::SystemError> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get().await?;
        let mut pipe = redis::pipe();
        for user_id in user_ids {
            pipe.set_ex(format!("{PRESENCE_PREFIX}{user_id}"), "1", PRESENCE_TTL).ignore();
        }
        pipe.query_async::<()>(&mut *conn).await?;
        Ok(())
    }

    pub async fn get_online_status_batch(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<PresenceInfo>, error::SystemError> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.pool.get().await?;

        let mut online_pipe = redis::pipe();
        let mut last_seen_pipe = redis::pipe();
        for user_id in user_ids {
            online_pipe.exists(format!("{PRESENCE_PREFIX}{user_id}"));
            last_seen_pipe.get(format!("{LAST_SEEN_PREFIX}{user_id}"));
        }
        let online_flags: Vec<bool> = online_pipe.query_async(&mut *conn).await?;
        let last_seens: Vec<Option<String>> = last_seen_pipe.query_async(&mut *conn).await?;

        Ok(user_ids
            .iter()
            .zip(online_flags.into_iter().zip(last_seens))
            .map(|(user_id, (is_online, last_seen))| PresenceInfo::new(*user_id, is_online, last_seen))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, async_graphql::SimpleObject)]
#[graphql(name = "Presence")]
pub struct PresenceInfo {
    pub user_id: Uuid,
    pub is_online: bool,
    pub last_seen: Option<chrono::DateTime<chrono::Utc>>,
}

impl PresenceInfo {
    /// Online users carry no `last_seen`; unparsable timestamps are dropped.
    pub fn new(user_id: Uuid, is_online: bool, last_seen: Option<String>) -> Self {
        let last_seen = if is_online {
            None
        } else {
            last_seen
                .and_then(|raw| chrono::DateTime::parse_from_rfc3339(&raw).ok())
                .map(|ts| ts.with_timezone(&chrono::Utc))
        };
        PresenceInfo { user_id, is_online, last_seen }
    }
}

/// Hub-side presence: Redis keys, the `users.is_active` flag and the
/// conversation peers that get told about transitions.
pub struct PresenceRecorder {
    presence: PresenceService,
    users: UserService,
    participants: Arc<dyn ParticipantRepository + Send + Sync>,
}

impl PresenceRecorder {
    pub fn new(
        presence: PresenceService,
        users: UserService,
        participants: Arc<dyn ParticipantRepository + Send + Sync>,
    ) -> Self {
        PresenceRecorder { presence, users, participants }
    }
}

#[async_trait::async_trait]
impl PresenceTracker for PresenceRecorder {
    async fn record(&self, user_id: Uuid, is_online: bool) -> Result<(), error::SystemError> {
        if is_online {
            self.presence.set_online(user_id).await?;
        } else {
            self.presence.set_offline(user_id).await?;
        }
        self.users.set_active(user_id, is_online).await
    }

    async fn peers(&self, user_id: Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        self.participants.find_peer_ids(&user_id).await
    }

    async fn refresh(&self, user_ids: Vec<Uuid>) -> Result<(), error::SystemError> {
        self.presence.refresh_presence(&user_ids).await
    }
}
