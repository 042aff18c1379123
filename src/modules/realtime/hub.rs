/// Realtime hub actor
///
/// Owns every live subscriber, the per-user subscriber sets and the
/// conversation rooms. All state changes go through the actor mailbox.
use actix::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::events::*;
use super::message::ServerEvent;
use crate::api::error;
use crate::constants::HEARTBEAT_INTERVAL_SECS;

/// Persists presence transitions and resolves who should hear about them.
#[async_trait::async_trait]
pub trait PresenceTracker {
    async fn record(&self, user_id: Uuid, is_online: bool) -> Result<(), error::SystemError>;

    /// Users sharing a conversation with `user_id`.
    async fn peers(&self, user_id: Uuid) -> Result<Vec<Uuid>, error::SystemError>;

    /// Keeps presence alive for users with open subscriptions.
    async fn refresh(&self, user_ids: Vec<Uuid>) -> Result<(), error::SystemError>;
}

pub type SharedPresenceTracker = Arc<dyn PresenceTracker + Send + Sync>;

pub struct RealtimeHub {
    /// subscriber_id -> (user_id, channel)
    subscribers: HashMap<Uuid, (Uuid, EventSender)>,

    /// user_id -> subscriber ids (one per device / subscription)
    users: HashMap<Uuid, HashSet<Uuid>>,

    /// conversation_id -> user ids that joined the room
    rooms: HashMap<Uuid, HashSet<Uuid>>,

    presence: Option<SharedPresenceTracker>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            users: HashMap::new(),
            rooms: HashMap::new(),
            presence: None,
        }
    }

    pub fn with_presence(presence: SharedPresenceTracker) -> Self {
        Self { presence: Some(presence), ..Self::new() }
    }

    fn get_online_users(&self) -> Vec<Uuid> {
        self.users.keys().copied().collect()
    }

    /// Sends to every subscriber of `user_id`. Closed channels are collected
    /// into `dead` for pruning.
    fn deliver(
        &self,
        user_id: &Uuid,
        event: &ServerEvent,
        skip_subscriber: Option<Uuid>,
        dead: &mut Vec<Uuid>,
    ) -> usize {
        let Some(subscriber_ids) = self.users.get(user_id) else {
            return 0;
        };

        let mut sent = 0;
        for subscriber_id in subscriber_ids {
            if Some(*subscriber_id) == skip_subscriber {
                continue;
            }
            if let Some((_, tx)) = self.subscribers.get(subscriber_id) {
                if tx.send(event.clone()).is_ok() {
                    sent += 1;
                } else {
                    dead.push(*subscriber_id);
                }
            }
        }
        sent
    }

    fn prune(&mut self, dead: Vec<Uuid>, ctx: &mut Context<Self>) {
        for subscriber_id in dead {
            tracing::debug!("Pruning closed subscriber {}", subscriber_id);
            self.remove_subscriber(subscriber_id, ctx);
        }
    }

    fn remove_subscriber(&mut self, subscriber_id: Uuid, ctx: &mut Context<Self>) {
        let Some((user_id, _)) = self.subscribers.remove(&subscriber_id) else {
            return;
        };

        let last_one = match self.users.get_mut(&user_id) {
            Some(subscriber_ids) => {
                subscriber_ids.remove(&subscriber_id);
                subscriber_ids.is_empty()
            }
            None => false,
        };

        if last_one {
            self.users.remove(&user_id);

            for room_users in self.rooms.values_mut() {
                room_users.remove(&user_id);
            }
            self.rooms.retain(|_, users| !users.is_empty());

            tracing::info!("User {} has no subscribers left", user_id);
            self.went_offline(user_id, ctx);
        }
    }

    fn went_online(
        &mut self,
        user_id: Uuid,
        subscriber_id: Uuid,
        first: bool,
        ctx: &mut Context<Self>,
    ) {
        let Some(tracker) = self.presence.clone() else {
            return;
        };

        ctx.spawn(
            async move {
                if first {
                    if let Err(e) = tracker.record(user_id, true).await {
                        tracing::warn!("Failed to record user {} online: {}", user_id, e);
                    }
                }
                tracker.peers(user_id).await.unwrap_or_else(|e| {
                    tracing::warn!("Failed to load peers of user {}: {}", user_id, e);
                    vec![]
                })
            }
            .into_actor(self)
            .map(move |peers, act, ctx| {
                let online: Vec<Uuid> =
                    peers.into_iter().filter(|peer| act.users.contains_key(peer)).collect();

                let mut dead = vec![];
                if first {
                    let event =
                        ServerEvent::PresenceChanged { user_id, is_online: true, last_seen: None };
                    for peer in &online {
                        act.deliver(peer, &event, None, &mut dead);
                    }
                }

                if let Some((_, tx)) = act.subscribers.get(&subscriber_id) {
                    if tx.send(ServerEvent::OnlineUsers { user_ids: online }).is_err() {
                        dead.push(subscriber_id);
                    }
                }

                act.prune(dead, ctx);
            }),
        );
    }

    fn went_offline(&mut self, user_id: Uuid, ctx: &mut Context<Self>) {
        let Some(tracker) = self.presence.clone() else {
            return;
        };

        ctx.spawn(
            async move {
                if let Err(e) = tracker.record(user_id, false).await {
                    tracing::warn!("Failed to record user {} offline: {}", user_id, e);
                }
                tracker.peers(user_id).await.unwrap_or_else(|e| {
                    tracing::warn!("Failed to load peers of user {}: {}", user_id, e);
                    vec![]
                })
            }
            .into_actor(self)
            .map(move |peers, act, ctx| {
                // Reconnected while the offline write was in flight.
                if act.users.contains_key(&user_id) {
                    if let Some(tracker) = act.presence.clone() {
                        ctx.spawn(
                            async move {
                                if let Err(e) = tracker.record(user_id, true).await {
                                    tracing::warn!("Failed to restore user {} online: {}", user_id, e);
                                }
                            }
                            .into_actor(act),
                        );
                    }
                    return;
                }

                let event = ServerEvent::PresenceChanged {
                    user_id,
                    is_online: false,
                    last_seen: Some(chrono::Utc::now()),
                };

                let mut dead = vec![];
                let notified: usize =
                    peers.iter().map(|peer| act.deliver(peer, &event, None, &mut dead)).sum();
                tracing::info!("User {} went offline, notified {} subscribers", user_id, notified);

                act.prune(dead, ctx);
            }),
        );
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for RealtimeHub {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("Realtime hub started");

        if self.presence.is_some() {
            ctx.run_interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS), |act, ctx| {
                let (Some(tracker), false) = (act.presence.clone(), act.users.is_empty()) else {
                    return;
                };
                let user_ids = act.get_online_users();

                ctx.spawn(
                    async move {
                        if let Err(e) = tracker.refresh(user_ids).await {
                            tracing::warn!("Presence heartbeat failed: {}", e);
                        }
                    }
                    .into_actor(act),
                );
            });
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Realtime hub stopped");
    }
}

impl Handler<Subscribe> for RealtimeHub {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, ctx: &mut Context<Self>) {
        self.subscribers.insert(msg.id, (msg.user_id, msg.tx));

        let subscriber_ids = self.users.entry(msg.user_id).or_default();
        subscriber_ids.insert(msg.id);
        let first = subscriber_ids.len() == 1;

        tracing::debug!(
            "Subscriber {} attached to user {} ({} active)",
            msg.id,
            msg.user_id,
            subscriber_ids.len()
        );

        self.went_online(msg.user_id, msg.id, first, ctx);
    }
}

impl Handler<Unsubscribe> for RealtimeHub {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, ctx: &mut Context<Self>) {
        tracing::debug!("Subscriber {} detached", msg.id);
        self.remove_subscriber(msg.id, ctx);
    }
}

impl Handler<JoinRoom> for RealtimeHub {
    type Result = ();

    fn handle(&mut self, msg: JoinRoom, _: &mut Context<Self>) {
        let room = self.rooms.entry(msg.conversation_id).or_default();
        room.insert(msg.user_id);

        tracing::debug!(
            "User {} joined conversation {} ({} users in room)",
            msg.user_id,
            msg.conversation_id,
            room.len()
        );
    }
}

impl Handler<LeaveRoom> for RealtimeHub {
    type Result = ();

    fn handle(&mut self, msg: LeaveRoom, _: &mut Context<Self>) {
        if let Some(room) = self.rooms.get_mut(&msg.conversation_id) {
            room.remove(&msg.user_id);

            if room.is_empty() {
                self.rooms.remove(&msg.conversation_id);
            }
        }
    }
}

impl Handler<Publish> for RealtimeHub {
    type Result = ();

    fn handle(&mut self, msg: Publish, ctx: &mut Context<Self>) {
        let mut dead = vec![];
        let sent: usize = msg
            .user_ids
            .iter()
            .map(|user_id| self.deliver(user_id, &msg.event, msg.skip_subscriber, &mut dead))
            .sum();

        tracing::debug!("Published to {} users ({} subscribers)", msg.user_ids.len(), sent);
        self.prune(dead, ctx);
    }
}

impl Handler<BroadcastToRoom> for RealtimeHub {
    type Result = ();

    fn handle(&mut self, msg: BroadcastToRoom, ctx: &mut Context<Self>) {
        let Some(room_users) = self.rooms.get(&msg.conversation_id) else {
            tracing::debug!("Broadcast to empty room {}", msg.conversation_id);
            return;
        };

        if let Some(sender) = msg.skip_user_id {
            if !room_users.contains(&sender) {
                tracing::debug!("User {} is not in room {}", sender, msg.conversation_id);
                return;
            }
        }

        let targets: Vec<Uuid> =
            room_users.iter().filter(|id| Some(**id) != msg.skip_user_id).copied().collect();

        let mut dead = vec![];
        for user_id in &targets {
            self.deliver(user_id, &msg.event, None, &mut dead);
        }
        self.prune(dead, ctx);
    }
}

impl Handler<GetOnlineUsers> for RealtimeHub {
    type Result = Vec<Uuid>;

    fn handle(&mut self, _: GetOnlineUsers, _: &mut Context<Self>) -> Self::Result {
        self.get_online_users()
    }
}

impl Handler<IsOnline> for RealtimeHub {
    type Result = bool;

    fn handle(&mut self, msg: IsOnline, _: &mut Context<Self>) -> Self::Result {
        self.users.contains_key(&msg.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn subscribe(hub: &Addr<RealtimeHub>, user_id: Uuid) -> (Uuid, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::now_v7();
        hub.do_send(Subscribe { id, user_id, tx });
        (id, rx)
    }

    #[derive(Default)]
    struct FakeTracker {
        records: Mutex<Vec<(Uuid, bool)>>,
        peers: Mutex<HashMap<Uuid, Vec<Uuid>>>,
    }

    #[async_trait::async_trait]
    impl PresenceTracker for FakeTracker {
        async fn record(&self, user_id: Uuid, is_online: bool) -> Result<(), error::SystemError> {
            self.records.lock().unwrap().push((user_id, is_online));
            Ok(())
        }

        async fn peers(&self, user_id: Uuid) -> Result<Vec<Uuid>, error::SystemError> {
            Ok(self.peers.lock().unwrap().get(&user_id).cloned().unwrap_or_default())
        }

        async fn refresh(&self, _user_ids: Vec<Uuid>) -> Result<(), error::SystemError> {
            Ok(())
        }
    }

    async fn settle() {
        actix_web::rt::time::sleep(Duration::from_millis(50)).await;
    }

    #[actix_web::test]
    async fn test_publish_reaches_every_subscriber_of_user() {
        let hub = RealtimeHub::new().start();
        let user = Uuid::now_v7();
        let other = Uuid::now_v7();

        let (_, mut phone) = subscribe(&hub, user);
        let (_, mut laptop) = subscribe(&hub, user);
        let (_, mut stranger) = subscribe(&hub, other);

        hub.send(Publish::to_user(user, ServerEvent::Pong)).await.unwrap();

        assert!(matches!(phone.try_recv(), Ok(ServerEvent::Pong)));
        assert!(matches!(laptop.try_recv(), Ok(ServerEvent::Pong)));
        assert!(stranger.try_recv().is_err());
    }

    #[actix_web::test]
    async fn test_skip_subscriber_excludes_echo() {
        let hub = RealtimeHub::new().start();
        let user = Uuid::now_v7();

        let (origin, mut origin_rx) = subscribe(&hub, user);
        let (_, mut other_rx) = subscribe(&hub, user);

        hub.send(Publish {
            user_ids: vec![user],
            event: ServerEvent::Pong,
            skip_subscriber: Some(origin),
        })
        .await
        .unwrap();

        assert!(origin_rx.try_recv().is_err());
        assert!(matches!(other_rx.try_recv(), Ok(ServerEvent::Pong)));
    }

    #[actix_web::test]
    async fn test_closed_subscriber_is_pruned() {
        let hub = RealtimeHub::new().start();
        let user = Uuid::now_v7();

        let (_, rx) = subscribe(&hub, user);
        drop(rx);
        assert_eq!(hub.send(GetOnlineUsers).await.unwrap(), vec![user]);

        hub.send(Publish::to_user(user, ServerEvent::Pong)).await.unwrap();

        assert!(hub.send(GetOnlineUsers).await.unwrap().is_empty());
        assert!(!hub.send(IsOnline { user_id: user }).await.unwrap());
    }

    #[actix_web::test]
    async fn test_unsubscribe_keeps_other_devices_online() {
        let hub = RealtimeHub::new().start();
        let user = Uuid::now_v7();

        let (first, _rx1) = subscribe(&hub, user);
        let (_, _rx2) = subscribe(&hub, user);

        hub.send(Unsubscribe { id: first }).await.unwrap();
        assert!(hub.send(IsOnline { user_id: user }).await.unwrap());
    }

    #[actix_web::test]
    async fn test_room_broadcast_skips_sender() {
        let hub = RealtimeHub::new().start();
        let conversation_id = Uuid::now_v7();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();

        let (_, mut alice_rx) = subscribe(&hub, alice);
        let (_, mut bob_rx) = subscribe(&hub, bob);
        hub.do_send(JoinRoom { user_id: alice, conversation_id });
        hub.do_send(JoinRoom { user_id: bob, conversation_id });

        hub.send(BroadcastToRoom {
            conversation_id,
            event: ServerEvent::UserTyping { conversation_id, user_id: alice },
            skip_user_id: Some(alice),
        })
        .await
        .unwrap();

        assert!(alice_rx.try_recv().is_err());
        assert!(matches!(bob_rx.try_recv(), Ok(ServerEvent::UserTyping { user_id, .. }) if user_id == alice));
    }

    #[actix_web::test]
    async fn test_room_broadcast_requires_sender_in_room() {
        let hub = RealtimeHub::new().start();
        let conversation_id = Uuid::now_v7();
        let outsider = Uuid::now_v7();
        let member = Uuid::now_v7();

        let (_, mut member_rx) = subscribe(&hub, member);
        hub.do_send(JoinRoom { user_id: member, conversation_id });

        hub.send(BroadcastToRoom {
            conversation_id,
            event: ServerEvent::UserTyping { conversation_id, user_id: outsider },
            skip_user_id: Some(outsider),
        })
        .await
        .unwrap();

        assert!(member_rx.try_recv().is_err());
    }

    #[actix_web::test]
    async fn test_presence_transitions_notify_peers() {
        let tracker = Arc::new(FakeTracker::default());
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        tracker.peers.lock().unwrap().insert(alice, vec![bob]);
        tracker.peers.lock().unwrap().insert(bob, vec![alice]);

        let hub = RealtimeHub::with_presence(tracker.clone()).start();

        let (_, mut bob_rx) = subscribe(&hub, bob);
        settle().await;
        assert!(matches!(bob_rx.try_recv(), Ok(ServerEvent::OnlineUsers { user_ids }) if user_ids.is_empty()));

        let (alice_sub, mut alice_rx) = subscribe(&hub, alice);
        settle().await;

        assert!(matches!(
            bob_rx.try_recv(),
            Ok(ServerEvent::PresenceChanged { user_id, is_online: true, .. }) if user_id == alice
        ));
        assert!(matches!(
            alice_rx.try_recv(),
            Ok(ServerEvent::OnlineUsers { user_ids }) if user_ids == vec![bob]
        ));

        hub.send(Unsubscribe { id: alice_sub }).await.unwrap();
        settle().await;

        assert!(matches!(
            bob_rx.try_recv(),
            Ok(ServerEvent::PresenceChanged { user_id, is_online: false, last_seen: Some(_) })
                if user_id == alice
        ));

        let records = tracker.records.lock().unwrap().clone();
        assert_eq!(records, vec![(bob, true), (alice, true), (alice, false)]);
    }

    #[actix_web::test]
    async fn test_second_device_does_not_repeat_online_event() {
        let tracker = Arc::new(FakeTracker::default());
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        tracker.peers.lock().unwrap().insert(alice, vec![bob]);

        let hub = RealtimeHub::with_presence(tracker.clone()).start();
        let (_, mut bob_rx) = subscribe(&hub, bob);
        let (_, _alice_phone) = subscribe(&hub, alice);
        settle().await;
        while bob_rx.try_recv().is_ok() {}

        let (_, _alice_laptop) = subscribe(&hub, alice);
        settle().await;

        assert!(bob_rx.try_recv().is_err());
        let online_records =
            tracker.records.lock().unwrap().iter().filter(|(id, _)| *id == alice).count();
        assert_eq!(online_records, 1);
    }
}
