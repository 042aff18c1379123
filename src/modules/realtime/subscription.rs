use actix::Addr;
use futures_util::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{Subscribe, Unsubscribe};
use super::hub::RealtimeHub;
use super::message::ServerEvent;

/// Detaches the subscriber from the hub when the stream is dropped.
pub struct SubscriptionGuard {
    id: Uuid,
    hub: Addr<RealtimeHub>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.hub.do_send(Unsubscribe { id: self.id });
    }
}

/// Registers a new subscriber for `user_id` and yields every event the hub
/// delivers to it.
pub fn subscribe(hub: &Addr<RealtimeHub>, user_id: Uuid) -> impl Stream<Item = ServerEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = Uuid::now_v7();
    hub.do_send(Subscribe { id, user_id, tx });

    let guard = SubscriptionGuard { id, hub: hub.clone() };
    futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv().await.map(|event| (event, (rx, guard)))
    })
}
