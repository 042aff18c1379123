use async_graphql::{Context, Subscription};
use futures_util::{future, Stream, StreamExt};
use uuid::Uuid;

use super::schema::{services, viewer};
use super::types::{CallEvent, EventEnvelope, MessageUpdate, ReadStateChange};
use crate::api::error;
use crate::modules::{
    message::model::MessageResponse,
    notification::model::NotificationResponse,
    realtime::{message::ServerEvent, subscription::subscribe},
};

pub struct SubscriptionRoot;

/// Subscribes the viewer to the hub, optionally narrowed to one conversation
/// they belong to.
async fn viewer_events(
    ctx: &Context<'_>,
    conversation_id: Option<Uuid>,
) -> async_graphql::Result<impl Stream<Item = ServerEvent>> {
    let user_id = viewer(ctx)?;
    let services = services(ctx)?;

    if let Some(conversation_id) = conversation_id {
        services
            .conversations
            .ensure_member(conversation_id, user_id)
            .await
            .map_err(error::graphql)?;
    }

    Ok(subscribe(&services.hub, user_id).filter(move |event| {
        future::ready(conversation_id.is_none() || event.conversation_id() == conversation_id)
    }))
}

#[Subscription]
impl SubscriptionRoot {
    async fn message_added(
        &self,
        ctx: &Context<'_>,
        conversation_id: Option<Uuid>,
    ) -> async_graphql::Result<impl Stream<Item = MessageResponse>> {
        Ok(viewer_events(ctx, conversation_id).await?.filter_map(|event| {
            future::ready(match event {
                ServerEvent::NewMessage { message, .. } => Some(message),
                _ => None,
            })
        }))
    }

    /// Edits and deletions
    async fn message_updated(
        &self,
        ctx: &Context<'_>,
        conversation_id: Option<Uuid>,
    ) -> async_graphql::Result<impl Stream<Item = MessageUpdate>> {
        Ok(viewer_events(ctx, conversation_id)
            .await?
            .filter_map(|event| future::ready(MessageUpdate::from_event(&event))))
    }

    async fn read_state_changed(
        &self,
        ctx: &Context<'_>,
        conversation_id: Option<Uuid>,
    ) -> async_graphql::Result<impl Stream<Item = ReadStateChange>> {
        Ok(viewer_events(ctx, conversation_id)
            .await?
            .filter_map(|event| future::ready(ReadStateChange::from_event(&event))))
    }

    async fn notification_added(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<impl Stream<Item = NotificationResponse>> {
        Ok(viewer_events(ctx, None).await?.filter_map(|event| {
            future::ready(match event {
                ServerEvent::NotificationAdded { notification } => Some(notification),
                _ => None,
            })
        }))
    }

    async fn call_events(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<impl Stream<Item = CallEvent>> {
        Ok(viewer_events(ctx, None)
            .await?
            .filter_map(|event| future::ready(CallEvent::from_event(&event))))
    }

    /// Every event delivered to the viewer, in the `/ws` JSON shape.
    async fn events(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<impl Stream<Item = EventEnvelope>> {
        Ok(viewer_events(ctx, None)
            .await?
            .filter_map(|event| future::ready(EventEnvelope::from_event(&event))))
    }
}
