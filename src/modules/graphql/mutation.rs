use async_graphql::{Context, Json, Object};
use uuid::Uuid;

use super::schema::{services, viewer};
use crate::api::error;
use crate::modules::{
    call::{model::CallResponse, schema::CallKind},
    conversation::model::{ConversationDetail, ReadReceipt},
    message::model::MessageResponse,
    notification::model::{MarkAllReadResult, NotificationResponse},
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn send_message(
        &self,
        ctx: &Context<'_>,
        receiver_id: Uuid,
        content: Option<String>,
        file_url: Option<String>,
    ) -> async_graphql::Result<MessageResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?
            .messages
            .send_direct(user_id, receiver_id, content, file_url)
            .await
            .map_err(error::graphql)
    }

    async fn send_conversation_message(
        &self,
        ctx: &Context<'_>,
        conversation_id: Uuid,
        content: Option<String>,
        file_url: Option<String>,
    ) -> async_graphql::Result<MessageResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?
            .messages
            .send_to_conversation(user_id, conversation_id, content, file_url)
            .await
            .map_err(error::graphql)
    }

    async fn create_group(
        &self,
        ctx: &Context<'_>,
        name: String,
        member_ids: Vec<Uuid>,
    ) -> async_graphql::Result<ConversationDetail> {
        let user_id = viewer(ctx)?;
        services(ctx)?
            .conversations
            .create_group(user_id, &name, &member_ids)
            .await
            .map_err(error::graphql)
    }

    async fn mark_message_read(
        &self,
        ctx: &Context<'_>,
        message_id: Uuid,
    ) -> async_graphql::Result<ReadReceipt> {
        let user_id = viewer(ctx)?;
        services(ctx)?.messages.mark_message_read(message_id, user_id).await.map_err(error::graphql)
    }

    async fn mark_conversation_read(
        &self,
        ctx: &Context<'_>,
        conversation_id: Uuid,
    ) -> async_graphql::Result<ReadReceipt> {
        let user_id = viewer(ctx)?;
        services(ctx)?
            .conversations
            .mark_read(conversation_id, user_id)
            .await
            .map_err(error::graphql)
    }

    async fn edit_message(
        &self,
        ctx: &Context<'_>,
        message_id: Uuid,
        content: String,
    ) -> async_graphql::Result<MessageResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?.messages.edit(message_id, user_id, &content).await.map_err(error::graphql)
    }

    async fn delete_message(
        &self,
        ctx: &Context<'_>,
        message_id: Uuid,
    ) -> async_graphql::Result<bool> {
        let user_id = viewer(ctx)?;
        services(ctx)?.messages.delete(message_id, user_id).await.map_err(error::graphql)?;
        Ok(true)
    }

    async fn mark_notification_read(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
    ) -> async_graphql::Result<NotificationResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?.notifications.mark_read(id, user_id).await.map_err(error::graphql)
    }

    async fn mark_all_notifications_read(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<MarkAllReadResult> {
        let user_id = viewer(ctx)?;
        services(ctx)?.notifications.mark_all_read(user_id).await.map_err(error::graphql)
    }

    async fn start_call(
        &self,
        ctx: &Context<'_>,
        callee_id: Uuid,
        kind: CallKind,
        conversation_id: Option<Uuid>,
    ) -> async_graphql::Result<CallResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?
            .calls
            .start(user_id, callee_id, kind, conversation_id)
            .await
            .map_err(error::graphql)
    }

    async fn accept_call(&self, ctx: &Context<'_>, call_id: Uuid) -> async_graphql::Result<CallResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?.calls.accept(call_id, user_id).await.map_err(error::graphql)
    }

    async fn reject_call(&self, ctx: &Context<'_>, call_id: Uuid) -> async_graphql::Result<CallResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?.calls.reject(call_id, user_id).await.map_err(error::graphql)
    }

    async fn end_call(&self, ctx: &Context<'_>, call_id: Uuid) -> async_graphql::Result<CallResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?.calls.end(call_id, user_id).await.map_err(error::graphql)
    }

    /// Relays an SDP offer/answer or ICE candidate to the other party.
    async fn send_call_signal(
        &self,
        ctx: &Context<'_>,
        call_id: Uuid,
        payload: Json<serde_json::Value>,
    ) -> async_graphql::Result<bool> {
        let user_id = viewer(ctx)?;
        services(ctx)?.calls.signal(call_id, user_id, payload.0).await.map_err(error::graphql)?;
        Ok(true)
    }
}
