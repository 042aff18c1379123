use async_graphql::{Context, Object};
use uuid::Uuid;

use super::schema::{services, viewer};
use crate::api::error;
use crate::modules::{
    call::model::CallResponse,
    conversation::model::{ConversationDetail, MessagePage},
    notification::model::NotificationResponse,
    realtime::presence::PresenceInfo,
    user::model::UserResponse,
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<UserResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?.users.get_by_id(user_id).await.map_err(error::graphql)
    }

    async fn user(&self, ctx: &Context<'_>, id: Uuid) -> async_graphql::Result<UserResponse> {
        viewer(ctx)?;
        services(ctx)?.users.get_by_id(id).await.map_err(error::graphql)
    }

    async fn search_users(
        &self,
        ctx: &Context<'_>,
        query: String,
        limit: Option<i32>,
    ) -> async_graphql::Result<Vec<UserResponse>> {
        viewer(ctx)?;
        services(ctx)?
            .users
            .search(&query, limit.map(i64::from))
            .await
            .map_err(error::graphql)
    }

    async fn conversations(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<ConversationDetail>> {
        let user_id = viewer(ctx)?;
        services(ctx)?.conversations.list_for_user(user_id).await.map_err(error::graphql)
    }

    async fn conversation(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
    ) -> async_graphql::Result<ConversationDetail> {
        let user_id = viewer(ctx)?;
        services(ctx)?.conversations.get_detail(id, user_id).await.map_err(error::graphql)
    }

    /// Newest page first; pass `nextCursor` back as `cursor` for older messages.
    async fn messages(
        &self,
        ctx: &Context<'_>,
        conversation_id: Uuid,
        limit: Option<i32>,
        cursor: Option<String>,
    ) -> async_graphql::Result<MessagePage> {
        let user_id = viewer(ctx)?;
        services(ctx)?
            .conversations
            .get_messages(conversation_id, user_id, limit.map(i64::from), cursor.as_deref())
            .await
            .map_err(error::graphql)
    }

    async fn notifications(
        &self,
        ctx: &Context<'_>,
        limit: Option<i32>,
        #[graphql(default)] unread_only: bool,
    ) -> async_graphql::Result<Vec<NotificationResponse>> {
        let user_id = viewer(ctx)?;
        services(ctx)?
            .notifications
            .list(user_id, limit.map(i64::from), unread_only)
            .await
            .map_err(error::graphql)
    }

    async fn unread_notification_count(&self, ctx: &Context<'_>) -> async_graphql::Result<i64> {
        let user_id = viewer(ctx)?;
        services(ctx)?.notifications.unread_count(user_id).await.map_err(error::graphql)
    }

    async fn presence(
        &self,
        ctx: &Context<'_>,
        user_ids: Vec<Uuid>,
    ) -> async_graphql::Result<Vec<PresenceInfo>> {
        viewer(ctx)?;
        if user_ids.len() > 200 {
            return Err(error::graphql(error::SystemError::bad_request(
                "At most 200 user ids are allowed",
            )));
        }
        services(ctx)?.presence.get_online_status_batch(&user_ids).await.map_err(error::graphql)
    }

    async fn call(&self, ctx: &Context<'_>, id: Uuid) -> async_graphql::Result<CallResponse> {
        let user_id = viewer(ctx)?;
        services(ctx)?.calls.get(id, user_id).await.map_err(error::graphql)
    }
}
