use actix::Addr;
use async_graphql::{Context, Schema};

use super::mutation::MutationRoot;
use super::query::QueryRoot;
use super::subscription::SubscriptionRoot;
use super::types::Viewer;
use crate::api::error;
use crate::modules::{
    call::service::CallService, conversation::service::ConversationService,
    message::service::MessageService, notification::service::NotificationService,
    realtime::{hub::RealtimeHub, presence::PresenceService},
    user::service::UserService,
};
use crate::utils::{strip_bearer, Claims};

/// Services shared by every resolver
#[derive(Clone)]
pub struct GraphQLContext {
    pub users: UserService,
    pub presence: PresenceService,
    pub conversations: ConversationService,
    pub messages: MessageService,
    pub notifications: NotificationService,
    pub calls: CallService,
    pub hub: Addr<RealtimeHub>,
}

pub type AppSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(context: GraphQLContext) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot).data(context).finish()
}

pub(super) fn services<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a GraphQLContext> {
    ctx.data::<GraphQLContext>()
}

pub(super) fn viewer(ctx: &Context<'_>) -> async_graphql::Result<uuid::Uuid> {
    ctx.data_opt::<Viewer>()
        .map(|viewer| viewer.0)
        .ok_or_else(|| error::graphql(error::SystemError::unauthorized("Authentication required")))
}

/// Reads the access token from a `connection_init` payload:
/// `{ "authorization": "Bearer <jwt>" }` or `{ "token": "<jwt>" }`.
pub fn viewer_from_init(
    payload: &serde_json::Value,
    secret: &[u8],
) -> async_graphql::Result<Viewer> {
    let token = ["authorization", "Authorization", "token"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(|v| v.as_str()))
        .map(strip_bearer)
        .ok_or_else(|| error::graphql(error::SystemError::unauthorized("Missing access token")))?;

    let claims = Claims::decode_access(token, secret).map_err(|e| {
        tracing::warn!("GraphQL subscription auth failed: {}", e);
        error::graphql(error::SystemError::unauthorized("Token invalid or expired"))
    })?;

    Ok(Viewer(claims.sub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::user::schema::UserRole;
    use crate::test::TestApp;
    use crate::utils::TypeClaims;
    use async_graphql::{Request, Variables};
    use futures_util::StreamExt;
    use serde_json::json;

    const SECRET: &[u8] = b"graphql-secret";

    fn error_code(response: &async_graphql::Response) -> serde_json::Value {
        serde_json::to_value(response).unwrap()["errors"][0]["extensions"]["code"].clone()
    }

    #[actix_web::test]
    async fn test_queries_require_a_viewer() {
        let app = TestApp::new();
        let schema = build_schema(app.graphql_context());

        let response = schema.execute("{ conversations { id } }").await;

        assert_eq!(error_code(&response), json!("UNAUTHORIZED"));
    }

    #[actix_web::test]
    async fn test_send_message_to_unknown_user_is_not_found() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let schema = build_schema(app.graphql_context());

        let request = Request::new(
            "mutation Send($to: UUID!) { sendMessage(receiverId: $to, content: \"hi\") { id } }",
        )
        .variables(Variables::from_json(json!({ "to": uuid::Uuid::now_v7() })))
        .data(Viewer(alice));
        let response = schema.execute(request).await;

        assert_eq!(error_code(&response), json!("NOT_FOUND"));
        assert_eq!(app.store.message_count(), 0);
    }

    #[actix_web::test]
    async fn test_create_group_then_list_conversations() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let bob = app.store.add_user("bob");
        let schema = build_schema(app.graphql_context());

        let request = Request::new(
            "mutation Group($members: [UUID!]!) { createGroup(name: \"team\", memberIds: $members) { id type name } }",
        )
        .variables(Variables::from_json(json!({ "members": [bob] })))
        .data(Viewer(alice));
        let response = schema.execute(request).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        let created = response.data.into_json().unwrap();
        assert_eq!(created["createGroup"]["type"], json!("GROUP"));
        assert_eq!(created["createGroup"]["name"], json!("team"));

        let listed = schema
            .execute(Request::new("{ conversations { id participants { userId } } }").data(Viewer(bob)))
            .await
            .data
            .into_json()
            .unwrap();
        let conversations = listed["conversations"].as_array().unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0]["id"], created["createGroup"]["id"]);
        assert_eq!(conversations[0]["participants"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_message_added_subscription_delivers_new_messages() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let bob = app.store.add_user("bob");
        let schema = build_schema(app.graphql_context());

        let mut stream = schema.execute_stream(
            Request::new("subscription { messageAdded { senderId content } }").data(Viewer(bob)),
        );

        let (response, sent) = tokio::join!(stream.next(), async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            app.messages.send_direct(alice, bob, Some("hello".into()), None).await
        });
        sent.unwrap();

        let data = response.unwrap().data.into_json().unwrap();
        assert_eq!(data["messageAdded"]["content"], json!("hello"));
        assert_eq!(data["messageAdded"]["senderId"], json!(alice.to_string()));
    }

    #[actix_web::test]
    async fn test_subscription_to_foreign_conversation_is_rejected() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let bob = app.store.add_user("bob");
        let carol = app.store.add_user("carol");
        let message = app.messages.send_direct(alice, bob, Some("hi".into()), None).await.unwrap();
        let schema = build_schema(app.graphql_context());

        let request = Request::new(
            "subscription Watch($id: UUID!) { messageAdded(conversationId: $id) { id } }",
        )
        .variables(Variables::from_json(json!({ "id": message.conversation_id })))
        .data(Viewer(carol));
        let response = schema.execute_stream(request).next().await.unwrap();

        assert_eq!(error_code(&response), json!("FORBIDDEN"));
    }

    #[test]
    fn test_viewer_from_init_payload() {
        let user_id = uuid::Uuid::now_v7();
        let token = Claims::new(&user_id, &UserRole::User, 60)
            .with_type(TypeClaims::AccessToken)
            .encode(SECRET)
            .unwrap();

        let bearer = json!({ "authorization": format!("Bearer {token}") });
        assert_eq!(viewer_from_init(&bearer, SECRET).unwrap().0, user_id);

        let bare = json!({ "token": token });
        assert_eq!(viewer_from_init(&bare, SECRET).unwrap().0, user_id);

        assert!(viewer_from_init(&json!({}), SECRET).is_err());
        assert!(viewer_from_init(&bare, b"other-secret").is_err());
    }
}
