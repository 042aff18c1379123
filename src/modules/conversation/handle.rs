use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::conversation::{
        model::{
            ConversationDetail, MessagePage, MessageQueryRequest, NewDirectConversation,
            NewGroupConversation, ReadReceipt,
        },
        service::ConversationService,
    },
    utils::ValidatedJson,
};

#[get("")]
pub async fn list_conversations(
    conversation_service: web::Data<ConversationService>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConversationDetail>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let conversations = conversation_service.list_for_user(user_id).await?;

    Ok(success::Success::ok(Some(conversations)).message("Conversations retrieved successfully"))
}

#[post("")]
pub async fn create_direct_conversation(
    conversation_service: web::Data<ConversationService>,
    ValidatedJson(body): ValidatedJson<NewDirectConversation>,
    req: HttpRequest,
) -> Result<success::Success<ConversationDetail>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let conversation = conversation_service.create_direct(user_id, body.peer_id).await?;

    Ok(success::Success::ok(Some(conversation)))
}

#[post("/group")]
pub async fn create_group_conversation(
    conversation_service: web::Data<ConversationService>,
    ValidatedJson(body): ValidatedJson<NewGroupConversation>,
    req: HttpRequest,
) -> Result<success::Success<ConversationDetail>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let conversation =
        conversation_service.create_group(user_id, &body.name, &body.member_ids).await?;

    Ok(success::Success::created(Some(conversation)).message("Group created successfully"))
}

#[get("/{conversation_id}")]
pub async fn get_conversation(
    conversation_service: web::Data<ConversationService>,
    conversation_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConversationDetail>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let conversation = conversation_service.get_detail(*conversation_id, user_id).await?;

    Ok(success::Success::ok(Some(conversation)))
}

#[get("/{conversation_id}/messages")]
pub async fn get_messages(
    conversation_service: web::Data<ConversationService>,
    conversation_id: web::Path<Uuid>,
    query: web::Query<MessageQueryRequest>,
    req: HttpRequest,
) -> Result<success::Success<MessagePage>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let page = conversation_service
        .get_messages(*conversation_id, user_id, query.limit, query.cursor.as_deref())
        .await?;

    Ok(success::Success::ok(Some(page)))
}

#[post("/{conversation_id}/read")]
pub async fn mark_conversation_read(
    conversation_service: web::Data<ConversationService>,
    conversation_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ReadReceipt>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let receipt = conversation_service.mark_read(*conversation_id, user_id).await?;

    Ok(success::Success::ok(Some(receipt)))
}
