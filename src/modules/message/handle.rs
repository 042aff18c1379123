use actix_web::{delete, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::model::ReadReceipt,
        message::{
            model::{EditMessage, MessageResponse, SendConversationMessage, SendDirectMessage},
            service::MessageService,
        },
    },
    utils::ValidatedJson,
};

#[post("/direct")]
pub async fn send_direct_message(
    message_service: web::Data<MessageService>,
    ValidatedJson(body): ValidatedJson<SendDirectMessage>,
    req: HttpRequest,
) -> Result<success::Success<MessageResponse>, error::Error> {
    let sender_id = get_claims(&req)?.sub;
    let message = message_service
        .send_direct(sender_id, body.receiver_id, body.content, body.file_url)
        .await?;

    Ok(success::Success::created(Some(message)).message("Message sent successfully"))
}

#[post("/conversation/{conversation_id}")]
pub async fn send_conversation_message(
    message_service: web::Data<MessageService>,
    conversation_id: web::Path<Uuid>,
    ValidatedJson(body): ValidatedJson<SendConversationMessage>,
    req: HttpRequest,
) -> Result<success::Success<MessageResponse>, error::Error> {
    let sender_id = get_claims(&req)?.sub;
    let message = message_service
        .send_to_conversation(sender_id, *conversation_id, body.content, body.file_url)
        .await?;

    Ok(success::Success::created(Some(message)).message("Message sent successfully"))
}

#[post("/{message_id}/read")]
pub async fn mark_message_read(
    message_service: web::Data<MessageService>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ReadReceipt>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let receipt = message_service.mark_message_read(*message_id, user_id).await?;

    Ok(success::Success::ok(Some(receipt)))
}

#[patch("/{message_id}")]
pub async fn edit_message(
    message_service: web::Data<MessageService>,
    message_id: web::Path<Uuid>,
    ValidatedJson(body): ValidatedJson<EditMessage>,
    req: HttpRequest,
) -> Result<success::Success<MessageResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let message = message_service.edit(*message_id, user_id, &body.content).await?;

    Ok(success::Success::ok(Some(message)).message("Message updated successfully"))
}

#[delete("/{message_id}")]
pub async fn delete_message(
    message_service: web::Data<MessageService>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    message_service.delete(*message_id, user_id).await?;

    Ok(success::Success::no_content())
}
