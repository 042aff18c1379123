use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::call::{
        model::{CallResponse, CallSignal, StartCall},
        service::CallService,
    },
    utils::ValidatedJson,
};

#[post("")]
pub async fn start_call(
    call_service: web::Data<CallService>,
    ValidatedJson(body): ValidatedJson<StartCall>,
    req: HttpRequest,
) -> Result<success::Success<CallResponse>, error::Error> {
    let caller_id = get_claims(&req)?.sub;
    let call =
        call_service.start(caller_id, body.callee_id, body.kind, body.conversation_id).await?;

    Ok(success::Success::created(Some(call)).message("Call started"))
}

#[get("/{call_id}")]
pub async fn get_call(
    call_service: web::Data<CallService>,
    call_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<CallResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let call = call_service.get(*call_id, user_id).await?;

    Ok(success::Success::ok(Some(call)))
}

#[post("/{call_id}/accept")]
pub async fn accept_call(
    call_service: web::Data<CallService>,
    call_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<CallResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let call = call_service.accept(*call_id, user_id).await?;

    Ok(success::Success::ok(Some(call)).message("Call accepted"))
}

#[post("/{call_id}/reject")]
pub async fn reject_call(
    call_service: web::Data<CallService>,
    call_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<CallResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let call = call_service.reject(*call_id, user_id).await?;

    Ok(success::Success::ok(Some(call)).message("Call rejected"))
}

#[post("/{call_id}/end")]
pub async fn end_call(
    call_service: web::Data<CallService>,
    call_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<CallResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let call = call_service.end(*call_id, user_id).await?;

    Ok(success::Success::ok(Some(call)).message("Call ended"))
}

#[post("/{call_id}/signal")]
pub async fn signal_call(
    call_service: web::Data<CallService>,
    call_id: web::Path<Uuid>,
    body: web::Json<CallSignal>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    call_service.signal(*call_id, user_id, body.into_inner().payload).await?;

    Ok(success::Success::no_content())
}
