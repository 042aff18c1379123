use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::modules::realtime::presence::{PresenceInfo, PresenceService};
use crate::modules::user::{model, service::UserService};
use crate::{
    api::{error, success},
    middlewares::get_claims,
    utils::{ValidatedJson, ValidatedQuery},
};

#[get("/me")]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_claims(&req)?.sub;
    let user = user_service.get_by_id(id).await?;
    Ok(success::Success::ok(Some(user)).message("Profile retrieved successfully"))
}

#[get("/{id:[0-9a-fA-F-]{36}}")]
pub async fn get_user(
    user_service: web::Data<UserService>,
    user_id: web::Path<Uuid>,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let user = user_service.get_by_id(user_id.into_inner()).await?;
    Ok(success::Success::ok(Some(user)).message("User retrieved successfully"))
}

#[get("")]
pub async fn search_users(
    user_service: web::Data<UserService>,
    ValidatedQuery(query): ValidatedQuery<model::SearchUsersQuery>,
) -> Result<success::Success<Vec<model::UserResponse>>, error::Error> {
    let users = user_service.search(&query.q, query.limit).await?;
    Ok(success::Success::ok(Some(users)))
}

#[post("/presence")]
pub async fn get_presence(
    presence_service: web::Data<PresenceService>,
    ValidatedJson(body): ValidatedJson<model::PresenceQuery>,
) -> Result<success::Success<Vec<PresenceInfo>>, error::Error> {
    let presence = presence_service.get_online_status_batch(&body.user_ids).await?;
    Ok(success::Success::ok(Some(presence)))
}
