use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::notification::{
        model::{
            MarkAllReadResult, NotificationQuery, NotificationResponse, UnreadNotificationCount,
        },
        service::NotificationService,
    },
};

#[get("")]
pub async fn list_notifications(
    notification_service: web::Data<NotificationService>,
    query: web::Query<NotificationQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<NotificationResponse>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let notifications =
        notification_service.list(user_id, query.limit, query.unread_only).await?;

    Ok(success::Success::ok(Some(notifications)))
}

#[get("/unread-count")]
pub async fn unread_notification_count(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<success::Success<UnreadNotificationCount>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let unread_count = notification_service.unread_count(user_id).await?;

    Ok(success::Success::ok(Some(UnreadNotificationCount { unread_count })))
}

#[post("/read-all")]
pub async fn mark_all_notifications_read(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<success::Success<MarkAllReadResult>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let result = notification_service.mark_all_read(user_id).await?;

    Ok(success::Success::ok(Some(result)))
}

#[post("/{notification_id}/read")]
pub async fn mark_notification_read(
    notification_service: web::Data<NotificationService>,
    notification_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<NotificationResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let notification = notification_service.mark_read(*notification_id, user_id).await?;

    Ok(success::Success::ok(Some(notification)))
}
