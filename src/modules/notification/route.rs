use crate::modules::notification::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/notifications")
            .service(list_notifications)
            .service(unread_notification_count)
            .service(mark_all_notifications_read)
            .service(mark_notification_read),
    );
}
