use crate::modules::message::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/messages")
            .service(send_direct_message)
            .service(send_conversation_message)
            .service(mark_message_read)
            .service(edit_message)
            .service(delete_message),
    );
}
