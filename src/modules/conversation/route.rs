use crate::modules::conversation::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/conversations")
            .service(list_conversations)
            .service(create_direct_conversation)
            .service(create_group_conversation)
            .service(get_conversation)
            .service(get_messages)
            .service(mark_conversation_read),
    );
}
