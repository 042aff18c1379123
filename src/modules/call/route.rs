use crate::modules::call::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/calls")
            .service(start_call)
            .service(get_call)
            .service(accept_call)
            .service(reject_call)
            .service(end_call)
            .service(signal_call),
    );
}
