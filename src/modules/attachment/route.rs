use crate::modules::attachment::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/attachments")
            .service(upload_attachment)
            .service(get_attachment)
            .service(delete_attachment),
    );
}

/// Public file serving, mounted at the upload base URL.
pub fn files_configure(cfg: &mut ServiceConfig) {
    cfg.service(serve_upload);
}
