use actix_web::web::{self, ServiceConfig};

use super::handle::{graphql_handler, graphql_ws_handler};

/// `POST /api/graphql`, mounted behind the JWT middleware.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(web::resource("/graphql").route(web::post().to(graphql_handler)));
}

/// `GET /graphql/ws`; authenticates inside the protocol.
pub fn ws_configure(cfg: &mut ServiceConfig) {
    cfg.service(web::resource("/graphql/ws").route(web::get().to(graphql_ws_handler)));
}
