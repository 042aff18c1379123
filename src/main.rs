use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    http::header,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{RedisCache, connect_database, init_logging},
    middlewares::{authentication, authorization},
    modules::{
        attachment::{
            model::UploadConfig, repository_pg::AttachmentRepositoryPg,
            service::AttachmentService,
        },
        call::{repository_pg::CallRepositoryPg, service::CallService},
        conversation::{
            repository_pg::{ConversationRepositoryPg, ParticipantRepositoryPg},
            service::ConversationService,
        },
        graphql::schema::{GraphQLContext, build_schema},
        message::{repository_pg::MessageRepositoryPg, service::MessageService},
        notification::{repository_pg::NotificationRepositoryPg, service::NotificationService},
        realtime::{
            handler::websocket_handler,
            hub::RealtimeHub,
            presence::{PresenceRecorder, PresenceService},
        },
        user::{repository_pg::UserRepositoryPg, schema::UserRole, service::UserService},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();

    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    let redis_pool =
        RedisCache::new().await.map_err(|_| std::io::Error::other("Redis connection error"))?;

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let conversation_repo = Arc::new(ConversationRepositoryPg::new(db_pool.clone()));
    let participant_repo = Arc::new(ParticipantRepositoryPg::new(db_pool.clone()));
    let message_repo = Arc::new(MessageRepositoryPg::new(db_pool.clone()));
    let notification_repo = Arc::new(NotificationRepositoryPg::new(db_pool.clone()));
    let call_repo = Arc::new(CallRepositoryPg::new(db_pool.clone()));
    let attachment_repo = Arc::new(AttachmentRepositoryPg::new(db_pool.clone()));

    let user_service = UserService::with_dependencies(user_repo.clone(), Arc::new(redis_pool.clone()));
    let presence_service = PresenceService::new(redis_pool.pool());

    let recorder =
        PresenceRecorder::new(presence_service.clone(), user_service.clone(), participant_repo.clone());
    let hub = RealtimeHub::with_presence(Arc::new(recorder)).start();

    let notification_service = NotificationService::with_dependencies(notification_repo, hub.clone());
    let conversation_service = ConversationService::with_dependencies(
        conversation_repo.clone(),
        participant_repo.clone(),
        message_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
        hub.clone(),
    );
    let message_service = MessageService::with_dependencies(
        message_repo,
        conversation_repo,
        participant_repo,
        user_repo.clone(),
        conversation_service.clone(),
        notification_service.clone(),
        hub.clone(),
    );
    let call_service = CallService::with_dependencies(
        call_repo,
        user_repo,
        notification_service.clone(),
        hub.clone(),
    );
    let attachment_service =
        AttachmentService::with_dependencies(attachment_repo, UploadConfig::from_env(&ENV));

    let schema = build_schema(GraphQLContext {
        users: user_service.clone(),
        presence: presence_service.clone(),
        conversations: conversation_service.clone(),
        messages: message_service.clone(),
        notifications: notification_service.clone(),
        calls: call_service.clone(),
        hub: hub.clone(),
    });

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ENV.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(presence_service.clone()))
            .app_data(web::Data::new(conversation_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(call_service.clone()))
            .app_data(web::Data::new(attachment_service.clone()))
            .app_data(web::Data::new(hub.clone()))
            .app_data(web::Data::new(schema.clone()))
            .service(health_check)
            .route("/ws", web::get().to(websocket_handler))
            .configure(modules::graphql::route::ws_configure)
            .service(
                web::scope(&ENV.upload_base_url)
                    .configure(modules::attachment::route::files_configure),
            )
            .service(
                web::scope("/api")
                    .wrap(from_fn(authorization(vec![UserRole::User, UserRole::Admin])))
                    .wrap(from_fn(authentication))
                    .configure(modules::user::route::configure)
                    .configure(modules::conversation::route::configure)
                    .configure(modules::message::route::configure)
                    .configure(modules::notification::route::configure)
                    .configure(modules::call::route::configure)
                    .configure(modules::attachment::route::configure)
                    .configure(modules::graphql::route::configure),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(ENV.workers)
    .run()
    .await
}
