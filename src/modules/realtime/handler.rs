/// WebSocket HTTP handler
///
/// Upgrades `GET /ws` and pumps frames both ways:
/// - inbound: text frame -> `ClientMessage` -> session actor
/// - outbound: hub -> `ServerEvent` channel -> JSON text frame
use actix::{Actor, Addr};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::Message;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::hub::RealtimeHub;
use super::message::{ClientMessage, ServerEvent};
use super::session::WebSocketSession;
use crate::constants::{HEARTBEAT_INTERVAL_SECS, PRESENCE_TTL};
use crate::modules::conversation::service::ConversationService;
use crate::modules::message::service::MessageService;
use crate::ENV;

pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    hub: web::Data<Addr<RealtimeHub>>,
    message_service: web::Data<MessageService>,
    conversation_service: web::Data<ConversationService>,
) -> Result<HttpResponse, Error> {
    tracing::debug!("WebSocket upgrade request from {:?}", req.peer_addr());

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let addr = WebSocketSession::new(
        hub.get_ref().clone(),
        tx,
        ENV.jwt_secret.clone(),
        message_service.get_ref().clone(),
        conversation_service.get_ref().clone(),
    )
    .start();

    actix_web::rt::spawn(async move {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        let mut last_frame = Instant::now();

        loop {
            tokio::select! {
                msg = msg_stream.recv() => {
                    last_frame = Instant::now();
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(client_msg) => addr.do_send(client_msg),
                                Err(e) => {
                                    tracing::warn!(
                                        "Unparseable client frame: {} - raw: {}",
                                        e,
                                        text.chars().take(100).collect::<String>()
                                    );
                                    let reply = ServerEvent::error("Malformed message");
                                    if let Ok(json) = serde_json::to_string(&reply) {
                                        if ws_session.text(json).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                        }

                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_session.pong(&data).await {
                                tracing::error!("Failed to send pong: {}", e);
                                break;
                            }
                        }

                        Some(Ok(Message::Pong(_))) => {}

                        Some(Ok(Message::Close(reason))) => {
                            tracing::info!("WebSocket close frame: {:?}", reason);
                            break;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("Binary frames are not supported");
                        }

                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}

                        Some(Err(e)) => {
                            tracing::error!("WebSocket protocol error: {}", e);
                            break;
                        }

                        None => break,
                    }
                }

                Some(event) = rx.recv() => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to serialize server event: {}", e);
                            continue;
                        }
                    };
                    if ws_session.text(json).await.is_err() {
                        tracing::error!("Failed to write to WebSocket client");
                        break;
                    }
                }

                _ = heartbeat.tick() => {
                    if last_frame.elapsed() > Duration::from_secs(PRESENCE_TTL) {
                        tracing::info!("WebSocket client timed out, closing");
                        break;
                    }
                    if ws_session.ping(b"").await.is_err() {
                        break;
                    }
                }
            }
        }

        // Dropping the address stops the session, which unsubscribes it.
        drop(addr);
        let _ = ws_session.close(None).await;
        tracing::debug!("WebSocket message loop finished");
    });

    tracing::info!("WebSocket connection established");
    Ok(response)
}
