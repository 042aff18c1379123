/// WebSocket session actor
///
/// One actor per `/ws` connection. It owns the auth state and forwards
/// client frames to the services; everything the client receives arrives
/// through the hub on `tx`.
use actix::prelude::*;
use std::future::Future;
use uuid::Uuid;

use super::events::*;
use super::hub::RealtimeHub;
use super::message::{ClientMessage, ServerEvent};
use crate::api::error;
use crate::modules::conversation::service::ConversationService;
use crate::modules::message::service::MessageService;
use crate::utils::Claims;

pub struct WebSocketSession {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    hub: Addr<RealtimeHub>,
    tx: EventSender,
    jwt_secret: String,
    messages: MessageService,
    conversations: ConversationService,
}

impl WebSocketSession {
    pub fn new(
        hub: Addr<RealtimeHub>,
        tx: EventSender,
        jwt_secret: String,
        messages: MessageService,
        conversations: ConversationService,
    ) -> Self {
        Self { id: Uuid::now_v7(), user_id: None, hub, tx, jwt_secret, messages, conversations }
    }

    fn send_to_client(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Session {} outbound channel closed", self.id);
        }
    }

    fn require_auth(&self) -> Option<Uuid> {
        if self.user_id.is_none() {
            self.send_to_client(ServerEvent::error("Authenticate before sending this message"));
            tracing::warn!("Session {} is not authenticated, request refused", self.id);
        }
        self.user_id
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        match msg {
            ClientMessage::Auth { token } => self.handle_auth(&token),

            ClientMessage::SendMessage { conversation_id, content, file_url } => {
                let Some(user_id) = self.require_auth() else { return };
                let messages = self.messages.clone();
                self.run(ctx, "send message", async move {
                    messages
                        .send_to_conversation(user_id, conversation_id, Some(content), file_url)
                        .await
                        .map(|_| ())
                });
            }

            ClientMessage::JoinConversation { conversation_id } => {
                let Some(user_id) = self.require_auth() else { return };
                let conversations = self.conversations.clone();
                let hub = self.hub.clone();
                self.run(ctx, "join conversation", async move {
                    conversations.ensure_member(conversation_id, user_id).await?;
                    hub.do_send(JoinRoom { user_id, conversation_id });
                    Ok(())
                });
            }

            ClientMessage::LeaveConversation { conversation_id } => {
                let Some(user_id) = self.require_auth() else { return };
                self.hub.do_send(LeaveRoom { user_id, conversation_id });
            }

            ClientMessage::TypingStart { conversation_id } => {
                let Some(user_id) = self.require_auth() else { return };
                self.hub.do_send(BroadcastToRoom {
                    conversation_id,
                    event: ServerEvent::UserTyping { conversation_id, user_id },
                    skip_user_id: Some(user_id),
                });
            }

            ClientMessage::TypingStop { conversation_id } => {
                let Some(user_id) = self.require_auth() else { return };
                self.hub.do_send(BroadcastToRoom {
                    conversation_id,
                    event: ServerEvent::UserStoppedTyping { conversation_id, user_id },
                    skip_user_id: Some(user_id),
                });
            }

            ClientMessage::MarkRead { conversation_id } => {
                let Some(user_id) = self.require_auth() else { return };
                let conversations = self.conversations.clone();
                self.run(ctx, "mark read", async move {
                    conversations.mark_read(conversation_id, user_id).await.map(|_| ())
                });
            }

            ClientMessage::Ping => self.send_to_client(ServerEvent::Pong),
        }
    }

    fn handle_auth(&mut self, token: &str) {
        if self.user_id.is_some() {
            self.send_to_client(ServerEvent::error("Session is already authenticated"));
            return;
        }

        let claims = match Claims::decode_access(token, self.jwt_secret.as_bytes()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("JWT verification failed (session {}): {}", self.id, e);
                self.send_to_client(ServerEvent::AuthFailed {
                    reason: "Token invalid or expired".to_string(),
                });
                return;
            }
        };

        let user_id = claims.sub;
        self.user_id = Some(user_id);
        self.hub.do_send(Subscribe { id: self.id, user_id, tx: self.tx.clone() });
        self.send_to_client(ServerEvent::AuthSuccess { user_id });

        tracing::info!("User {} authenticated on session {}", user_id, self.id);
    }

    /// Runs a service call on the actor; failures go back to this client only.
    fn run<F>(&self, ctx: &mut Context<Self>, action: &'static str, fut: F)
    where
        F: Future<Output = Result<(), error::SystemError>> + 'static,
    {
        let tx = self.tx.clone();
        let session_id = self.id;

        ctx.spawn(
            async move {
                if let Err(e) = fut.await {
                    tracing::warn!("Session {} failed to {}: {}", session_id, action, e);
                    let message = error::Error::from(e).to_string();
                    let _ = tx.send(ServerEvent::error(message));
                }
            }
            .into_actor(self),
        );
    }
}

impl Actor for WebSocketSession {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session started: {}", self.id);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session stopped: {}", self.id);
        if self.user_id.is_some() {
            self.hub.do_send(Unsubscribe { id: self.id });
        }
    }
}

impl Message for ClientMessage {
    type Result = ();
}

impl Handler<ClientMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        self.handle_client_message(msg, ctx);
    }
}
