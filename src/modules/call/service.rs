use actix::Addr;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::call::{
    model::{CallResponse, InsertCall},
    repository::CallRepository,
    schema::{CallEntity, CallKind, CallStatus},
};
use crate::modules::notification::{
    model::NewNotification, schema::NotificationKind, service::NotificationService,
};
use crate::modules::realtime::{events::Publish, hub::RealtimeHub, message::ServerEvent};
use crate::modules::user::repository::UserRepository;

#[derive(Clone)]
pub struct CallService {
    call_repo: Arc<dyn CallRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    notifications: NotificationService,
    hub: Addr<RealtimeHub>,
}

impl CallService {
    pub fn with_dependencies(
        call_repo: Arc<dyn CallRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        notifications: NotificationService,
        hub: Addr<RealtimeHub>,
    ) -> Self {
        CallService { call_repo, user_repo, notifications, hub }
    }

    pub async fn start(
        &self,
        caller_id: Uuid,
        callee_id: Uuid,
        kind: CallKind,
        conversation_id: Option<Uuid>,
    ) -> Result<CallResponse, error::SystemError> {
        if caller_id == callee_id {
            return Err(error::SystemError::bad_request("Cannot call yourself"));
        }

        if !self.user_repo.exists(&callee_id).await? {
            return Err(error::SystemError::not_found("User not found"));
        }

        let call = self
            .call_repo
            .create_if_idle(&InsertCall { caller_id, callee_id, conversation_id, kind })
            .await?
            .ok_or_else(|| error::SystemError::conflict("User is busy in another call"))?;

        let call = CallResponse::from(call);
        self.hub.do_send(Publish::to_user(callee_id, ServerEvent::CallIncoming { call: call.clone() }));

        log::info!("Call {} started by {caller_id} to {callee_id}", call.id);
        Ok(call)
    }

    pub async fn accept(&self, call_id: Uuid, user_id: Uuid) -> Result<CallResponse, error::SystemError> {
        let call = self.find_for_party(call_id, user_id).await?;
        if call.callee_id != user_id {
            return Err(error::SystemError::forbidden("Only the callee can accept a call"));
        }
        self.transition(call, CallStatus::Accepted).await
    }

    pub async fn reject(&self, call_id: Uuid, user_id: Uuid) -> Result<CallResponse, error::SystemError> {
        let call = self.find_for_party(call_id, user_id).await?;
        if call.callee_id != user_id {
            return Err(error::SystemError::forbidden("Only the callee can reject a call"));
        }
        self.transition(call, CallStatus::Rejected).await
    }

    /// Hanging up a ringing call makes it missed and notifies the callee.
    pub async fn end(&self, call_id: Uuid, user_id: Uuid) -> Result<CallResponse, error::SystemError> {
        let call = self.find_for_party(call_id, user_id).await?;

        let next = match call.status {
            CallStatus::Ringing => CallStatus::Missed,
            _ => CallStatus::Ended,
        };
        let ended = self.transition(call, next).await?;

        if ended.status == CallStatus::Missed {
            let missed = NewNotification::new(ended.callee_id, NotificationKind::MissedCall)
                .actor(ended.caller_id)
                .call(ended.id)
                .body("Missed call");
            if let Err(e) = self.notifications.notify(missed).await {
                log::warn!("Failed to record missed call {}: {e}", ended.id);
            }
        }

        Ok(ended)
    }

    /// Relays an SDP/ICE payload to the other party. Nothing is stored.
    pub async fn signal(
        &self,
        call_id: Uuid,
        user_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<(), error::SystemError> {
        let call = self.find_for_party(call_id, user_id).await?;
        if !call.status.is_live() {
            return Err(error::SystemError::conflict("Call is no longer active"));
        }

        self.hub.do_send(Publish::to_user(
            call.other_party(&user_id),
            ServerEvent::CallSignal { call_id, from_user_id: user_id, payload },
        ));
        Ok(())
    }

    pub async fn get(&self, call_id: Uuid, user_id: Uuid) -> Result<CallResponse, error::SystemError> {
        self.find_for_party(call_id, user_id).await.map(CallResponse::from)
    }

    async fn find_for_party(&self, call_id: Uuid, user_id: Uuid) -> Result<CallEntity, error::SystemError> {
        let call = self
            .call_repo
            .find_by_id(&call_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Call not found"))?;

        if !call.involves(&user_id) {
            return Err(error::SystemError::forbidden("You are not part of this call"));
        }
        Ok(call)
    }

    async fn transition(
        &self,
        call: CallEntity,
        next: CallStatus,
    ) -> Result<CallResponse, error::SystemError> {
        if !call.status.can_transition_to(next) {
            return Err(error::SystemError::conflict(format!(
                "Call cannot move from {:?} to {:?}",
                call.status, next
            )));
        }

        let updated = self
            .call_repo
            .update_status(&call.id, call.status, next)
            .await?
            .ok_or_else(|| error::SystemError::conflict("Call state changed concurrently"))?;

        let updated = CallResponse::from(updated);
        self.hub.do_send(Publish::to(
            vec![updated.caller_id, updated.callee_id],
            ServerEvent::CallUpdated { call: updated.clone() },
        ));
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::realtime::events::GetOnlineUsers;
    use crate::test::{drain, subscribe, TestApp};

    #[actix_web::test]
    async fn test_start_rings_callee() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let bob = app.store.add_user("bob");
        let mut bob_rx = subscribe(&app.hub, bob);

        let call = app.calls.start(alice, bob, CallKind::Video, None).await.unwrap();
        app.hub.send(GetOnlineUsers).await.unwrap();

        assert_eq!(call.status, CallStatus::Ringing);
        assert!(matches!(
            &drain(&mut bob_rx)[..],
            [ServerEvent::CallIncoming { call: incoming }] if incoming.id == call.id
        ));
    }

    #[actix_web::test]
    async fn test_start_validation() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");

        assert!(matches!(
            app.calls.start(alice, alice, CallKind::Audio, None).await,
            Err(error::SystemError::BadRequest(_))
        ));
        assert!(matches!(
            app.calls.start(alice, Uuid::now_v7(), CallKind::Audio, None).await,
            Err(error::SystemError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn test_busy_user_is_conflict() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let bob = app.store.add_user("bob");
        let carol = app.store.add_user("carol");

        let call = app.calls.start(alice, bob, CallKind::Audio, None).await.unwrap();

        assert!(matches!(
            app.calls.start(carol, bob, CallKind::Audio, None).await,
            Err(error::SystemError::StateConflict(_))
        ));
        assert!(matches!(
            app.calls.start(alice, carol, CallKind::Audio, None).await,
            Err(error::SystemError::StateConflict(_))
        ));

        app.calls.reject(call.id, bob).await.unwrap();
        assert!(app.calls.start(carol, bob, CallKind::Audio, None).await.is_ok());
    }

    #[actix_web::test]
    async fn test_accept_then_end() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let bob = app.store.add_user("bob");
        let call = app.calls.start(alice, bob, CallKind::Audio, None).await.unwrap();
        let mut alice_rx = subscribe(&app.hub, alice);

        assert!(matches!(
            app.calls.accept(call.id, alice).await,
            Err(error::SystemError::Forbidden(_))
        ));

        let accepted = app.calls.accept(call.id, bob).await.unwrap();
        assert_eq!(accepted.status, CallStatus::Accepted);
        assert!(accepted.answered_at.is_some());

        assert!(matches!(
            app.calls.reject(call.id, bob).await,
            Err(error::SystemError::StateConflict(_))
        ));

        let ended = app.calls.end(call.id, alice).await.unwrap();
        assert_eq!(ended.status, CallStatus::Ended);
        assert!(ended.ended_at.is_some());

        app.hub.send(GetOnlineUsers).await.unwrap();
        let statuses: Vec<CallStatus> = drain(&mut alice_rx)
            .into_iter()
            .filter_map(|e| match e {
                ServerEvent::CallUpdated { call } => Some(call.status),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![CallStatus::Accepted, CallStatus::Ended]);

        assert!(matches!(
            app.calls.end(call.id, alice).await,
            Err(error::SystemError::StateConflict(_))
        ));
    }

    #[actix_web::test]
    async fn test_ending_ringing_call_is_missed() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let bob = app.store.add_user("bob");
        let call = app.calls.start(alice, bob, CallKind::Audio, None).await.unwrap();

        let missed = app.calls.end(call.id, alice).await.unwrap();

        assert_eq!(missed.status, CallStatus::Missed);
        let notifications = app.notifications.list(bob, None, false).await.unwrap();
        assert!(notifications
            .iter()
            .any(|n| n.kind == NotificationKind::MissedCall && n.call_id == Some(call.id)));
    }

    #[actix_web::test]
    async fn test_signal_relays_to_other_party() {
        let app = TestApp::new();
        let alice = app.store.add_user("alice");
        let bob = app.store.add_user("bob");
        let mallory = app.store.add_user("mallory");
        let call = app.calls.start(alice, bob, CallKind::Video, None).await.unwrap();
        let mut bob_rx = subscribe(&app.hub, bob);

        let offer = serde_json::json!({ "type": "offer", "sdp": "v=0" });
        app.calls.signal(call.id, alice, offer.clone()).await.unwrap();
        app.hub.send(GetOnlineUsers).await.unwrap();

        assert!(matches!(
            &drain(&mut bob_rx)[..],
            [ServerEvent::CallSignal { from_user_id, payload, .. }]
                if *from_user_id == alice && *payload == offer
        ));

        assert!(matches!(
            app.calls.signal(call.id, mallory, offer.clone()).await,
            Err(error::SystemError::Forbidden(_))
        ));

        app.calls.reject(call.id, bob).await.unwrap();
        assert!(matches!(
            app.calls.signal(call.id, alice, offer).await,
            Err(error::SystemError::StateConflict(_))
        ));
    }
}
