use uuid::Uuid;

use crate::{
    api::error,
    modules::call::{
        model::InsertCall,
        schema::{CallEntity, CallStatus},
    },
};

#[async_trait::async_trait]
pub trait CallRepository {
    /// Creates a ringing call unless caller or callee already has a live one.
    /// Returns `None` when either party is busy.
    async fn create_if_idle(&self, call: &InsertCall)
        -> Result<Option<CallEntity>, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CallEntity>, error::SystemError>;

    /// Compare-and-set on the status column. Stamps `answered_at` on accept
    /// and `ended_at` on every terminal status. `None` when the call was no
    /// longer in `from`.
    async fn update_status(
        &self,
        id: &Uuid,
        from: CallStatus,
        to: CallStatus,
    ) -> Result<Option<CallEntity>, error::SystemError>;
}
