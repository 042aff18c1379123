use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{model::UserResponse, schema::UserEntity},
};

#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;

    async fn exists(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Returns the live (non-deleted) users among `ids`, in no particular order.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError>;

    /// Search users by username or display name (case-insensitive, partial match)
    async fn search_users(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError>;

    async fn set_active(&self, id: &Uuid, is_active: bool) -> Result<(), error::SystemError>;
}

/// Read-through cache of user profiles keyed by id.
#[async_trait::async_trait]
pub trait UserCache {
    async fn get(&self, id: &Uuid) -> Result<Option<UserResponse>, error::SystemError>;

    async fn set(&self, user: &UserResponse) -> Result<(), error::SystemError>;

    async fn invalidate(&self, id: &Uuid) -> Result<(), error::SystemError>;
}
