use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::user::{
    model::UserResponse,
    repository::{UserCache, UserRepository},
};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    cache: Arc<dyn UserCache + Send + Sync>,
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<dyn UserCache + Send + Sync>,
    ) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, cache }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        match self.cache.get(&id).await {
            // Cached profiles outlive soft deletes, so liveness is checked on every hit.
            Ok(Some(cached_user)) => {
                if self.repo.exists(&id).await? {
                    return Ok(cached_user);
                }
                self.invalidate(&id).await;
                return Err(error::SystemError::not_found("User not found"));
            }
            Ok(None) => {}
            // A cache outage degrades to a database read.
            Err(e) => log::warn!("User cache read failed for {id}: {e}"),
        }

        let entity = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let user = UserResponse::from(entity);
        if let Err(e) = self.cache.set(&user).await {
            log::warn!("User cache write failed for {id}: {e}");
        }
        Ok(user)
    }

    pub async fn search(
        &self,
        query: &str,
        limit: Option<i64>,
    ) -> Result<Vec<UserResponse>, error::SystemError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(error::SystemError::bad_request("Search query cannot be empty"));
        }

        let limit = limit.unwrap_or(20).clamp(1, 50);
        let users = self.repo.search_users(query, limit).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Persists the online flag; going offline also stamps `last_seen_at`.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), error::SystemError> {
        self.repo.set_active(&id, is_active).await?;
        self.invalidate(&id).await;
        Ok(())
    }

    async fn invalidate(&self, id: &Uuid) {
        if let Err(e) = self.cache.invalidate(id).await {
            log::warn!("User cache invalidation failed for {id}: {e}");
        }
    }
}
