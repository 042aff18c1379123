use uuid::Uuid;

use crate::{
    api::error,
    configs::RedisCache,
    constants::USER_CACHE_TTL,
    modules::user::{
        model::UserResponse,
        repository::{UserCache, UserRepository},
        schema::UserEntity,
    },
};

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn exists(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let users = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let search_pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let users = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT * FROM users
            WHERE deleted_at IS NULL
            AND (
                lower(username) LIKE lower($1)
                OR lower(display_name) LIKE lower($1)
            )
            ORDER BY display_name
            LIMIT $2
            "#,
        )
        .bind(&search_pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn set_active(&self, id: &Uuid, is_active: bool) -> Result<(), error::SystemError> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_active    = $2,
                last_seen_at = CASE WHEN $2 THEN last_seen_at ELSE NOW() END,
                updated_at   = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn cache_key(id: &Uuid) -> String {
    format!("user:{id}")
}

#[async_trait::async_trait]
impl UserCache for RedisCache {
    async fn get(&self, id: &Uuid) -> Result<Option<UserResponse>, error::SystemError> {
        RedisCache::get(self, &cache_key(id)).await
    }

    async fn set(&self, user: &UserResponse) -> Result<(), error::SystemError> {
        RedisCache::set(self, &cache_key(&user.id), user, USER_CACHE_TTL).await
    }

    async fn invalidate(&self, id: &Uuid) -> Result<(), error::SystemError> {
        self.delete(&cache_key(id)).await
    }
}
