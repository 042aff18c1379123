use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::user::schema::{UserEntity, UserRole};

#[derive(Deserialize, Validate)]
pub struct SearchUsersQuery {
    #[validate(length(min = 1, max = 64, message = "Query must be 1 to 64 characters long"))]
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Deserialize, Validate)]
pub struct PresenceQuery {
    #[validate(length(min = 1, max = 200, message = "Between 1 and 200 user ids are required"))]
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Serialize, async_graphql::SimpleObject)]
#[graphql(name = "User")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        UserResponse {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            display_name: entity.display_name,
            avatar_url: entity.avatar_url,
            role: entity.role,
            is_active: entity.is_active,
            last_seen_at: entity.last_seen_at,
        }
    }
}
