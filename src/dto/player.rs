use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::PlayerEntity,
    dto::{format_system_time, validation::validate_username},
};

/// Payload used to register a player in the directory.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterPlayerRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
}

/// Registered player as returned to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub username: String,
    pub created_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            username: value.username,
            created_at: format_system_time(value.created_at),
        }
    }
}
