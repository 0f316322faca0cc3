use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::PlayerEntity,
    dto::player::{PlayerSummary, RegisterPlayerRequest},
    error::ServiceError,
    state::SharedState,
};

/// Add a player to the directory under a fresh identifier.
pub async fn register_player(
    state: &SharedState,
    request: RegisterPlayerRequest,
) -> Result<PlayerSummary, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;

    let player = PlayerEntity {
        id: Uuid::new_v4(),
        username: request.username.trim().to_owned(),
        created_at: SystemTime::now(),
    };
    store.save_player(player.clone()).await?;
    info!(player_id = %player.id, username = %player.username, "player registered");

    Ok(player.into())
}
