use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::player::{PlayerSummary, RegisterPlayerRequest},
    error::{AppError, ErrorBody},
    routes::extract::ApiJson,
    services::player_service,
    state::SharedState,
};

/// Routes managing the player directory.
pub fn router() -> Router<SharedState> {
    Router::new().route("/players", post(register_player))
}

/// Register a player and return its identifier.
#[utoipa::path(
    post,
    path = "/players",
    tag = "players",
    request_body = RegisterPlayerRequest,
    responses(
        (status = 201, description = "Player registered", body = PlayerSummary),
        (status = 400, description = "Invalid username", body = ErrorBody)
    )
)]
pub async fn register_player(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<RegisterPlayerRequest>,
) -> Result<(StatusCode, Json<PlayerSummary>), AppError> {
    let summary = player_service::register_player(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}
