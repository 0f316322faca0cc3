use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::game::{SessionSummary, StartGameRequest, StartGameResponse},
    error::{AppError, ErrorBody},
    routes::extract::{ApiJson, ApiPath},
    services::{
        matchmaking_service::{self, MatchOutcome},
        session_service,
    },
    state::SharedState,
};

/// Routes handling matchmaking and session inspection.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/game/start", post(start_game))
        .route("/sessions/{id}", get(get_session))
}

/// Pair the player with the oldest waiting player, or queue it.
#[utoipa::path(
    post,
    path = "/game/start",
    tag = "game",
    request_body = StartGameRequest,
    responses(
        (
            status = 201,
            description = "Matched; both players receive `session_started`",
            body = StartGameResponse
        ),
        (status = 200, description = "Queued until an opponent arrives", body = StartGameResponse),
        (status = 400, description = "Malformed request body", body = ErrorBody),
        (status = 404, description = "Unknown player", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<StartGameRequest>,
) -> Result<(StatusCode, Json<StartGameResponse>), AppError> {
    let outcome = matchmaking_service::request_match(&state, payload.player_id).await?;
    let status = match outcome {
        MatchOutcome::Matched { .. } => StatusCode::CREATED,
        MatchOutcome::Waiting { .. } => StatusCode::OK,
    };
    Ok((status, Json(StartGameResponse::from(&outcome))))
}

/// Inspect a session's progress and scores.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Session state", body = SessionSummary),
        (status = 400, description = "Malformed session id", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody)
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = session_service::get_session(&state, id).await?;
    Ok(Json(SessionSummary::from(&session)))
}
