use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Duel Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::start_game,
        crate::routes::game::get_session,
        crate::routes::question::insert_question,
        crate::routes::player::register_player,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::StartGameRequest,
            crate::dto::game::StartGameResponse,
            crate::dto::game::SessionSummary,
            crate::dto::game::SessionStatusDto,
            crate::dto::question::InsertQuestionRequest,
            crate::dto::question::QuestionSummary,
            crate::dto::player::RegisterPlayerRequest,
            crate::dto::player::PlayerSummary,
            crate::dto::ws::PlayerInboundMessage,
            crate::dto::ws::PlayerOutboundMessage,
            crate::dto::ws::QuestionPayload,
            crate::dto::ws::ScoreEntry,
            crate::error::ErrorBody,
            crate::error::ErrorCode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Matchmaking and session inspection"),
        (name = "questions", description = "Question bank"),
        (name = "players", description = "Player directory"),
        (name = "players-ws", description = "WebSocket protocol for players"),
    )
)]
pub struct ApiDoc;
