use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::question::{InsertQuestionRequest, QuestionSummary},
    error::{AppError, ErrorBody},
    routes::extract::ApiJson,
    services::question_service,
    state::SharedState,
};

/// Routes writing to the question bank.
pub fn router() -> Router<SharedState> {
    Router::new().route("/question/insert", post(insert_question))
}

/// Add a question to the bank.
#[utoipa::path(
    post,
    path = "/question/insert",
    tag = "questions",
    request_body = InsertQuestionRequest,
    responses(
        (status = 201, description = "Question stored", body = QuestionSummary),
        (status = 400, description = "Invalid question", body = ErrorBody)
    )
)]
pub async fn insert_question(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<InsertQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionSummary>), AppError> {
    let summary = question_service::insert_question(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}
