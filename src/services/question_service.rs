use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::QuestionEntity,
    dto::question::{InsertQuestionRequest, QuestionSummary},
    error::ServiceError,
    state::SharedState,
};

/// Validate and store a question in the bank.
pub async fn insert_question(
    state: &SharedState,
    request: InsertQuestionRequest,
) -> Result<QuestionSummary, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;

    let question = QuestionEntity {
        id: Uuid::new_v4(),
        text: request.text,
        choices: request.choices,
        correct_answer: request.correct_answer,
        created_at: SystemTime::now(),
    };
    store.insert_question(question.clone()).await?;
    info!(question_id = %question.id, choices = question.choices.len(), "question inserted");

    Ok(question.into())
}
