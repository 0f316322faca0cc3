use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    dao::models::QuestionEntity,
    dto::{format_system_time, validation::{validate_choices, validate_question_text}},
};

/// Question submitted to the question bank.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_correct_answer"))]
pub struct InsertQuestionRequest {
    #[validate(custom(function = "validate_question_text"))]
    pub text: String,
    #[validate(
        length(min = 2, max = 8, message = "A question needs between 2 and 8 choices"),
        custom(function = "validate_choices")
    )]
    pub choices: Vec<String>,
    /// Must match one of `choices` exactly.
    pub correct_answer: String,
}

fn validate_correct_answer(request: &InsertQuestionRequest) -> Result<(), ValidationError> {
    if request.choices.contains(&request.correct_answer) {
        return Ok(());
    }

    let mut err = ValidationError::new("correct_answer_not_a_choice");
    err.message = Some("The correct answer must be one of the choices".into());
    Err(err)
}

/// Stored question as returned to clients; the correct answer is never echoed back.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionSummary {
    pub id: Uuid,
    pub text: String,
    pub choices: Vec<String>,
    pub created_at: String,
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            choices: value.choices,
            created_at: format_system_time(value.created_at),
        }
    }
}
