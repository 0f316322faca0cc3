use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::session::SessionError};

/// Machine-checkable error codes shared by HTTP bodies and WebSocket `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The player id does not resolve to a registered player.
    PlayerNotFound,
    /// No session exists with the given id.
    SessionNotFound,
    /// The session is already completed.
    SessionAlreadyCompleted,
    /// The answered question is not the one awaiting an answer.
    StaleOrInvalidQuestion,
    /// The player is not one of the two session members.
    NotASessionMember,
    /// Storage failed or the service is degraded; the request may be retried.
    StorageUnavailable,
    /// Request payload failed validation.
    InvalidInput,
    /// The question bank cannot fill a session.
    NotEnoughQuestions,
    /// A WebSocket frame claimed a different player than the one that joined.
    PlayerMismatch,
    /// A WebSocket frame could not be decoded.
    InvalidMessage,
    /// Unexpected server-side failure.
    Internal,
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requesting player is unknown to the player directory.
    #[error("player `{0}` not found")]
    PlayerNotFound(Uuid),
    /// The addressed session does not exist.
    #[error("session `{0}` not found")]
    SessionNotFound(Uuid),
    /// The session is terminal.
    #[error("session `{0}` is already completed")]
    SessionAlreadyCompleted(Uuid),
    /// Answer for a question that is not awaiting an answer.
    #[error("question `{question_id}` is not the last delivered question")]
    StaleOrInvalidQuestion {
        /// Question the client answered.
        question_id: Uuid,
    },
    /// The player is not seated in the session.
    #[error("player `{player_id}` is not a member of session `{session_id}`")]
    NotASessionMember {
        /// Addressed session.
        session_id: Uuid,
        /// Offending player.
        player_id: Uuid,
    },
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The question bank holds fewer questions than a session needs.
    #[error("question bank holds {available} questions, {required} required")]
    NotEnoughQuestions {
        /// Questions available in the bank.
        available: usize,
        /// Questions needed for a session.
        required: usize,
    },
    /// Persisted data violates a domain invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Code reported to clients.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::PlayerNotFound(_) => ErrorCode::PlayerNotFound,
            ServiceError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            ServiceError::SessionAlreadyCompleted(_) => ErrorCode::SessionAlreadyCompleted,
            ServiceError::StaleOrInvalidQuestion { .. } => ErrorCode::StaleOrInvalidQuestion,
            ServiceError::NotASessionMember { .. } => ErrorCode::NotASessionMember,
            ServiceError::Unavailable(_) | ServiceError::Degraded => ErrorCode::StorageUnavailable,
            ServiceError::InvalidInput(_) => ErrorCode::InvalidInput,
            ServiceError::NotEnoughQuestions { .. } => ErrorCode::NotEnoughQuestions,
            ServiceError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Unavailable(_) | ServiceError::Degraded)
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotAMember {
                session_id,
                player_id,
            } => ServiceError::NotASessionMember {
                session_id,
                player_id,
            },
            SessionError::AlreadyCompleted(id) => ServiceError::SessionAlreadyCompleted(id),
            SessionError::StaleQuestion { question_id } => {
                ServiceError::StaleOrInvalidQuestion { question_id }
            }
            SessionError::DuplicatePlayer => {
                ServiceError::InvalidInput("a player cannot be matched with themselves".into())
            }
            other @ (SessionError::QuestionCount { .. } | SessionError::CorruptRecord { .. }) => {
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {1}")]
    BadRequest(ErrorCode, String),
    /// The caller is not allowed to act on the resource.
    #[error("forbidden: {1}")]
    Forbidden(ErrorCode, String),
    /// Requested resource not found.
    #[error("not found: {1}")]
    NotFound(ErrorCode, String),
    /// Conflict with current state.
    #[error("conflict: {1}")]
    Conflict(ErrorCode, String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {1}")]
    ServiceUnavailable(ErrorCode, String),
    /// Internal server error.
    #[error("internal error: {1}")]
    Internal(ErrorCode, String),
}

impl AppError {
    fn code(&self) -> ErrorCode {
        match self {
            AppError::BadRequest(code, _)
            | AppError::Forbidden(code, _)
            | AppError::NotFound(code, _)
            | AppError::Conflict(code, _)
            | AppError::ServiceUnavailable(code, _)
            | AppError::Internal(code, _) => *code,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(..) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(..) => StatusCode::FORBIDDEN,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(..) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(..) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            ServiceError::PlayerNotFound(_) | ServiceError::SessionNotFound(_) => {
                AppError::NotFound(code, message)
            }
            ServiceError::NotASessionMember { .. } => AppError::Forbidden(code, message),
            ServiceError::SessionAlreadyCompleted(_)
            | ServiceError::StaleOrInvalidQuestion { .. }
            | ServiceError::NotEnoughQuestions { .. } => AppError::Conflict(code, message),
            ServiceError::InvalidInput(_) => AppError::BadRequest(code, message),
            ServiceError::Unavailable(_) | ServiceError::Degraded => {
                AppError::ServiceUnavailable(code, message)
            }
            ServiceError::Internal(_) => AppError::Internal(code, message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(ErrorCode::InvalidInput, rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(ErrorCode::InvalidInput, rejection.body_text())
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable description.
    pub message: String,
    /// Machine-checkable code.
    pub code: ErrorCode,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            code: self.code(),
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn storage_failure() -> StorageError {
        StorageError::unavailable(
            "connection reset".into(),
            io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        )
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(ServiceError::from(storage_failure()).is_retryable());
        assert!(ServiceError::Degraded.is_retryable());
        assert!(!ServiceError::SessionAlreadyCompleted(Uuid::new_v4()).is_retryable());
        assert!(
            !ServiceError::StaleOrInvalidQuestion {
                question_id: Uuid::new_v4()
            }
            .is_retryable()
        );
    }

    #[test]
    fn session_errors_map_to_core_taxonomy() {
        let session_id = Uuid::new_v4();
        let player_id = Uuid::new_v4();

        let err = ServiceError::from(SessionError::NotAMember {
            session_id,
            player_id,
        });
        assert_eq!(err.code(), ErrorCode::NotASessionMember);

        let err = ServiceError::from(SessionError::AlreadyCompleted(session_id));
        assert_eq!(err.code(), ErrorCode::SessionAlreadyCompleted);

        let err = ServiceError::from(SessionError::StaleQuestion {
            question_id: Uuid::new_v4(),
        });
        assert_eq!(err.code(), ErrorCode::StaleOrInvalidQuestion);
    }

    #[test]
    fn http_statuses_follow_error_kind() {
        let cases = [
            (ServiceError::PlayerNotFound(Uuid::new_v4()), StatusCode::NOT_FOUND),
            (ServiceError::SessionNotFound(Uuid::new_v4()), StatusCode::NOT_FOUND),
            (
                ServiceError::NotASessionMember {
                    session_id: Uuid::new_v4(),
                    player_id: Uuid::new_v4(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                ServiceError::SessionAlreadyCompleted(Uuid::new_v4()),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::NotEnoughQuestions {
                    available: 1,
                    required: 4,
                },
                StatusCode::CONFLICT,
            ),
            (ServiceError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Degraded, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn codes_serialize_as_snake_case() {
        let value = serde_json::to_value(ErrorCode::StaleOrInvalidQuestion).unwrap();
        assert_eq!(value, "stale_or_invalid_question");
        let value = serde_json::to_value(ErrorCode::PlayerMismatch).unwrap();
        assert_eq!(value, "player_mismatch");
    }
}
