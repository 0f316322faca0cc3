use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    services::matchmaking_service::MatchOutcome,
    state::session::{DuelSession, SessionStatus},
};

/// Matchmaking request sent by a player looking for an opponent.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartGameRequest {
    pub player_id: Uuid,
}

/// Result of a matchmaking request.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartGameResponse {
    /// An opponent was waiting; the session is ready.
    Matched { session_id: Uuid, opponent_id: Uuid },
    /// No opponent yet; the player waits in the queue.
    Queued { enqueued_at: String },
}

impl From<&MatchOutcome> for StartGameResponse {
    fn from(value: &MatchOutcome) -> Self {
        match value {
            MatchOutcome::Matched {
                session,
                opponent_id,
            } => Self::Matched {
                session_id: session.id(),
                opponent_id: *opponent_id,
            },
            MatchOutcome::Waiting { enqueued_at } => Self::Queued {
                enqueued_at: format_system_time(*enqueued_at),
            },
        }
    }
}

/// Session lifecycle status exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatusDto {
    InProgress,
    Completed,
}

impl From<SessionStatus> for SessionStatusDto {
    fn from(value: SessionStatus) -> Self {
        match value {
            SessionStatus::InProgress => Self::InProgress,
            SessionStatus::Completed => Self::Completed,
        }
    }
}

/// Read-only projection of a session; never includes the correct answers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub status: SessionStatusDto,
    /// Both players in pairing order.
    pub players: Vec<Uuid>,
    /// Questions delivered so far, keyed by player id.
    #[schema(value_type = Object)]
    pub progress: IndexMap<Uuid, usize>,
    /// Correct answers so far, keyed by player id.
    #[schema(value_type = Object)]
    pub scores: IndexMap<Uuid, usize>,
    pub question_count: usize,
    pub winner_id: Option<Uuid>,
    /// Only set once the session is completed.
    pub is_tie: Option<bool>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl From<&DuelSession> for SessionSummary {
    fn from(session: &DuelSession) -> Self {
        let completed = session.status() == SessionStatus::Completed;
        Self {
            id: session.id(),
            status: session.status().into(),
            players: session.players().to_vec(),
            progress: session
                .seats()
                .iter()
                .map(|seat| (seat.player_id, seat.progress))
                .collect(),
            scores: session
                .seats()
                .iter()
                .map(|seat| (seat.player_id, seat.score))
                .collect(),
            question_count: session.questions().len(),
            winner_id: session.winner_id(),
            is_tie: completed.then(|| session.winner_id().is_none()),
            created_at: format_system_time(session.created_at()),
            completed_at: session.completed_at().map(format_system_time),
        }
    }
}
