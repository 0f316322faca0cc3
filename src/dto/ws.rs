use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::ErrorCode,
    state::session::{Question, Scoreboard},
};

#[derive(Debug, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
/// Messages accepted from player WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerInboundMessage {
    /// Must be the first frame of every connection.
    Join { player_id: Uuid },
    MatchRequest { player_id: Uuid },
    QuestionRequest { session_id: Uuid, player_id: Uuid },
    AnswerSubmit {
        session_id: Uuid,
        player_id: Uuid,
        question_id: Uuid,
        answer: String,
    },
    #[serde(other)]
    Unknown,
}

impl PlayerInboundMessage {
    /// Decode a text frame.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Player the frame claims to come from.
    pub fn player_id(&self) -> Option<Uuid> {
        match self {
            Self::Join { player_id }
            | Self::MatchRequest { player_id }
            | Self::QuestionRequest { player_id, .. }
            | Self::AnswerSubmit { player_id, .. } => Some(*player_id),
            Self::Unknown => None,
        }
    }
}

/// Question as shown to a player: no correct answer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct QuestionPayload {
    pub question_id: Uuid,
    pub text: String,
    pub choices: Vec<String>,
}

impl From<&Question> for QuestionPayload {
    fn from(value: &Question) -> Self {
        Self {
            question_id: value.id,
            text: value.text.clone(),
            choices: value.choices.clone(),
        }
    }
}

/// Final score of one player.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ScoreEntry {
    pub player_id: Uuid,
    pub score: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
/// Events pushed to player WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerOutboundMessage {
    SessionStarted {
        session_id: Uuid,
        opponent_id: Uuid,
        questions: Vec<QuestionPayload>,
    },
    Queued { enqueued_at: String },
    Question {
        session_id: Uuid,
        question_id: Uuid,
        text: String,
        choices: Vec<String>,
    },
    AnswerResult {
        session_id: Uuid,
        question_id: Uuid,
        correct: bool,
    },
    /// The player received every question; the opponent is still playing.
    WaitingForOpponent { session_id: Uuid },
    GameEnd {
        session_id: Uuid,
        scores: Vec<ScoreEntry>,
        winner_id: Option<Uuid>,
        is_tie: bool,
    },
    Error { message: String, code: ErrorCode },
}

impl PlayerOutboundMessage {
    /// Wire name of the event, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::Queued { .. } => "queued",
            Self::Question { .. } => "question",
            Self::AnswerResult { .. } => "answer_result",
            Self::WaitingForOpponent { .. } => "waiting_for_opponent",
            Self::GameEnd { .. } => "game_end",
            Self::Error { .. } => "error",
        }
    }

    /// `question` event delivering `payload`.
    pub fn question(session_id: Uuid, payload: QuestionPayload) -> Self {
        Self::Question {
            session_id,
            question_id: payload.question_id,
            text: payload.text,
            choices: payload.choices,
        }
    }

    /// `game_end` event for a completed session.
    pub fn game_end(session_id: Uuid, board: &Scoreboard) -> Self {
        Self::GameEnd {
            session_id,
            scores: board
                .scores
                .iter()
                .map(|entry| ScoreEntry {
                    player_id: entry.player_id,
                    score: entry.score,
                })
                .collect(),
            winner_id: board.winner_id,
            is_tie: board.is_tie(),
        }
    }
}
