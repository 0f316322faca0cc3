use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Registered player as known by the player directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name chosen at registration.
    pub username: String,
    /// Registration timestamp.
    pub created_at: SystemTime,
}

/// Question stored in the question bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Stable identifier for the question.
    pub id: Uuid,
    /// Prompt shown to the players.
    pub text: String,
    /// Ordered answer choices.
    pub choices: Vec<String>,
    /// Canonical answer, compared with exact string equality.
    pub correct_answer: String,
    /// Insertion timestamp.
    pub created_at: SystemTime,
}

/// Marker for a player waiting for an opponent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntryEntity {
    /// Waiting player (at most one entry per player).
    pub player_id: Uuid,
    /// Enqueue time, used for FIFO pairing.
    pub enqueued_at: SystemTime,
}

/// Lifecycle status persisted with a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatusEntity {
    /// Players are still answering.
    InProgress,
    /// Both players finished and the winner has been computed.
    Completed,
}

/// Per-player slot of a persisted session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatEntity {
    /// Player occupying the seat.
    pub player_id: Uuid,
    /// Number of questions already delivered to the player.
    pub progress: u32,
    /// Number of delivered questions the player already answered.
    pub answered: u32,
    /// Number of correct answers.
    pub score: u32,
}

/// Aggregate session document persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Both players, in pairing order.
    pub seats: Vec<SeatEntity>,
    /// Questions drawn at creation; never modified afterwards.
    pub questions: Vec<QuestionEntity>,
    /// Current lifecycle status.
    pub status: SessionStatusEntity,
    /// Winner once completed; `None` on a tie or while in progress.
    pub winner_id: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Completion timestamp.
    pub completed_at: Option<SystemTime>,
    /// Optimistic concurrency version, bumped by every successful write.
    pub version: u64,
}
