//! Pure two-player session state machine.
//!
//! A session moves `InProgress -> Completed` exactly once. Each seat tracks how many questions were
//! delivered (`progress`), how many of those were answered, and how many answers were correct;
//! the three counters only grow and satisfy `score <= answered <= progress <= questions.len()`.

use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{QuestionEntity, SeatEntity, SessionEntity, SessionStatusEntity};

/// Number of questions drawn for every session.
pub const QUESTIONS_PER_SESSION: usize = 4;

/// Question bound into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Identifier from the question bank.
    pub id: Uuid,
    /// Prompt shown to the players.
    pub text: String,
    /// Ordered answer choices.
    pub choices: Vec<String>,
    /// Canonical answer; never sent to players.
    pub correct_answer: String,
    created_at: SystemTime,
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Players are still answering.
    InProgress,
    /// Terminal: scores are frozen and the winner is known.
    Completed,
}

/// Per-player progress inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    /// Player occupying the seat.
    pub player_id: Uuid,
    /// Questions already delivered.
    pub progress: usize,
    /// Delivered questions already answered.
    pub answered: usize,
    /// Correct answers.
    pub score: usize,
}

impl Seat {
    fn new(player_id: Uuid) -> Self {
        Self {
            player_id,
            progress: 0,
            answered: 0,
            score: 0,
        }
    }
}

/// Final score of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerScore {
    /// Player the score belongs to.
    pub player_id: Uuid,
    /// Number of correct answers.
    pub score: usize,
}

/// Score comparison computed once both players are done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    /// Scores in seat order.
    pub scores: [PlayerScore; 2],
    /// Player with the strictly higher score, `None` on a tie.
    pub winner_id: Option<Uuid>,
}

impl Scoreboard {
    /// Whether both players finished with the same score.
    pub fn is_tie(&self) -> bool {
        self.winner_id.is_none()
    }

    /// Players of the session, in seat order.
    pub fn players(&self) -> [Uuid; 2] {
        [self.scores[0].player_id, self.scores[1].player_id]
    }
}

/// Result of asking for the next question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The question now marked as delivered.
    Question(Question),
    /// Every question was already delivered to this player.
    Exhausted,
}

/// Result of a completion check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// At least one player still has undelivered questions.
    Pending,
    /// This check moved the session to `Completed`.
    Finished(Scoreboard),
    /// The session had already been completed earlier; nothing changed.
    AlreadyFinished(Scoreboard),
}

/// Rule violations detected by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The player does not hold a seat in the session.
    #[error("player `{player_id}` is not a member of session `{session_id}`")]
    NotAMember {
        /// Session that was addressed.
        session_id: Uuid,
        /// Player that is not seated.
        player_id: Uuid,
    },
    /// The session is terminal.
    #[error("session `{0}` is already completed")]
    AlreadyCompleted(Uuid),
    /// The answer does not target the pending, last-delivered question.
    #[error("question `{question_id}` is not awaiting an answer")]
    StaleQuestion {
        /// Question the client answered.
        question_id: Uuid,
    },
    /// Both seats would belong to the same player.
    #[error("a session needs two distinct players")]
    DuplicatePlayer,
    /// Wrong number of questions bound to the session.
    #[error("a session needs exactly {expected} questions, got {got}")]
    QuestionCount {
        /// Required question count.
        expected: usize,
        /// Provided question count.
        got: usize,
    },
    /// A persisted record violates the session invariants.
    #[error("session `{session_id}` record is inconsistent: {reason}")]
    CorruptRecord {
        /// Offending session.
        session_id: Uuid,
        /// Which invariant was broken.
        reason: String,
    },
}

/// Two-player trivia session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelSession {
    id: Uuid,
    seats: [Seat; 2],
    questions: Vec<Question>,
    status: SessionStatus,
    winner_id: Option<Uuid>,
    created_at: SystemTime,
    completed_at: Option<SystemTime>,
    version: u64,
}

impl DuelSession {
    /// Start a session between two distinct players over exactly [`QUESTIONS_PER_SESSION`]
    /// questions.
    pub fn new(players: (Uuid, Uuid), questions: Vec<Question>) -> Result<Self, SessionError> {
        if players.0 == players.1 {
            return Err(SessionError::DuplicatePlayer);
        }
        if questions.len() != QUESTIONS_PER_SESSION {
            return Err(SessionError::QuestionCount {
                expected: QUESTIONS_PER_SESSION,
                got: questions.len(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            seats: [Seat::new(players.0), Seat::new(players.1)],
            questions,
            status: SessionStatus::InProgress,
            winner_id: None,
            created_at: SystemTime::now(),
            completed_at: None,
            version: 0,
        })
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Winner once completed; `None` while in progress or on a tie.
    pub fn winner_id(&self) -> Option<Uuid> {
        self.winner_id
    }

    /// Both seats in pairing order.
    pub fn seats(&self) -> &[Seat; 2] {
        &self.seats
    }

    /// Both players in pairing order.
    pub fn players(&self) -> [Uuid; 2] {
        [self.seats[0].player_id, self.seats[1].player_id]
    }

    /// Questions bound at creation, in delivery order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Completion timestamp.
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }

    /// Version the session was loaded with.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Seat of `player_id`, if seated.
    pub fn seat(&self, player_id: Uuid) -> Option<&Seat> {
        self.seats.iter().find(|seat| seat.player_id == player_id)
    }

    /// The other player of the session.
    pub fn opponent_of(&self, player_id: Uuid) -> Option<Uuid> {
        self.seat(player_id)?;
        self.seats
            .iter()
            .map(|seat| seat.player_id)
            .find(|id| *id != player_id)
    }

    fn seat_mut(&mut self, player_id: Uuid) -> Result<&mut Seat, SessionError> {
        let session_id = self.id;
        self.seats
            .iter_mut()
            .find(|seat| seat.player_id == player_id)
            .ok_or(SessionError::NotAMember {
                session_id,
                player_id,
            })
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Completed => Err(SessionError::AlreadyCompleted(self.id)),
        }
    }

    /// Mark the next question as delivered to `player_id` and return it.
    ///
    /// Progress counts deliveries, not answers: a question that is delivered but never answered
    /// still consumes its slot.
    pub fn deliver_next(&mut self, player_id: Uuid) -> Result<Delivery, SessionError> {
        self.seat(player_id).ok_or(SessionError::NotAMember {
            session_id: self.id,
            player_id,
        })?;
        self.ensure_in_progress()?;

        let total = self.questions.len();
        let seat = self.seat_mut(player_id)?;
        if seat.progress >= total {
            return Ok(Delivery::Exhausted);
        }

        let index = seat.progress;
        seat.progress += 1;
        Ok(Delivery::Question(self.questions[index].clone()))
    }

    /// Grade an answer to the last question delivered to `player_id`.
    ///
    /// Answers are compared with exact, case-sensitive equality. Each delivered question can be
    /// answered once; later submissions for it are stale.
    pub fn record_answer(
        &mut self,
        player_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Result<bool, SessionError> {
        self.seat(player_id).ok_or(SessionError::NotAMember {
            session_id: self.id,
            player_id,
        })?;
        self.ensure_in_progress()?;

        let seat = self.seat(player_id).copied().ok_or(SessionError::NotAMember {
            session_id: self.id,
            player_id,
        })?;
        let pending = seat
            .progress
            .checked_sub(1)
            .filter(|_| seat.answered < seat.progress)
            .map(|index| &self.questions[index])
            .filter(|question| question.id == question_id)
            .ok_or(SessionError::StaleQuestion { question_id })?;

        let correct = pending.correct_answer == answer;
        let seat = self.seat_mut(player_id)?;
        seat.answered = seat.progress;
        if correct {
            seat.score += 1;
        }
        Ok(correct)
    }

    /// Complete the session once both players received every question.
    ///
    /// Idempotent: after completion the stored scoreboard is returned unchanged.
    pub fn try_complete(&mut self) -> Completion {
        if self.status == SessionStatus::Completed {
            return Completion::AlreadyFinished(self.scoreboard());
        }

        let total = self.questions.len();
        if self.seats.iter().any(|seat| seat.progress < total) {
            return Completion::Pending;
        }

        self.status = SessionStatus::Completed;
        self.winner_id = leader(&self.seats);
        self.completed_at = Some(SystemTime::now());
        Completion::Finished(self.scoreboard())
    }

    /// Current scores in seat order, with the winner once completed.
    pub fn scoreboard(&self) -> Scoreboard {
        Scoreboard {
            scores: self.seats.map(|seat| PlayerScore {
                player_id: seat.player_id,
                score: seat.score,
            }),
            winner_id: self.winner_id,
        }
    }
}

/// Player with the strictly greater score; equal scores have no leader.
fn leader(seats: &[Seat; 2]) -> Option<Uuid> {
    let [first, second] = seats;
    match first.score.cmp(&second.score) {
        std::cmp::Ordering::Greater => Some(first.player_id),
        std::cmp::Ordering::Less => Some(second.player_id),
        std::cmp::Ordering::Equal => None,
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            choices: value.choices,
            correct_answer: value.correct_answer,
            created_at: value.created_at,
        }
    }
}

impl From<Question> for QuestionEntity {
    fn from(value: Question) -> Self {
        Self {
            id: value.id,
            text: value.text,
            choices: value.choices,
            correct_answer: value.correct_answer,
            created_at: value.created_at,
        }
    }
}

impl From<DuelSession> for SessionEntity {
    fn from(session: DuelSession) -> Self {
        Self {
            id: session.id,
            seats: session
                .seats
                .iter()
                .map(|seat| SeatEntity {
                    player_id: seat.player_id,
                    progress: seat.progress as u32,
                    answered: seat.answered as u32,
                    score: seat.score as u32,
                })
                .collect(),
            questions: session.questions.into_iter().map(Into::into).collect(),
            status: match session.status {
                SessionStatus::InProgress => SessionStatusEntity::InProgress,
                SessionStatus::Completed => SessionStatusEntity::Completed,
            },
            winner_id: session.winner_id,
            created_at: session.created_at,
            completed_at: session.completed_at,
            version: session.version,
        }
    }
}

impl TryFrom<SessionEntity> for DuelSession {
    type Error = SessionError;

    fn try_from(entity: SessionEntity) -> Result<Self, Self::Error> {
        let session_id = entity.id;
        let corrupt = |reason: String| SessionError::CorruptRecord { session_id, reason };

        if entity.questions.len() != QUESTIONS_PER_SESSION {
            return Err(corrupt(format!(
                "expected {QUESTIONS_PER_SESSION} questions, found {}",
                entity.questions.len()
            )));
        }

        let total = entity.questions.len();
        let seats = entity
            .seats
            .iter()
            .map(|seat| {
                let seat = Seat {
                    player_id: seat.player_id,
                    progress: seat.progress as usize,
                    answered: seat.answered as usize,
                    score: seat.score as usize,
                };
                if seat.score > seat.answered
                    || seat.answered > seat.progress
                    || seat.progress > total
                {
                    Err(corrupt(format!(
                        "seat of `{}` has out of range counters",
                        seat.player_id
                    )))
                } else {
                    Ok(seat)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let seats: [Seat; 2] = seats
            .try_into()
            .map_err(|seats: Vec<Seat>| {
                corrupt(format!("expected 2 seats, found {}", seats.len()))
            })?;
        if seats[0].player_id == seats[1].player_id {
            return Err(corrupt("both seats hold the same player".into()));
        }

        let status = match entity.status {
            SessionStatusEntity::InProgress => SessionStatus::InProgress,
            SessionStatusEntity::Completed => SessionStatus::Completed,
        };
        if status == SessionStatus::InProgress && entity.winner_id.is_some() {
            return Err(corrupt("winner recorded on an unfinished session".into()));
        }

        Ok(Self {
            id: entity.id,
            seats,
            questions: entity.questions.into_iter().map(Into::into).collect(),
            status,
            winner_id: entity.winner_id,
            created_at: entity.created_at,
            completed_at: entity.completed_at,
            version: entity.version,
        })
    }
}
