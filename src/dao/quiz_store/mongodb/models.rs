use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    PlayerEntity, QueueEntryEntity, QuestionEntity, SeatEntity, SessionEntity,
    SessionStatusEntity,
};

pub const PLAYER_COLLECTION_NAME: &str = "players";
pub const QUESTION_COLLECTION_NAME: &str = "questions";
pub const QUEUE_COLLECTION_NAME: &str = "player_queue";
pub const SESSION_COLLECTION_NAME: &str = "game_sessions";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: String,
    username: String,
    created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    id: String,
    text: String,
    choices: Vec<String>,
    correct_answer: String,
    created_at: DateTime,
}

/// Queue entries are keyed by player so the primary key enforces one entry per player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQueueDocument {
    #[serde(rename = "_id")]
    player_id: String,
    enqueued_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSeatDocument {
    player_id: String,
    progress: u32,
    answered: u32,
    score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: String,
    seats: Vec<MongoSeatDocument>,
    questions: Vec<MongoQuestionDocument>,
    status: SessionStatusEntity,
    winner_id: Option<String>,
    created_at: DateTime,
    completed_at: Option<DateTime>,
    version: i64,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id.to_string(),
            username: value.username,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoPlayerDocument> for PlayerEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPlayerDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(PLAYER_COLLECTION_NAME, &value.id, &value.id)?,
            username: value.username,
            created_at: value.created_at.to_system_time(),
        })
    }
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            text: value.text,
            choices: value.choices,
            correct_answer: value.correct_answer,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoQuestionDocument> for QuestionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoQuestionDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(QUESTION_COLLECTION_NAME, &value.id, &value.id)?,
            text: value.text,
            choices: value.choices,
            correct_answer: value.correct_answer,
            created_at: value.created_at.to_system_time(),
        })
    }
}

impl From<QueueEntryEntity> for MongoQueueDocument {
    fn from(value: QueueEntryEntity) -> Self {
        Self {
            player_id: value.player_id.to_string(),
            enqueued_at: DateTime::from_system_time(value.enqueued_at),
        }
    }
}

impl TryFrom<MongoQueueDocument> for QueueEntryEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoQueueDocument) -> MongoResult<Self> {
        Ok(Self {
            player_id: parse_id(QUEUE_COLLECTION_NAME, &value.player_id, &value.player_id)?,
            enqueued_at: value.enqueued_at.to_system_time(),
        })
    }
}

impl MongoSessionDocument {
    /// Copy of the document stamped with a new version, used for compare-and-swap writes.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version as i64;
        self
    }
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            seats: value
                .seats
                .into_iter()
                .map(|seat| MongoSeatDocument {
                    player_id: seat.player_id.to_string(),
                    progress: seat.progress,
                    answered: seat.answered,
                    score: seat.score,
                })
                .collect(),
            questions: value.questions.into_iter().map(Into::into).collect(),
            status: value.status,
            winner_id: value.winner_id.map(|id| id.to_string()),
            created_at: DateTime::from_system_time(value.created_at),
            completed_at: value.completed_at.map(DateTime::from_system_time),
            version: value.version as i64,
        }
    }
}

impl TryFrom<MongoSessionDocument> for SessionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSessionDocument) -> MongoResult<Self> {
        let doc_id = value.id.clone();
        let seats = value
            .seats
            .into_iter()
            .map(|seat| {
                Ok(SeatEntity {
                    player_id: parse_id(SESSION_COLLECTION_NAME, &doc_id, &seat.player_id)?,
                    progress: seat.progress,
                    answered: seat.answered,
                    score: seat.score,
                })
            })
            .collect::<MongoResult<Vec<_>>>()?;
        let questions = value
            .questions
            .into_iter()
            .map(QuestionEntity::try_from)
            .collect::<MongoResult<Vec<_>>>()?;
        let winner_id = value
            .winner_id
            .as_deref()
            .map(|raw| parse_id(SESSION_COLLECTION_NAME, &doc_id, raw))
            .transpose()?;
        let version = u64::try_from(value.version).map_err(|_| MongoDaoError::CorruptDocument {
            collection: SESSION_COLLECTION_NAME,
            id: doc_id.clone(),
            reason: format!("negative version {}", value.version),
        })?;

        Ok(Self {
            id: parse_id(SESSION_COLLECTION_NAME, &doc_id, &value.id)?,
            seats,
            questions,
            status: value.status,
            winner_id,
            created_at: value.created_at.to_system_time(),
            completed_at: value.completed_at.map(|at| at.to_system_time()),
            version,
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

fn parse_id(collection: &'static str, doc_id: &str, raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::CorruptDocument {
        collection,
        id: doc_id.to_owned(),
        reason: format!("invalid identifier `{raw}`: {err}"),
    })
}
