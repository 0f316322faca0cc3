use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save player `{id}`")]
    SavePlayer {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load player `{id}`")]
    LoadPlayer {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save question `{id}`")]
    SaveQuestion {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to sample {size} question(s)")]
    SampleQuestions {
        size: usize,
        #[source]
        source: MongoError,
    },
    #[error("failed to count questions")]
    CountQuestions {
        #[source]
        source: MongoError,
    },
    #[error("failed to update queue entry of player `{player_id}`")]
    QueueEntry {
        player_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to claim a waiting queue entry")]
    ClaimQueueEntry {
        #[source]
        source: MongoError,
    },
    #[error("failed to save session `{id}`")]
    SaveSession {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load session `{id}`")]
    LoadSession {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("corrupt document `{id}` in collection `{collection}`: {reason}")]
    CorruptDocument {
        collection: &'static str,
        id: String,
        reason: String,
    },
}
