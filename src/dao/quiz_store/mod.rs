pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{PlayerEntity, QueueEntryEntity, QuestionEntity, SessionEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::MemoryQuizStore;

/// Abstraction over the persistence layer for players, questions, the waiting queue and sessions.
///
/// Queue and session writes are the only shared mutable resources of the service: implementations
/// must make `claim_oldest_waiting` an indivisible find-and-delete and `replace_session` a
/// compare-and-swap on [`SessionEntity::version`].
pub trait QuizStore: Send + Sync {
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Draw up to `size` distinct questions uniformly at random.
    fn sample_questions(
        &self,
        size: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    fn count_questions(&self) -> BoxFuture<'static, StorageResult<u64>>;

    /// Atomically remove and return the oldest entry whose player differs from `excluding`.
    fn claim_oldest_waiting(
        &self,
        excluding: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>>;
    /// Insert the entry unless the player is already queued. Returns `true` when inserted.
    fn enqueue(&self, entry: QueueEntryEntity) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_queue_entry(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>>;
    fn remove_queue_entry(&self, player_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Overwrite the session only if the stored version still equals `expected_version`.
    ///
    /// On success the stored document carries `expected_version + 1` and `true` is returned.
    fn replace_session(
        &self,
        session: SessionEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
