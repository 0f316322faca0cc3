//! Process-local [`QuizStore`] used for development, tests and single-node deployments.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use futures::future::BoxFuture;
use rand::{rng, seq::IndexedRandom};
use uuid::Uuid;

use crate::dao::{
    models::{PlayerEntity, QueueEntryEntity, QuestionEntity, SessionEntity},
    quiz_store::QuizStore,
    storage::StorageResult,
};

/// In-memory store backed by concurrent maps.
///
/// The waiting queue sits behind a single mutex so claiming is indivisible; sessions live in a
/// sharded map whose per-entry locks give the compare-and-swap its atomicity.
#[derive(Clone, Default)]
pub struct MemoryQuizStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    players: DashMap<Uuid, PlayerEntity>,
    questions: DashMap<Uuid, QuestionEntity>,
    queue: Mutex<Vec<QueueEntryEntity>>,
    sessions: DashMap<Uuid, SessionEntity>,
}

impl MemoryQuizStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_queue<T>(&self, f: impl FnOnce(&mut Vec<QueueEntryEntity>) -> T) -> T {
        let mut guard = self
            .inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn claim_oldest_waiting(&self, excluding: Uuid) -> Option<QueueEntryEntity> {
        self.with_queue(|queue| {
            let position = queue
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.player_id != excluding)
                .min_by_key(|(_, entry)| entry.enqueued_at)
                .map(|(index, _)| index)?;
            Some(queue.remove(position))
        })
    }

    fn enqueue(&self, entry: QueueEntryEntity) -> bool {
        self.with_queue(|queue| {
            if queue.iter().any(|queued| queued.player_id == entry.player_id) {
                false
            } else {
                queue.push(entry);
                true
            }
        })
    }

    fn sample_questions(&self, size: usize) -> Vec<QuestionEntity> {
        let pool = self
            .inner
            .questions
            .iter()
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        pool.choose_multiple(&mut rng(), size).cloned().collect()
    }

    fn replace_session(&self, mut session: SessionEntity, expected_version: u64) -> bool {
        match self.inner.sessions.get_mut(&session.id) {
            Some(mut current) if current.version == expected_version => {
                session.version = expected_version + 1;
                *current = session;
                true
            }
            _ => false,
        }
    }
}

impl QuizStore for MemoryQuizStore {
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.players.insert(player.id, player);
        Box::pin(async { Ok(()) })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let player = self.inner.players.get(&id).map(|entry| entry.clone());
        Box::pin(async move { Ok(player) })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.questions.insert(question.id, question);
        Box::pin(async { Ok(()) })
    }

    fn sample_questions(
        &self,
        size: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let sample = self.sample_questions(size);
        Box::pin(async move { Ok(sample) })
    }

    fn count_questions(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let count = self.inner.questions.len() as u64;
        Box::pin(async move { Ok(count) })
    }

    fn claim_oldest_waiting(
        &self,
        excluding: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let claimed = self.claim_oldest_waiting(excluding);
        Box::pin(async move { Ok(claimed) })
    }

    fn enqueue(&self, entry: QueueEntryEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let inserted = self.enqueue(entry);
        Box::pin(async move { Ok(inserted) })
    }

    fn find_queue_entry(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let entry = self.with_queue(|queue| {
            queue
                .iter()
                .find(|entry| entry.player_id == player_id)
                .cloned()
        });
        Box::pin(async move { Ok(entry) })
    }

    fn remove_queue_entry(&self, player_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self.with_queue(|queue| {
            let before = queue.len();
            queue.retain(|entry| entry.player_id != player_id);
            queue.len() != before
        });
        Box::pin(async move { Ok(removed) })
    }

    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.sessions.insert(session.id, session);
        Box::pin(async { Ok(()) })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let session = self.inner.sessions.get(&id).map(|entry| entry.clone());
        Box::pin(async move { Ok(session) })
    }

    fn replace_session(
        &self,
        session: SessionEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let swapped = self.replace_session(session, expected_version);
        Box::pin(async move { Ok(swapped) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
