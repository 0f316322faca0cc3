use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoPlayerDocument, MongoQueueDocument, MongoQuestionDocument, MongoSessionDocument,
        PLAYER_COLLECTION_NAME, QUESTION_COLLECTION_NAME, QUEUE_COLLECTION_NAME,
        SESSION_COLLECTION_NAME, doc_id,
    },
};
use crate::dao::{
    models::{PlayerEntity, QueueEntryEntity, QuestionEntity, SessionEntity},
    quiz_store::QuizStore,
    storage::StorageResult,
};

/// MongoDB-backed [`QuizStore`].
///
/// Pairing relies on `findOneAndDelete` and session updates on a `version` filter, so both stay
/// atomic across several server processes sharing the database.
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.database = database;
        Ok(())
    }
}

impl MongoQuizStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let queue_index = IndexModel::builder()
            .keys(doc! {"enqueued_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("queue_fifo_idx".to_owned()))
                    .build(),
            )
            .build();
        self.queue_collection()
            .await
            .create_index(queue_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUEUE_COLLECTION_NAME,
                index: "enqueued_at",
                source,
            })?;

        let player_index = IndexModel::builder()
            .keys(doc! {"username": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_username_idx".to_owned()))
                    .build(),
            )
            .build();
        self.player_collection()
            .await
            .create_index(player_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "username",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn player_collection(&self) -> Collection<MongoPlayerDocument> {
        self.database().await.collection(PLAYER_COLLECTION_NAME)
    }

    async fn question_collection(&self) -> Collection<MongoQuestionDocument> {
        self.database().await.collection(QUESTION_COLLECTION_NAME)
    }

    async fn queue_collection(&self) -> Collection<MongoQueueDocument> {
        self.database().await.collection(QUEUE_COLLECTION_NAME)
    }

    async fn session_collection(&self) -> Collection<MongoSessionDocument> {
        self.database().await.collection(SESSION_COLLECTION_NAME)
    }

    async fn save_player(&self, player: PlayerEntity) -> MongoResult<()> {
        let id = player.id;
        let document: MongoPlayerDocument = player.into();
        self.player_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePlayer { id, source })?;
        Ok(())
    }

    async fn find_player(&self, id: Uuid) -> MongoResult<Option<PlayerEntity>> {
        self.player_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadPlayer { id, source })?
            .map(PlayerEntity::try_from)
            .transpose()
    }

    async fn insert_question(&self, question: QuestionEntity) -> MongoResult<()> {
        let id = question.id;
        let document: MongoQuestionDocument = question.into();
        self.question_collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveQuestion { id, source })?;
        Ok(())
    }

    async fn sample_questions(&self, size: usize) -> MongoResult<Vec<QuestionEntity>> {
        let documents: Vec<MongoQuestionDocument> = self
            .question_collection()
            .await
            .aggregate(vec![doc! {"$sample": {"size": size as i64}}])
            .with_type::<MongoQuestionDocument>()
            .await
            .map_err(|source| MongoDaoError::SampleQuestions { size, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::SampleQuestions { size, source })?;

        documents
            .into_iter()
            .map(QuestionEntity::try_from)
            .collect()
    }

    async fn count_questions(&self) -> MongoResult<u64> {
        self.question_collection()
            .await
            .count_documents(doc! {})
            .await
            .map_err(|source| MongoDaoError::CountQuestions { source })
    }

    async fn claim_oldest_waiting(&self, excluding: Uuid) -> MongoResult<Option<QueueEntryEntity>> {
        let claimed = self
            .queue_collection()
            .await
            .find_one_and_delete(doc! {"_id": {"$ne": excluding.to_string()}})
            .sort(doc! {"enqueued_at": 1})
            .await
            .map_err(|source| MongoDaoError::ClaimQueueEntry { source })?;

        claimed.map(QueueEntryEntity::try_from).transpose()
    }

    async fn enqueue(&self, entry: QueueEntryEntity) -> MongoResult<bool> {
        let player_id = entry.player_id;
        let enqueued_at = DateTime::from_system_time(entry.enqueued_at);
        // `$setOnInsert` leaves an existing entry (and its FIFO position) untouched.
        let result = self
            .queue_collection()
            .await
            .update_one(
                doc_id(player_id),
                doc! {"$setOnInsert": {"enqueued_at": enqueued_at}},
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::QueueEntry { player_id, source })?;

        Ok(result.upserted_id.is_some())
    }

    async fn find_queue_entry(&self, player_id: Uuid) -> MongoResult<Option<QueueEntryEntity>> {
        self.queue_collection()
            .await
            .find_one(doc_id(player_id))
            .await
            .map_err(|source| MongoDaoError::QueueEntry { player_id, source })?
            .map(QueueEntryEntity::try_from)
            .transpose()
    }

    async fn remove_queue_entry(&self, player_id: Uuid) -> MongoResult<bool> {
        let result = self
            .queue_collection()
            .await
            .delete_one(doc_id(player_id))
            .await
            .map_err(|source| MongoDaoError::QueueEntry { player_id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_session(&self, session: SessionEntity) -> MongoResult<()> {
        let id = session.id;
        let document: MongoSessionDocument = session.into();
        self.session_collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveSession { id, source })?;
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> MongoResult<Option<SessionEntity>> {
        self.session_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadSession { id, source })?
            .map(SessionEntity::try_from)
            .transpose()
    }

    async fn replace_session(
        &self,
        session: SessionEntity,
        expected_version: u64,
    ) -> MongoResult<bool> {
        let id = session.id;
        let document = MongoSessionDocument::from(session).with_version(expected_version + 1);
        let result = self
            .session_collection()
            .await
            .replace_one(
                doc! {"_id": id.to_string(), "version": expected_version as i64},
                &document,
            )
            .await
            .map_err(|source| MongoDaoError::SaveSession { id, source })?;

        if result.matched_count == 0 {
            debug!(session_id = %id, expected_version, "session version moved; replace skipped");
        }
        Ok(result.matched_count == 1)
    }
}

impl QuizStore for MongoQuizStore {
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_player(player).await.map_err(Into::into) })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player(id).await.map_err(Into::into) })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_question(question).await.map_err(Into::into) })
    }

    fn sample_questions(
        &self,
        size: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.sample_questions(size).await.map_err(Into::into) })
    }

    fn count_questions(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_questions().await.map_err(Into::into) })
    }

    fn claim_oldest_waiting(
        &self,
        excluding: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .claim_oldest_waiting(excluding)
                .await
                .map_err(Into::into)
        })
    }

    fn enqueue(&self, entry: QueueEntryEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.enqueue(entry).await.map_err(Into::into) })
    }

    fn find_queue_entry(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_queue_entry(player_id).await.map_err(Into::into) })
    }

    fn remove_queue_entry(&self, player_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.remove_queue_entry(player_id).await.map_err(Into::into) })
    }

    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_session(session).await.map_err(Into::into) })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_session(id).await.map_err(Into::into) })
    }

    fn replace_session(
        &self,
        session: SessionEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_session(session, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
