use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::QueueEntryEntity,
    error::ServiceError,
    services::session_service,
    state::{SharedState, session::DuelSession},
};

/// Result of a matchmaking request.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// The requester was paired with the oldest waiting player.
    Matched {
        /// Freshly created session.
        session: DuelSession,
        /// Player that was waiting in the queue.
        opponent_id: Uuid,
    },
    /// No opponent available; the requester waits in the queue.
    Waiting {
        /// Time the requester's queue entry was created.
        enqueued_at: SystemTime,
    },
}

/// Pair `player_id` with the oldest waiting player, or queue it.
///
/// Re-requesting while already queued is a no-op that reports the original queue entry.
pub async fn request_match(
    state: &SharedState,
    player_id: Uuid,
) -> Result<MatchOutcome, ServiceError> {
    let store = state.require_store().await?;
    if store.find_player(player_id).await?.is_none() {
        return Err(ServiceError::PlayerNotFound(player_id));
    }

    let gate = state.matchmaking_gate().lock().await;

    let Some(opponent) = store.claim_oldest_waiting(player_id).await? else {
        let entry = QueueEntryEntity {
            player_id,
            enqueued_at: SystemTime::now(),
        };
        if store.enqueue(entry.clone()).await? {
            info!(%player_id, "player queued");
            return Ok(MatchOutcome::Waiting {
                enqueued_at: entry.enqueued_at,
            });
        }

        let existing = store.find_queue_entry(player_id).await?;
        debug!(%player_id, "player already queued");
        return Ok(MatchOutcome::Waiting {
            enqueued_at: existing.map_or(entry.enqueued_at, |entry| entry.enqueued_at),
        });
    };

    let opponent_id = opponent.player_id;
    let session = match session_service::create_session(state, (opponent_id, player_id)).await {
        Ok(session) => session,
        Err(err) => {
            warn!(
                %player_id,
                %opponent_id,
                error = %err,
                "session creation failed; returning opponent to the queue"
            );
            if let Err(restore_err) = store.enqueue(opponent).await {
                warn!(%opponent_id, error = %restore_err, "failed to restore queue entry");
            }
            return Err(err);
        }
    };

    // Both players already hold the session; a failed cleanup must not undo the match.
    match store.remove_queue_entry(player_id).await {
        Ok(true) => debug!(%player_id, "dropped requester's own queue entry after match"),
        Ok(false) => {}
        Err(err) => warn!(%player_id, error = %err, "failed to drop requester's queue entry"),
    }
    drop(gate);

    info!(%player_id, %opponent_id, session_id = %session.id(), "players matched");
    Ok(MatchOutcome::Matched {
        session,
        opponent_id,
    })
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, io, sync::Arc};

    use futures::future::{BoxFuture, join_all};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{PlayerEntity, QuestionEntity, SessionEntity},
            quiz_store::{MemoryQuizStore, QuizStore},
            storage::{StorageError, StorageResult},
        },
        state::AppState,
    };

    /// Memory store whose queue-entry removal always fails.
    struct BrokenCleanupStore(MemoryQuizStore);

    impl QuizStore for BrokenCleanupStore {
        fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
            QuizStore::save_player(&self.0, player)
        }

        fn find_player(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
            QuizStore::find_player(&self.0, id)
        }

        fn insert_question(
            &self,
            question: QuestionEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            QuizStore::insert_question(&self.0, question)
        }

        fn sample_questions(
            &self,
            size: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
            QuizStore::sample_questions(&self.0, size)
        }

        fn count_questions(&self) -> BoxFuture<'static, StorageResult<u64>> {
            QuizStore::count_questions(&self.0)
        }

        fn claim_oldest_waiting(
            &self,
            excluding: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
            QuizStore::claim_oldest_waiting(&self.0, excluding)
        }

        fn enqueue(&self, entry: QueueEntryEntity) -> BoxFuture<'static, StorageResult<bool>> {
            QuizStore::enqueue(&self.0, entry)
        }

        fn find_queue_entry(
            &self,
            player_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
            QuizStore::find_queue_entry(&self.0, player_id)
        }

        fn remove_queue_entry(&self, _player_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(async {
                Err(StorageError::unavailable(
                    "queue write failed".into(),
                    io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
                ))
            })
        }

        fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
            QuizStore::insert_session(&self.0, session)
        }

        fn find_session(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
            QuizStore::find_session(&self.0, id)
        }

        fn replace_session(
            &self,
            session: SessionEntity,
            expected_version: u64,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            QuizStore::replace_session(&self.0, session, expected_version)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            QuizStore::health_check(&self.0)
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            QuizStore::try_reconnect(&self.0)
        }
    }

    async fn setup(questions: usize) -> (SharedState, MemoryQuizStore) {
        let store = MemoryQuizStore::new();
        for index in 0..questions {
            store
                .insert_question(QuestionEntity {
                    id: Uuid::new_v4(),
                    text: format!("question {index}"),
                    choices: vec!["yes".into(), "no".into()],
                    correct_answer: "yes".into(),
                    created_at: SystemTime::now(),
                })
                .await
                .unwrap();
        }
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone())).await;
        (state, store)
    }

    async fn register(store: &MemoryQuizStore) -> Uuid {
        let id = Uuid::new_v4();
        store
            .save_player(PlayerEntity {
                id,
                username: format!("player-{id}"),
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn first_two_callers_are_paired_in_order() {
        let (state, store) = setup(4).await;
        let (a, b, c) = (
            register(&store).await,
            register(&store).await,
            register(&store).await,
        );

        assert!(matches!(
            request_match(&state, a).await.unwrap(),
            MatchOutcome::Waiting { .. }
        ));
        let MatchOutcome::Matched {
            session,
            opponent_id,
        } = request_match(&state, b).await.unwrap()
        else {
            panic!("second caller should be matched");
        };
        assert_eq!(opponent_id, a);
        assert_eq!(session.players(), [a, b]);

        assert!(matches!(
            request_match(&state, c).await.unwrap(),
            MatchOutcome::Waiting { .. }
        ));
    }

    #[tokio::test]
    async fn re_request_while_queued_is_idempotent() {
        let (state, store) = setup(4).await;
        let a = register(&store).await;

        let MatchOutcome::Waiting { enqueued_at: first } = request_match(&state, a).await.unwrap()
        else {
            panic!("expected waiting");
        };
        let MatchOutcome::Waiting {
            enqueued_at: second,
        } = request_match(&state, a).await.unwrap()
        else {
            panic!("a player must never match itself");
        };
        assert_eq!(first, second);
        assert!(store.find_queue_entry(a).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_player_is_rejected() {
        let (state, _) = setup(4).await;
        let ghost = Uuid::new_v4();
        assert!(matches!(
            request_match(&state, ghost).await.unwrap_err(),
            ServiceError::PlayerNotFound(id) if id == ghost
        ));
    }

    #[tokio::test]
    async fn failed_session_creation_restores_the_opponent() {
        let (state, store) = setup(2).await;
        let (a, b) = (register(&store).await, register(&store).await);

        let MatchOutcome::Waiting { enqueued_at } = request_match(&state, a).await.unwrap() else {
            panic!("expected waiting");
        };
        let err = request_match(&state, b).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotEnoughQuestions { .. }));

        let restored = store.find_queue_entry(a).await.unwrap().unwrap();
        assert_eq!(restored.enqueued_at, enqueued_at);
        assert!(store.find_queue_entry(b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_requests_never_double_match() {
        let (state, store) = setup(4).await;
        let mut players = Vec::new();
        for _ in 0..10 {
            players.push(register(&store).await);
        }

        let requests = players
            .iter()
            .map(|player| {
                let state = state.clone();
                let player = *player;
                tokio::spawn(async move { request_match(&state, player).await })
            })
            .collect::<Vec<_>>();
        let outcomes = join_all(requests)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect::<Vec<_>>();

        let sessions = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                MatchOutcome::Matched { session, .. } => Some(session.players()),
                MatchOutcome::Waiting { .. } => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(sessions.len(), 5);

        let seated = sessions.iter().flatten().collect::<HashSet<_>>();
        assert_eq!(seated.len(), 10);
        for player in &players {
            assert!(store.find_queue_entry(*player).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn cleanup_failure_after_match_keeps_the_match() {
        let (_, store) = setup(4).await;
        let state = AppState::with_store(
            AppConfig::default(),
            Arc::new(BrokenCleanupStore(store.clone())),
        )
        .await;
        let (a, b) = (register(&store).await, register(&store).await);

        assert!(matches!(
            request_match(&state, a).await.unwrap(),
            MatchOutcome::Waiting { .. }
        ));
        let MatchOutcome::Matched {
            session,
            opponent_id,
        } = request_match(&state, b).await.unwrap()
        else {
            panic!("the match must survive a failed cleanup");
        };
        assert_eq!(opponent_id, a);
        assert!(store.find_session(session.id()).await.unwrap().is_some());
        assert!(store.find_queue_entry(a).await.unwrap().is_none());
        assert!(store.find_queue_entry(b).await.unwrap().is_none());
    }
}
