use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{quiz_store::QuizStore, storage::StorageError},
    error::ServiceError,
    services::delivery,
    state::{
        SharedState,
        session::{Completion, Delivery, DuelSession, QUESTIONS_PER_SESSION, SessionError},
    },
};

/// Compare-and-swap attempts before a session update is reported as contended.
pub const MAX_CAS_ATTEMPTS: u32 = 8;

/// Draw the question set, persist a new session for `players` and notify both players.
///
/// `players.0` is the player that waited in the queue.
pub async fn create_session(
    state: &SharedState,
    players: (Uuid, Uuid),
) -> Result<DuelSession, ServiceError> {
    let store = state.require_store().await?;

    let questions = store.sample_questions(QUESTIONS_PER_SESSION).await?;
    if questions.len() < QUESTIONS_PER_SESSION {
        return Err(ServiceError::NotEnoughQuestions {
            available: questions.len(),
            required: QUESTIONS_PER_SESSION,
        });
    }

    let session = DuelSession::new(players, questions.into_iter().map(Into::into).collect())?;
    store.insert_session(session.clone().into()).await?;
    info!(
        session_id = %session.id(),
        first_player = %players.0,
        second_player = %players.1,
        "session created"
    );

    delivery::notify_session_started(state, &session);
    Ok(session)
}

/// Deliver the next question to `player_id`, consuming one progress slot.
pub async fn next_question(
    state: &SharedState,
    session_id: Uuid,
    player_id: Uuid,
) -> Result<Delivery, ServiceError> {
    let delivery = update_session(state, session_id, |session| session.deliver_next(player_id))
        .await?;
    if let Delivery::Question(question) = &delivery {
        debug!(%session_id, %player_id, question_id = %question.id, "question delivered");
    }
    Ok(delivery)
}

/// Grade an answer to the last question delivered to `player_id`.
pub async fn submit_answer(
    state: &SharedState,
    session_id: Uuid,
    player_id: Uuid,
    question_id: Uuid,
    answer: &str,
) -> Result<bool, ServiceError> {
    let correct = update_session(state, session_id, |session| {
        session.record_answer(player_id, question_id, answer)
    })
    .await?;
    debug!(%session_id, %player_id, %question_id, correct, "answer recorded");
    Ok(correct)
}

/// Complete the session when both players received every question.
///
/// Only the caller that performs the transition observes [`Completion::Finished`].
pub async fn check_completion(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Completion, ServiceError> {
    let completion = update_session(state, session_id, |session| Ok(session.try_complete())).await?;
    if let Completion::Finished(board) = &completion {
        info!(
            %session_id,
            winner_id = ?board.winner_id,
            tie = board.is_tie(),
            "session completed"
        );
    }
    Ok(completion)
}

/// Load a session.
pub async fn get_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<DuelSession, ServiceError> {
    let store = state.require_store().await?;
    load_session(&store, session_id).await
}

async fn load_session(
    store: &Arc<dyn QuizStore>,
    session_id: Uuid,
) -> Result<DuelSession, ServiceError> {
    let entity = store
        .find_session(session_id)
        .await?
        .ok_or(ServiceError::SessionNotFound(session_id))?;
    Ok(DuelSession::try_from(entity)?)
}

/// Read, transition and write back a session with optimistic concurrency.
///
/// Transitions that leave the session untouched are not written. A rejected transition is
/// returned as is and never retried.
async fn update_session<T, F>(
    state: &SharedState,
    session_id: Uuid,
    mut transition: F,
) -> Result<T, ServiceError>
where
    F: FnMut(&mut DuelSession) -> Result<T, SessionError>,
{
    let store = state.require_store().await?;

    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let current = load_session(&store, session_id).await?;
        let mut next = current.clone();
        let outcome = transition(&mut next)?;
        if next == current {
            return Ok(outcome);
        }

        if store.replace_session(next.into(), current.version()).await? {
            return Ok(outcome);
        }
        debug!(%session_id, attempt, "concurrent session update; retrying");
    }

    Err(StorageError::Contention {
        resource: format!("session `{session_id}`"),
        attempts: MAX_CAS_ATTEMPTS,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use futures::future::join_all;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{PlayerEntity, QuestionEntity},
            quiz_store::MemoryQuizStore,
        },
        state::{
            AppState,
            session::{Question, SessionStatus},
        },
    };

    async fn state_with_questions(count: usize) -> SharedState {
        let store = MemoryQuizStore::new();
        for index in 0..count {
            store
                .insert_question(QuestionEntity {
                    id: Uuid::new_v4(),
                    text: format!("question {index}"),
                    choices: vec!["right".into(), "wrong".into()],
                    correct_answer: "right".into(),
                    created_at: SystemTime::now(),
                })
                .await
                .unwrap();
        }
        AppState::with_store(AppConfig::default(), Arc::new(store)).await
    }

    async fn register(state: &SharedState) -> Uuid {
        let id = Uuid::new_v4();
        state
            .require_store()
            .await
            .unwrap()
            .save_player(PlayerEntity {
                id,
                username: format!("player-{id}"),
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
        id
    }

    async fn pull(state: &SharedState, session_id: Uuid, player: Uuid) -> Question {
        match next_question(state, session_id, player).await.unwrap() {
            Delivery::Question(question) => question,
            Delivery::Exhausted => panic!("expected a question"),
        }
    }

    #[tokio::test]
    async fn create_session_requires_a_full_question_set() {
        let state = state_with_questions(3).await;
        let (a, b) = (register(&state).await, register(&state).await);

        let err = create_session(&state, (a, b)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::NotEnoughQuestions {
                available: 3,
                required: 4
            }
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let state = state_with_questions(4).await;
        let err = next_question(&state, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn degraded_state_rejects_operations() {
        let state = AppState::new(AppConfig::default());
        let err = next_question(&state, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn progress_and_score_are_persisted() {
        let state = state_with_questions(6).await;
        let (a, b) = (register(&state).await, register(&state).await);
        let session = create_session(&state, (a, b)).await.unwrap();

        let question = pull(&state, session.id(), a).await;
        assert!(
            submit_answer(&state, session.id(), a, question.id, "right")
                .await
                .unwrap()
        );

        let stored = get_session(&state, session.id()).await.unwrap();
        let seat = stored.seat(a).unwrap();
        assert_eq!((seat.progress, seat.score), (1, 1));
        assert_eq!(stored.version(), 2);

        let err = submit_answer(&state, session.id(), a, question.id, "right")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StaleOrInvalidQuestion { .. }));
        assert_eq!(get_session(&state, session.id()).await.unwrap().version(), 2);
    }

    #[tokio::test]
    async fn concurrent_pulls_never_lose_an_update() {
        let state = state_with_questions(4).await;
        let (a, b) = (register(&state).await, register(&state).await);
        let session = create_session(&state, (a, b)).await.unwrap();

        let pulls = (0..4)
            .flat_map(|_| [a, b])
            .map(|player| {
                let state = state.clone();
                let session_id = session.id();
                tokio::spawn(async move { next_question(&state, session_id, player).await })
            })
            .collect::<Vec<_>>();
        let results = join_all(pulls).await;
        assert!(
            results
                .into_iter()
                .all(|result| matches!(result, Ok(Ok(Delivery::Question(_)))))
        );

        let stored = get_session(&state, session.id()).await.unwrap();
        assert_eq!(stored.seat(a).unwrap().progress, 4);
        assert_eq!(stored.seat(b).unwrap().progress, 4);
    }

    #[tokio::test]
    async fn completion_is_reported_once() {
        let state = state_with_questions(4).await;
        let (a, b) = (register(&state).await, register(&state).await);
        let session = create_session(&state, (a, b)).await.unwrap();

        for _ in 0..4 {
            pull(&state, session.id(), a).await;
        }
        assert_eq!(
            check_completion(&state, session.id()).await.unwrap(),
            Completion::Pending
        );
        for _ in 0..4 {
            pull(&state, session.id(), b).await;
        }

        let checks = (0..4)
            .map(|_| {
                let state = state.clone();
                let session_id = session.id();
                tokio::spawn(async move { check_completion(&state, session_id).await })
            })
            .collect::<Vec<_>>();
        let finished = join_all(checks)
            .await
            .into_iter()
            .filter(|result| matches!(result, Ok(Ok(Completion::Finished(_)))))
            .count();
        assert_eq!(finished, 1);

        let stored = get_session(&state, session.id()).await.unwrap();
        assert_eq!(stored.status(), SessionStatus::Completed);
        assert_eq!(stored.winner_id(), None);
        assert!(matches!(
            check_completion(&state, session.id()).await.unwrap(),
            Completion::AlreadyFinished(board) if board.is_tie()
        ));
    }
}
