use std::sync::Arc;

use axum::extract::ws::Message;
use quiz_duel_back::{
    config::AppConfig,
    dao::quiz_store::MemoryQuizStore,
    dto::{
        player::RegisterPlayerRequest,
        question::InsertQuestionRequest,
        ws::{PlayerInboundMessage, PlayerOutboundMessage, ScoreEntry},
    },
    error::ErrorCode,
    services::{delivery, player_service, question_service, session_service},
    state::{AppState, SharedState, session::SessionStatus},
};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

struct Client {
    id: Uuid,
    rx: UnboundedReceiver<Message>,
}

impl Client {
    fn next_event(&mut self) -> PlayerOutboundMessage {
        match self.rx.try_recv() {
            Ok(Message::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame for {}, got {other:?}", self.id),
        }
    }

    fn assert_idle(&mut self) {
        assert!(self.rx.try_recv().is_err(), "unexpected event for {}", self.id);
    }
}

async fn state_with_bank(questions: usize) -> SharedState {
    let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryQuizStore::new())).await;
    for index in 0..questions {
        question_service::insert_question(
            &state,
            InsertQuestionRequest {
                text: format!("question {index}"),
                choices: vec!["right".into(), "wrong".into(), "maybe".into()],
                correct_answer: "right".into(),
            },
        )
        .await
        .unwrap();
    }
    state
}

async fn connect(state: &SharedState, username: &str) -> Client {
    let player = player_service::register_player(
        state,
        RegisterPlayerRequest {
            username: username.into(),
        },
    )
    .await
    .unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    state.connections().register(player.id, tx);
    Client { id: player.id, rx }
}

async fn send(state: &SharedState, client: &Client, message: PlayerInboundMessage) {
    delivery::handle_inbound(state, client.id, message).await;
}

fn expect_question(event: PlayerOutboundMessage) -> Uuid {
    match event {
        PlayerOutboundMessage::Question { question_id, .. } => question_id,
        other => panic!("expected a question, got {other:?}"),
    }
}

fn expect_error(event: PlayerOutboundMessage) -> ErrorCode {
    match event {
        PlayerOutboundMessage::Error { code, .. } => code,
        other => panic!("expected an error, got {other:?}"),
    }
}

/// Pair two fresh clients and drain their `queued` / `session_started` events.
async fn start_duel(state: &SharedState) -> (Client, Client, Uuid) {
    let mut a = connect(state, "alice").await;
    let mut b = connect(state, "bob").await;

    send(state, &a, PlayerInboundMessage::MatchRequest { player_id: a.id }).await;
    assert!(matches!(a.next_event(), PlayerOutboundMessage::Queued { .. }));

    send(state, &b, PlayerInboundMessage::MatchRequest { player_id: b.id }).await;
    let PlayerOutboundMessage::SessionStarted {
        session_id,
        opponent_id,
        questions,
    } = a.next_event()
    else {
        panic!("alice should be told the session started");
    };
    assert_eq!(opponent_id, b.id);
    assert_eq!(questions.len(), 4);

    let PlayerOutboundMessage::SessionStarted {
        session_id: seen_by_b,
        opponent_id,
        ..
    } = b.next_event()
    else {
        panic!("bob should be told the session started");
    };
    assert_eq!((seen_by_b, opponent_id), (session_id, a.id));

    (a, b, session_id)
}

/// Answer every question of the session, the first `correct` ones correctly.
async fn play_through(state: &SharedState, client: &mut Client, session_id: Uuid, correct: usize) {
    send(
        state,
        client,
        PlayerInboundMessage::QuestionRequest {
            session_id,
            player_id: client.id,
        },
    )
    .await;
    let mut question_id = expect_question(client.next_event());

    for index in 0..4 {
        let answer = if index < correct { "right" } else { "wrong" };
        send(
            state,
            client,
            PlayerInboundMessage::AnswerSubmit {
                session_id,
                player_id: client.id,
                question_id,
                answer: answer.into(),
            },
        )
        .await;
        assert_eq!(
            client.next_event(),
            PlayerOutboundMessage::AnswerResult {
                session_id,
                question_id,
                correct: index < correct,
            }
        );
        if index < 3 {
            question_id = expect_question(client.next_event());
        }
    }
}

#[tokio::test]
async fn two_players_duel_to_a_winner() {
    let state = state_with_bank(6).await;
    let (mut a, mut b, session_id) = start_duel(&state).await;

    play_through(&state, &mut a, session_id, 1).await;
    assert_eq!(
        a.next_event(),
        PlayerOutboundMessage::WaitingForOpponent { session_id }
    );
    b.assert_idle();

    play_through(&state, &mut b, session_id, 4).await;
    let expected = PlayerOutboundMessage::GameEnd {
        session_id,
        scores: vec![
            ScoreEntry {
                player_id: a.id,
                score: 1,
            },
            ScoreEntry {
                player_id: b.id,
                score: 4,
            },
        ],
        winner_id: Some(b.id),
        is_tie: false,
    };
    assert_eq!(b.next_event(), expected);
    assert_eq!(a.next_event(), expected);

    let session = session_service::get_session(&state, session_id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);
    assert_eq!(session.winner_id(), Some(b.id));

    // A reconnecting player asking for more questions gets the final scores again.
    send(
        &state,
        &a,
        PlayerInboundMessage::QuestionRequest {
            session_id,
            player_id: a.id,
        },
    )
    .await;
    assert_eq!(a.next_event(), expected);
    b.assert_idle();

    send(
        &state,
        &a,
        PlayerInboundMessage::AnswerSubmit {
            session_id,
            player_id: a.id,
            question_id: session.questions()[3].id,
            answer: "right".into(),
        },
    )
    .await;
    assert_eq!(expect_error(a.next_event()), ErrorCode::SessionAlreadyCompleted);
}

#[tokio::test]
async fn equal_scores_end_in_a_tie() {
    let state = state_with_bank(4).await;
    let (mut a, mut b, session_id) = start_duel(&state).await;

    play_through(&state, &mut a, session_id, 2).await;
    assert!(matches!(
        a.next_event(),
        PlayerOutboundMessage::WaitingForOpponent { .. }
    ));
    play_through(&state, &mut b, session_id, 2).await;

    for client in [&mut a, &mut b] {
        let PlayerOutboundMessage::GameEnd {
            winner_id, is_tie, ..
        } = client.next_event()
        else {
            panic!("expected game end");
        };
        assert_eq!(winner_id, None);
        assert!(is_tie);
    }
}

#[tokio::test]
async fn protocol_violations_are_reported_to_the_sender_only() {
    let state = state_with_bank(4).await;
    let (mut a, mut b, session_id) = start_duel(&state).await;

    send(
        &state,
        &a,
        PlayerInboundMessage::QuestionRequest {
            session_id,
            player_id: b.id,
        },
    )
    .await;
    assert_eq!(expect_error(a.next_event()), ErrorCode::PlayerMismatch);

    send(
        &state,
        &a,
        PlayerInboundMessage::QuestionRequest {
            session_id,
            player_id: a.id,
        },
    )
    .await;
    let first = expect_question(a.next_event());
    send(
        &state,
        &a,
        PlayerInboundMessage::AnswerSubmit {
            session_id,
            player_id: a.id,
            question_id: Uuid::new_v4(),
            answer: "right".into(),
        },
    )
    .await;
    assert_eq!(expect_error(a.next_event()), ErrorCode::StaleOrInvalidQuestion);

    let mut outsider = connect(&state, "carol").await;
    send(
        &state,
        &outsider,
        PlayerInboundMessage::AnswerSubmit {
            session_id,
            player_id: outsider.id,
            question_id: first,
            answer: "right".into(),
        },
    )
    .await;
    assert_eq!(expect_error(outsider.next_event()), ErrorCode::NotASessionMember);

    send(
        &state,
        &outsider,
        PlayerInboundMessage::QuestionRequest {
            session_id: Uuid::new_v4(),
            player_id: outsider.id,
        },
    )
    .await;
    assert_eq!(expect_error(outsider.next_event()), ErrorCode::SessionNotFound);

    send(&state, &outsider, PlayerInboundMessage::Unknown).await;
    assert_eq!(expect_error(outsider.next_event()), ErrorCode::InvalidMessage);

    let session = session_service::get_session(&state, session_id).await.unwrap();
    assert_eq!(session.seat(a.id).unwrap().score, 0);
    b.assert_idle();
}

#[tokio::test]
async fn disconnected_players_keep_their_progress() {
    let state = state_with_bank(4).await;
    let (mut a, _b, session_id) = start_duel(&state).await;

    send(
        &state,
        &a,
        PlayerInboundMessage::QuestionRequest {
            session_id,
            player_id: a.id,
        },
    )
    .await;
    let delivered = expect_question(a.next_event());

    // Reconnect on a fresh channel; the stale one no longer receives events.
    let (tx, rx) = mpsc::unbounded_channel();
    state.connections().register(a.id, tx);
    let mut stale = std::mem::replace(&mut a.rx, rx);

    send(
        &state,
        &a,
        PlayerInboundMessage::AnswerSubmit {
            session_id,
            player_id: a.id,
            question_id: delivered,
            answer: "right".into(),
        },
    )
    .await;
    assert!(matches!(
        a.next_event(),
        PlayerOutboundMessage::AnswerResult { correct: true, .. }
    ));
    let next = expect_question(a.next_event());
    assert_ne!(next, delivered);
    assert!(stale.try_recv().is_err());

    let session = session_service::get_session(&state, session_id).await.unwrap();
    let seat = session.seat(a.id).unwrap();
    assert_eq!((seat.progress, seat.score), (2, 1));
}

#[tokio::test]
async fn matchmaking_without_storage_is_retryable() {
    let state = AppState::new(AppConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let player_id = Uuid::new_v4();
    state.connections().register(player_id, tx);

    delivery::handle_inbound(&state, player_id, PlayerInboundMessage::MatchRequest { player_id })
        .await;
    let Ok(Message::Text(text)) = rx.try_recv() else {
        panic!("expected an error frame");
    };
    let event: PlayerOutboundMessage = serde_json::from_str(&text).unwrap();
    assert_eq!(expect_error(event), ErrorCode::StorageUnavailable);
}
