//! Routes lifecycle events to players and runs the per-event flows of the player protocol.

use axum::extract::ws::Message;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        format_system_time,
        ws::{PlayerInboundMessage, PlayerOutboundMessage, QuestionPayload},
    },
    error::{ErrorCode, ServiceError},
    services::{
        matchmaking_service::{self, MatchOutcome},
        session_service,
    },
    state::{
        AppState, SharedState,
        session::{Completion, Delivery, DuelSession},
    },
};

/// Failure to hand a message to a socket writer.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Writer channel closed: the connection is gone.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; only a closed writer is reported.
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), DeliveryError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| DeliveryError::ConnectionClosed)
}

/// Push `message` to the player's current connection. Returns whether it was handed to a writer.
///
/// Events for disconnected players are dropped.
pub fn send_to_player(state: &AppState, player_id: Uuid, message: &PlayerOutboundMessage) -> bool {
    let Some(tx) = state.connections().sender(player_id) else {
        debug!(%player_id, event = message.kind(), "player not connected; dropping event");
        return false;
    };

    match send_message_to_websocket(&tx, message) {
        Ok(()) => true,
        Err(err) => {
            debug!(%player_id, event = message.kind(), error = %err, "dropping event");
            false
        }
    }
}

/// Push `message` to every listed player.
pub fn send_to_players(state: &AppState, players: &[Uuid], message: &PlayerOutboundMessage) {
    for player_id in players {
        send_to_player(state, *player_id, message);
    }
}

/// Report a failed operation to the affected player.
pub fn send_error(state: &AppState, player_id: Uuid, err: &ServiceError) {
    send_error_code(state, player_id, err.code(), err.to_string());
}

/// Report a protocol error that has no service counterpart.
pub fn send_error_code(state: &AppState, player_id: Uuid, code: ErrorCode, message: String) {
    send_to_player(state, player_id, &PlayerOutboundMessage::Error { message, code });
}

/// Tell both players their session is ready, with a preview of the question set.
pub fn notify_session_started(state: &AppState, session: &DuelSession) {
    let questions = session
        .questions()
        .iter()
        .map(QuestionPayload::from)
        .collect::<Vec<_>>();

    for player_id in session.players() {
        let Some(opponent_id) = session.opponent_of(player_id) else {
            continue;
        };
        send_to_player(
            state,
            player_id,
            &PlayerOutboundMessage::SessionStarted {
                session_id: session.id(),
                opponent_id,
                questions: questions.clone(),
            },
        );
    }
}

/// Run the flow triggered by one inbound frame from the joined `player_id`.
pub async fn handle_inbound(state: &SharedState, player_id: Uuid, message: PlayerInboundMessage) {
    if let Some(claimed) = message.player_id().filter(|claimed| *claimed != player_id) {
        warn!(%player_id, %claimed, "frame claims another player");
        send_error_code(
            state,
            player_id,
            ErrorCode::PlayerMismatch,
            format!("connection is joined as `{player_id}`, frame claims `{claimed}`"),
        );
        return;
    }

    match message {
        PlayerInboundMessage::Join { .. } => {
            debug!(%player_id, "ignoring duplicate join");
        }
        PlayerInboundMessage::MatchRequest { .. } => handle_match_request(state, player_id).await,
        PlayerInboundMessage::QuestionRequest { session_id, .. } => {
            deliver_question_or_finish(state, session_id, player_id).await;
        }
        PlayerInboundMessage::AnswerSubmit {
            session_id,
            question_id,
            answer,
            ..
        } => handle_answer(state, session_id, player_id, question_id, &answer).await,
        PlayerInboundMessage::Unknown => {
            send_error_code(
                state,
                player_id,
                ErrorCode::InvalidMessage,
                "unsupported message type".into(),
            );
        }
    }
}

async fn handle_match_request(state: &SharedState, player_id: Uuid) {
    match matchmaking_service::request_match(state, player_id).await {
        Ok(MatchOutcome::Waiting { enqueued_at }) => {
            send_to_player(
                state,
                player_id,
                &PlayerOutboundMessage::Queued {
                    enqueued_at: format_system_time(enqueued_at),
                },
            );
        }
        // Both players already received `session_started`.
        Ok(MatchOutcome::Matched { .. }) => {}
        Err(err) => {
            warn!(%player_id, error = %err, "match request failed");
            send_error(state, player_id, &err);
        }
    }
}

async fn handle_answer(
    state: &SharedState,
    session_id: Uuid,
    player_id: Uuid,
    question_id: Uuid,
    answer: &str,
) {
    match session_service::submit_answer(state, session_id, player_id, question_id, answer).await {
        Ok(correct) => {
            send_to_player(
                state,
                player_id,
                &PlayerOutboundMessage::AnswerResult {
                    session_id,
                    question_id,
                    correct,
                },
            );
            deliver_question_or_finish(state, session_id, player_id).await;
        }
        Err(err) => {
            warn!(%session_id, %player_id, error = %err, "answer rejected");
            send_error(state, player_id, &err);
        }
    }
}

/// Deliver the player's next question; once exhausted, try to complete the session.
async fn deliver_question_or_finish(state: &SharedState, session_id: Uuid, player_id: Uuid) {
    match session_service::next_question(state, session_id, player_id).await {
        Ok(Delivery::Question(question)) => {
            send_to_player(
                state,
                player_id,
                &PlayerOutboundMessage::question(session_id, QuestionPayload::from(&question)),
            );
        }
        Ok(Delivery::Exhausted) => finish_if_complete(state, session_id, player_id).await,
        Err(ServiceError::SessionAlreadyCompleted(_)) => {
            resend_final_scores(state, session_id, player_id).await;
        }
        Err(err) => {
            warn!(%session_id, %player_id, error = %err, "question request failed");
            send_error(state, player_id, &err);
        }
    }
}

async fn finish_if_complete(state: &SharedState, session_id: Uuid, player_id: Uuid) {
    match session_service::check_completion(state, session_id).await {
        Ok(Completion::Finished(board)) => {
            info!(%session_id, "broadcasting game end");
            send_to_players(
                state,
                &board.players(),
                &PlayerOutboundMessage::game_end(session_id, &board),
            );
        }
        Ok(Completion::AlreadyFinished(board)) => {
            send_to_player(
                state,
                player_id,
                &PlayerOutboundMessage::game_end(session_id, &board),
            );
        }
        Ok(Completion::Pending) => {
            send_to_player(
                state,
                player_id,
                &PlayerOutboundMessage::WaitingForOpponent { session_id },
            );
        }
        Err(err) => {
            warn!(%session_id, %player_id, error = %err, "completion check failed");
            send_error(state, player_id, &err);
        }
    }
}

async fn resend_final_scores(state: &SharedState, session_id: Uuid, player_id: Uuid) {
    match session_service::get_session(state, session_id).await {
        Ok(session) => {
            send_to_player(
                state,
                player_id,
                &PlayerOutboundMessage::game_end(session_id, &session.scoreboard()),
            );
        }
        Err(err) => send_error(state, player_id, &err),
    }
}
