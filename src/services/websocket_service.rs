use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{PlayerInboundMessage, PlayerOutboundMessage},
    error::{ErrorCode, ServiceError},
    services::delivery::{self, send_message_to_websocket},
    state::SharedState,
};

/// Handle the full lifecycle for an individual player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let timeout = state.config().identification_timeout();
    let initial_message = match tokio::time::timeout(timeout, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let player_id = match join(&state, &initial_message).await {
        Ok(player_id) => player_id,
        Err((code, message)) => {
            warn!(?code, %message, "rejecting websocket join");
            let _ = send_message_to_websocket(
                &outbound_tx,
                &PlayerOutboundMessage::Error { message, code },
            );
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection_id = state.connections().register(player_id, outbound_tx.clone());
    info!(%player_id, %connection_id, "player connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match PlayerInboundMessage::from_json_str(&text) {
                Ok(inbound) => delivery::handle_inbound(&state, player_id, inbound).await,
                Err(err) => {
                    warn!(%player_id, error = %err, "failed to parse player message");
                    let _ = send_message_to_websocket(
                        &outbound_tx,
                        &PlayerOutboundMessage::Error {
                            message: format!("malformed message: {err}"),
                            code: ErrorCode::InvalidMessage,
                        },
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%player_id, "player closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    if state.connections().unregister(player_id, connection_id) {
        info!(%player_id, "player disconnected");
    } else {
        info!(%player_id, "player disconnected; route already taken by a newer connection");
    }

    finalize(writer_task, outbound_tx).await;
}

/// Validate the first frame: a `join` for a registered player.
async fn join(state: &SharedState, raw: &str) -> Result<Uuid, (ErrorCode, String)> {
    let inbound = PlayerInboundMessage::from_json_str(raw)
        .map_err(|err| (ErrorCode::InvalidMessage, format!("malformed message: {err}")))?;

    let PlayerInboundMessage::Join { player_id } = inbound else {
        return Err((
            ErrorCode::InvalidMessage,
            "first message must be `join`".into(),
        ));
    };

    let to_wire = |err: ServiceError| (err.code(), err.to_string());
    let store = state.require_store().await.map_err(to_wire)?;
    match store.find_player(player_id).await {
        Ok(Some(_)) => Ok(player_id),
        Ok(None) => Err(to_wire(ServiceError::PlayerNotFound(player_id))),
        Err(err) => Err(to_wire(err.into())),
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::PlayerEntity,
            quiz_store::{MemoryQuizStore, QuizStore},
        },
        state::AppState,
    };

    async fn state_with_player() -> (SharedState, Uuid) {
        let store = MemoryQuizStore::new();
        let player_id = Uuid::new_v4();
        store
            .save_player(PlayerEntity {
                id: player_id,
                username: "alice".into(),
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store)).await;
        (state, player_id)
    }

    fn join_frame(player_id: Uuid) -> String {
        serde_json::json!({"type": "join", "player_id": player_id}).to_string()
    }

    #[tokio::test]
    async fn registered_player_can_join() {
        let (state, player_id) = state_with_player().await;
        assert_eq!(join(&state, &join_frame(player_id)).await, Ok(player_id));
    }

    #[tokio::test]
    async fn first_frame_must_be_join() {
        let (state, player_id) = state_with_player().await;
        let frame = serde_json::json!({"type": "match_request", "player_id": player_id});

        let (code, _) = join(&state, &frame.to_string()).await.unwrap_err();
        assert_eq!(code, ErrorCode::InvalidMessage);
    }

    #[tokio::test]
    async fn malformed_first_frame_is_rejected() {
        let (state, _) = state_with_player().await;
        for raw in ["not json", r#"{"type": "join"}"#, r#"{"type": "join", "player_id": 3}"#] {
            let (code, _) = join(&state, raw).await.unwrap_err();
            assert_eq!(code, ErrorCode::InvalidMessage, "{raw}");
        }
    }

    #[tokio::test]
    async fn unknown_player_cannot_join() {
        let (state, _) = state_with_player().await;
        let (code, _) = join(&state, &join_frame(Uuid::new_v4())).await.unwrap_err();
        assert_eq!(code, ErrorCode::PlayerNotFound);
    }

    #[tokio::test]
    async fn degraded_service_refuses_joins() {
        let (state, player_id) = state_with_player().await;
        state.clear_store().await;

        let (code, _) = join(&state, &join_frame(player_id)).await.unwrap_err();
        assert_eq!(code, ErrorCode::StorageUnavailable);
    }
}
