use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::{SharedState, session::QUESTIONS_PER_SESSION},
};

/// Ping the storage and report availability, connected players and question bank size.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let mut question_count = None;
    match state.store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => match store.count_questions().await {
                Ok(count) => question_count = Some(count),
                Err(err) => warn!(error = %err, "failed to count questions"),
            },
            Err(err) => warn!(error = %err, "storage health check failed"),
        },
        None => warn!("storage unavailable (degraded mode)"),
    }

    let status = if state.is_degraded().await {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };
    HealthResponse {
        status,
        connected_players: state.connections().len(),
        question_count,
        can_start_sessions: status == HealthStatus::Ok
            && question_count.is_some_and(|count| count >= QUESTIONS_PER_SESSION as u64),
    }
}
