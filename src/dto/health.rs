use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Storage availability as seen by the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    /// No usable storage; core operations fail with `storage_unavailable`.
    Degraded,
}

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Players with a joined WebSocket connection on this node.
    pub connected_players: usize,
    /// Questions in the bank; `None` while storage is unreachable.
    pub question_count: Option<u64>,
    /// Whether the bank holds enough questions to start a session.
    pub can_start_sessions: bool,
}
