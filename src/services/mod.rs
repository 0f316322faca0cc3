/// Outbound event routing and inbound player event flows.
pub mod delivery;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Queue manager pairing waiting players.
pub mod matchmaking_service;
/// Player directory.
pub mod player_service;
/// Question bank writes.
pub mod question_service;
/// Session lifecycle controller.
pub mod session_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// WebSocket connection handling service.
pub mod websocket_service;
