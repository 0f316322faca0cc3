use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod extract;
pub mod game;
pub mod health;
pub mod player;
pub mod question;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(websocket::router())
        .merge(game::router())
        .merge(question::router())
        .merge(player::router())
        .merge(docs::router());

    api_router.with_state(state)
}
