pub mod health;
pub mod history;

use crate::state::AppState;
use crate::ws;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(history::routes())
        .route(ws::CHAT_WS_PATH, get(ws::chat_socket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
