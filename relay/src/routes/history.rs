//! HTTP side-channel serving persisted history to freshly loading clients.

use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

/// Hard cap on one history response, whatever the query asks for.
const MAX_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat/messages", get(list_messages))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .unwrap_or(state.config().history_limit)
        .min(MAX_HISTORY_LIMIT);

    match state.store().recent(limit).await {
        Ok(messages) => Json(messages).into_response(),
        Err(err) => {
            error!(%err, "history query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
