//! Liveness route: `GET /health`.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use kbase_core::model::now_iso;

use crate::routes::not_found;
use crate::state::AppState;

/// Build the health router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health).fallback(not_found))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub message: &'static str,
    pub kv_configured: bool,
    pub storage: Option<&'static str>,
}

/// Always succeeds while the process is up. Does not touch the store.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage = state.content.as_ref().map(|c| c.backend_kind());
    Json(HealthResponse {
        status: "ok",
        timestamp: now_iso(),
        message: "API is working",
        kv_configured: storage.is_some(),
        storage,
    })
}
