//! Public read route: `GET /api/articles`.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;

use kbase_core::content::Snapshot;

use crate::error::AppError;
use crate::routes::{DataResponse, not_found};
use crate::state::AppState;

/// Build the public router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/articles", get(list_published).fallback(not_found))
}

/// Published articles in stored order, with every category and tag.
async fn list_published(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Snapshot>>, AppError> {
    let snapshot = state.content()?.snapshot().await.published();
    debug!(articles = snapshot.articles.len(), "serving published articles");
    Ok(Json(DataResponse::new(snapshot)))
}
