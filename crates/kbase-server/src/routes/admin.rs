//! Admin routes: `POST /api/admin/*`.
//!
//! Every handler checks the password before looking at any other field, so a
//! wrong password is always a 401 and never touches the store. Collection
//! writes replace the whole document; there is no merge or per-id upsert.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use kbase_core::content::{ImportBundle, Snapshot};
use kbase_core::model::{Collection, now_iso};

use crate::error::AppError;
use crate::extract::{JsonBody, Password};
use crate::routes::{Ack, DataResponse, not_found};
use crate::state::AppState;

/// Build the admin router (mounted under `/api/admin`).
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/data", post(data).fallback(not_found))
        .route("/articles", post(save_articles).fallback(not_found))
        .route("/categories", post(save_categories).fallback(not_found))
        .route("/tags", post(save_tags).fallback(not_found))
        .route("/export", post(export).fallback(not_found))
        .route("/import", post(import).fallback(not_found))
}

// ── Request / Response types ─────────────────────────────────────────

/// Body of `/data` and `/export`.
#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    #[serde(default)]
    pub password: Password,
}

#[derive(Debug, Deserialize)]
pub struct SaveArticlesRequest {
    #[serde(default)]
    pub password: Password,
    #[serde(default)]
    pub articles: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SaveCategoriesRequest {
    #[serde(default)]
    pub password: Password,
    #[serde(default)]
    pub categories: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SaveTagsRequest {
    #[serde(default)]
    pub password: Password,
    #[serde(default)]
    pub tags: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub password: Password,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Full dump plus the moment it was taken.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub export_date: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub applied: Vec<Collection>,
}

/// A required field that is missing or `null`.
fn require(value: Option<Value>, field: &str) -> Result<Value, AppError> {
    value.ok_or_else(|| AppError::missing_field(field))
}

// ── Handlers ─────────────────────────────────────────────────────────

/// All three collections, drafts included.
async fn data(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<AdminRequest>,
) -> Result<Json<DataResponse<Snapshot>>, AppError> {
    state.authorize(body.password.as_deref())?;
    let snapshot = state.content()?.snapshot().await;
    Ok(Json(DataResponse::new(snapshot)))
}

async fn save_articles(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<SaveArticlesRequest>,
) -> Result<Json<Ack>, AppError> {
    state.authorize(body.password.as_deref())?;
    let document = require(body.articles, "articles")?;
    replace(&state, Collection::Articles, &document).await
}

async fn save_categories(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<SaveCategoriesRequest>,
) -> Result<Json<Ack>, AppError> {
    state.authorize(body.password.as_deref())?;
    let document = require(body.categories, "categories")?;
    replace(&state, Collection::Categories, &document).await
}

async fn save_tags(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<SaveTagsRequest>,
) -> Result<Json<Ack>, AppError> {
    state.authorize(body.password.as_deref())?;
    let document = require(body.tags, "tags")?;
    replace(&state, Collection::Tags, &document).await
}

async fn replace(
    state: &AppState,
    collection: Collection,
    document: &Value,
) -> Result<Json<Ack>, AppError> {
    state.content()?.replace(collection, document).await?;
    Ok(Json(Ack::ok()))
}

async fn export(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<AdminRequest>,
) -> Result<Json<DataResponse<ExportBundle>>, AppError> {
    state.authorize(body.password.as_deref())?;
    let snapshot = state.content()?.snapshot().await;
    info!(articles = snapshot.articles.len(), "export taken");
    Ok(Json(DataResponse::new(ExportBundle {
        snapshot,
        export_date: now_iso(),
    })))
}

/// Overwrite each collection present in `data`; leave the rest alone.
async fn import(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    state.authorize(body.password.as_deref())?;
    let data = require(body.data, "data")?;
    let bundle: ImportBundle = serde_json::from_value(data)
        .map_err(|e| AppError::BadRequest(format!("invalid import data: {e}")))?;

    let report = state.content()?.import(&bundle).await?;
    Ok(Json(ImportResponse {
        success: true,
        applied: report.applied,
    }))
}
