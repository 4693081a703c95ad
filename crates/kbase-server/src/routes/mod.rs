//! HTTP route handlers, one module per API area.
//!
//! Each module exposes a `router()` returning `Router<Arc<AppState>>`.

pub mod admin;
pub mod health;
pub mod public;

use axum::extract::OriginalUri;
use serde::Serialize;

use crate::error::AppError;

/// Fallback for unmatched paths and for known paths hit with the wrong method.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::route_not_found(uri.path())
}

/// `{"success": true}`
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    #[must_use]
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
