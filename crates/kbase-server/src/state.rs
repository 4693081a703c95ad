//! Shared application state for the `kbase` server.
//!
//! A single [`AppState`] is built at startup from [`ServerConfig`](crate::config::ServerConfig)
//! and shared across all handlers via `Arc`. Nothing in it is mutated after
//! construction.

use tracing::warn;

use kbase_core::auth::AdminSecret;
use kbase_core::content::ContentStore;

use crate::error::AppError;

/// Shared application state passed to all HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    /// Content store over the bound blob store. `None` when no store is bound.
    pub content: Option<ContentStore>,
    /// The admin secret every `/api/admin/*` request is checked against.
    pub admin: AdminSecret,
}

impl AppState {
    #[must_use]
    pub fn new(content: Option<ContentStore>, admin: AdminSecret) -> Self {
        Self { content, admin }
    }

    /// The content store, or a 500 when no store is bound.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the server runs without storage.
    pub fn content(&self) -> Result<&ContentStore, AppError> {
        self.content
            .as_ref()
            .ok_or_else(|| AppError::Internal("storage binding is not configured".to_owned()))
    }

    /// Check a supplied admin password.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] on a missing or wrong password, and
    /// always when no secret is configured.
    pub fn authorize(&self, password: Option<&str>) -> Result<(), AppError> {
        if self.admin.verify(password) {
            Ok(())
        } else {
            warn!(
                supplied = password.is_some(),
                configured = self.admin.is_configured(),
                "admin authorization failed"
            );
            Err(AppError::Unauthorized)
        }
    }
}
