//! HTTP error types for the `kbase` server.
//!
//! Maps domain errors from `kbase-core` into HTTP responses. Every error
//! carries the same envelope as the success bodies, `{"success": false,
//! "error": "<message>"}`, with `ids` added for reference conflicts and
//! `applied` added for partial imports.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use kbase_core::error::{CodecError, ContentError};
use kbase_core::model::Collection;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing or wrong admin password.
    Unauthorized,
    /// A required body field is absent or has the wrong shape.
    BadRequest(String),
    /// Request body is larger than the configured admin limit.
    PayloadTooLarge(String),
    /// No route for this method and path.
    NotFound(String),
    /// A category/tag write would leave articles pointing at removed ids.
    Conflict { message: String, ids: Vec<String> },
    /// Unparseable body, storage failure, missing store binding or a panic.
    Internal(String),
    /// An import stopped part way through.
    PartialImport {
        message: String,
        applied: Vec<Collection>,
    },
}

impl AppError {
    /// The 404 for an unmatched request path.
    #[must_use]
    pub fn route_not_found(path: &str) -> Self {
        Self::NotFound(format!("Route {path} not found"))
    }

    /// The 400 for a required body field that is absent or `null`.
    #[must_use]
    pub fn missing_field(field: &str) -> Self {
        Self::BadRequest(format!("missing required field `{field}`"))
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<Vec<Collection>>,
}

impl ErrorBody {
    fn new(error: String) -> Self {
        Self {
            success: false,
            error,
            ids: None,
            applied: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("Unauthorized".to_owned()),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, ErrorBody::new(msg)),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new(msg)),
            Self::Conflict { message, ids } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    ids: Some(ids),
                    ..ErrorBody::new(message)
                },
            ),
            Self::Internal(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(msg))
            }
            Self::PartialImport { message, applied } => {
                error!(error = %message, applied = ?applied, "import partially applied");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        applied: Some(applied),
                        ..ErrorBody::new(message)
                    },
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Codec(
                CodecError::Malformed { .. } | CodecError::UnexpectedShape { .. },
            ) => Self::BadRequest(err.to_string()),
            ContentError::Codec(CodecError::Encode { .. }) | ContentError::Storage(_) => {
                Self::Internal(err.to_string())
            }
            ContentError::DanglingReferences { ref ids, .. } => Self::Conflict {
                ids: ids.clone(),
                message: err.to_string(),
            },
            ContentError::PartialImport { ref applied, .. } => Self::PartialImport {
                applied: applied.clone(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kbase_storage::StorageError;
    use serde_json::{Value, json};

    async fn body_of(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_leaks_nothing() {
        let (status, body) = body_of(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"success": false, "error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn not_found_names_the_path() {
        let (status, body) = body_of(AppError::route_not_found("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route /nope not found");
    }

    #[tokio::test]
    async fn dangling_references_map_to_conflict() {
        let err: AppError = ContentError::DanglingReferences {
            collection: Collection::Tags,
            ids: vec!["t1".to_owned()],
        }
        .into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["ids"], json!(["t1"]));
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn partial_import_lists_applied_collections() {
        let err: AppError = ContentError::PartialImport {
            applied: vec![Collection::Articles],
            failed: Collection::Categories,
            reason: StorageError::Write {
                key: "categories".to_owned(),
                reason: "quota".to_owned(),
            },
        }
        .into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["applied"], json!(["articles"]));
        assert!(body.get("ids").is_none());
    }

    #[tokio::test]
    async fn oversized_body_is_413_with_envelope() {
        let (status, body) =
            body_of(AppError::PayloadTooLarge("length limit exceeded".to_owned())).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body,
            json!({"success": false, "error": "length limit exceeded"})
        );
    }

    #[tokio::test]
    async fn shape_errors_are_bad_requests() {
        let err: AppError = ContentError::Codec(CodecError::UnexpectedShape {
            collection: Collection::Articles,
            found: "string",
        })
        .into();
        let (status, _) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
