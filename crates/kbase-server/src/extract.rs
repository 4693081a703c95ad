//! Request body extraction.
//!
//! Admin bodies are parsed with [`JsonBody`] instead of `axum::Json` so that
//! every failure carries the usual JSON envelope. The `Content-Type` header is
//! not required.
//!
//! | Failure | Error |
//! |---|---|
//! | body over the length limit | [`AppError::PayloadTooLarge`] (413) |
//! | body is not JSON at all | [`AppError::Internal`] (500) |
//! | JSON of the wrong type | [`AppError::BadRequest`] (400) |

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::AppError;

/// A JSON request body deserialized into `T`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(body_rejection)?;

        serde_json::from_slice(&bytes).map(Self).map_err(|e| {
            if e.is_data() {
                AppError::BadRequest(format!("invalid request body: {e}"))
            } else {
                AppError::Internal(format!("failed to parse request body: {e}"))
            }
        })
    }
}

fn body_rejection(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(rejection.body_text())
    } else {
        AppError::Internal(rejection.body_text())
    }
}

/// The `password` field of an admin request.
///
/// Any JSON value is accepted here; only a string can ever match the secret.
/// A number or object therefore fails authorization with 401 instead of
/// failing body parsing with 400.
#[derive(Default)]
pub struct Password(Option<String>);

impl Password {
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Self(Some(s)),
            _ => Self(None),
        })
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.0.is_some() { "Password([REDACTED])" } else { "Password(None)" })
    }
}
