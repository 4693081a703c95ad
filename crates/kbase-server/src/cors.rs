//! Cross-origin handling.
//!
//! Every response, including errors and 404s, carries permissive CORS
//! headers. Preflight `OPTIONS` requests are answered before routing so they
//! never reach authorization.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Allowed request methods.
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
/// Allowed request headers.
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// The fixed CORS header set applied to every response.
#[must_use]
pub fn headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ),
    ]
}

/// Answer any `OPTIONS` request with an empty 200.
pub async fn preflight(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(req).await
}
