//! Router assembly.
//!
//! [`build_router`] wires every route and middleware layer around a shared
//! [`AppState`]. The binary and the integration tests both go through it.

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use axum::middleware as axum_mw;
use axum::response::{IntoResponse, Response};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{DEFAULT_ADMIN_CONCURRENCY, DEFAULT_MAX_BODY_BYTES, ServerConfig};
use crate::cors;
use crate::error::AppError;
use crate::routes;
use crate::state::AppState;

/// Resource limits applied to the admin API.
#[derive(Debug, Clone, Copy)]
pub struct AdminLimits {
    /// Admin requests in flight at once, counted across every admin route.
    pub concurrency: usize,
    /// Largest accepted request body in bytes. Larger bodies get 413.
    pub max_body_bytes: usize,
}

impl Default for AdminLimits {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_ADMIN_CONCURRENCY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl From<&ServerConfig> for AdminLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            concurrency: config.admin_concurrency,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// Build the router with the default admin limits.
pub fn build_router(state: Arc<AppState>) -> Router {
    build_router_with_limits(state, AdminLimits::default())
}

/// Build the router with explicit admin limits.
pub fn build_router_with_limits(state: Arc<AppState>, limits: AdminLimits) -> Router {
    // `Router::layer` wraps each route separately; the global layer hands all
    // of them one semaphore.
    let admin_routes = Router::new()
        .nest("/api/admin", routes::admin::router())
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .layer(GlobalConcurrencyLimitLayer::new(limits.concurrency.max(1)));

    let [allow_origin, allow_methods, allow_headers] = cors::headers();

    // Layers run outside-in: CORS headers wrap everything, so preflights,
    // panics and 404s all carry them.
    Router::new()
        .merge(routes::health::router())
        .merge(routes::public::router())
        .merge(admin_routes)
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(axum_mw::from_fn(cors::preflight))
        .layer(SetResponseHeaderLayer::overriding(
            allow_origin.0,
            allow_origin.1,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            allow_methods.0,
            allow_methods.1,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            allow_headers.0,
            allow_headers.1,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state)
}

/// Turn a handler panic into the standard 500 envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}
