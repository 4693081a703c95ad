//! `kbase` HTTP server library.
//!
//! Exposes configuration, application state, error types, the request
//! extractors, and the route handlers so that the binary and the integration
//! tests build the exact same router.

pub mod app;
pub mod config;
pub mod cors;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
