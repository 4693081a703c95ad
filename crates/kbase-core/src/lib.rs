//! Core library for `kbase`.
//!
//! Provides the content model and the rules applied between the HTTP layer
//! and the blob store:
//!
//! - [`model`]: collections, article records, typed article/category/tag
//! - [`codec`]: JSON decode with shape normalization, verbatim encode
//! - [`auth`]: the single shared admin secret
//! - [`id`]: opaque client-side identifiers
//! - [`content`]: snapshot reads, whole-collection writes, import
//! - [`error`]: error types

pub mod auth;
pub mod codec;
pub mod content;
pub mod error;
pub mod id;
pub mod model;
