//! Error types for `kbase-core`.
//!
//! Each variant names the collection it concerns. Storage failures keep the
//! underlying [`StorageError`] so the key and backend reason survive up to the
//! HTTP response.

use kbase_storage::StorageError;

use crate::model::Collection;

/// Errors from decoding or encoding a collection document.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The stored or submitted text is not valid JSON.
    #[error("malformed {collection} document: {reason}")]
    Malformed {
        collection: Collection,
        reason: String,
    },

    /// Valid JSON, but neither an array of records nor an id-keyed object.
    #[error("{collection} must be an array or an object, got {found}")]
    UnexpectedShape {
        collection: Collection,
        found: &'static str,
    },

    /// Serializing a document back to text failed.
    #[error("failed to encode {collection}: {reason}")]
    Encode {
        collection: Collection,
        reason: String,
    },
}

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The blob store rejected a write.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A document could not be validated or encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A category or tag write would drop ids that articles still reference.
    #[error("cannot remove {collection} still referenced by articles: {}", .ids.join(", "))]
    DanglingReferences {
        collection: Collection,
        ids: Vec<String>,
    },

    /// An import stopped part way; earlier collections stay written.
    #[error("import failed at {failed} after writing {applied:?}: {reason}")]
    PartialImport {
        applied: Vec<Collection>,
        failed: Collection,
        reason: StorageError,
    },
}
