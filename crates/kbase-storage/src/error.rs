//! Storage error types.
//!
//! Every variant names the key or path involved so a failed request can be
//! diagnosed from the log line alone.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open the storage backend at the given path.
    #[error("failed to open storage at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Failed to read a document from storage.
    #[error("failed to read key '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Failed to write a document to storage.
    #[error("failed to write key '{key}': {reason}")]
    Write { key: String, reason: String },

    /// The backing table does not exist.
    #[error("missing table '{name}'")]
    MissingTable { name: String },

    /// Failed to begin or commit a backend transaction.
    #[error("transaction failed: {reason}")]
    Transaction { reason: String },
}
